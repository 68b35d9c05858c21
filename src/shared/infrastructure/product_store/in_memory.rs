// In memory implementation of the ProductStore port.
//
// Purpose
// - Support handler and coordinator tests and local development without a database.
//
// Responsibilities
// - Keep products in a map keyed by identifier, with SKU uniqueness.
// - Enforce optimistic concurrency by checking the expected document version.

use crate::shared::core::product::{DenormalizedUpdate, Product};
use crate::shared::infrastructure::product_store::{ProductStore, ProductStoreError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryProductStore {
    products: RwLock<HashMap<String, Product>>,
    is_offline: bool,
    delay_update_ms: AtomicU64,
    failing_inserts: AtomicUsize,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle_offline(&mut self) {
        self.is_offline = !self.is_offline;
    }

    /// Delay conditional updates after the caller's read, to provoke version conflicts.
    pub fn set_delay_update_ms(&self, ms: u64) {
        self.delay_update_ms.store(ms, Ordering::SeqCst);
    }

    /// Make the next `count` inserts fail with a backend error.
    pub fn fail_next_inserts(&self, count: usize) {
        self.failing_inserts.store(count, Ordering::SeqCst);
    }

    pub async fn seed(&self, product: Product) {
        self.products
            .write()
            .await
            .insert(product.id.clone(), product);
    }

    pub async fn count(&self) -> usize {
        self.products.read().await.len()
    }

    fn ensure_online(&self) -> Result<(), ProductStoreError> {
        if self.is_offline {
            return Err(ProductStoreError::Backend("Product store offline".into()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ProductStore for InMemoryProductStore {
    async fn find_by_id(&self, product_id: &str) -> Result<Option<Product>, ProductStoreError> {
        self.ensure_online()?;
        Ok(self.products.read().await.get(product_id).cloned())
    }

    async fn find_by_sku(&self, sku: &str) -> Result<Option<Product>, ProductStoreError> {
        self.ensure_online()?;
        Ok(self
            .products
            .read()
            .await
            .values()
            .find(|p| p.sku == sku)
            .cloned())
    }

    async fn apply_if_unchanged(
        &self,
        product_id: &str,
        expected_version: u64,
        update: DenormalizedUpdate,
    ) -> Result<u64, ProductStoreError> {
        self.ensure_online()?;
        let delay = self.delay_update_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        let mut guard = self.products.write().await;
        let product = guard
            .get_mut(product_id)
            .ok_or_else(|| ProductStoreError::NotFound(product_id.to_string()))?;
        if product.version != expected_version {
            return Err(ProductStoreError::VersionMismatch {
                expected: expected_version,
                actual: product.version,
            });
        }
        product.apply_update(update);
        Ok(product.version)
    }

    async fn insert(&self, product: Product) -> Result<(), ProductStoreError> {
        self.ensure_online()?;
        let failing = self.failing_inserts.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_inserts.store(failing - 1, Ordering::SeqCst);
            return Err(ProductStoreError::Backend("Product store write timeout".into()));
        }
        let mut guard = self.products.write().await;
        if guard.contains_key(&product.id) {
            return Err(ProductStoreError::AlreadyExists(product.id));
        }
        if guard.values().any(|p| p.sku == product.sku) {
            return Err(ProductStoreError::DuplicateSku(product.sku));
        }
        guard.insert(product.id.clone(), product);
        Ok(())
    }

    async fn delete_by_import_job(&self, job_id: &str) -> Result<u64, ProductStoreError> {
        self.ensure_online()?;
        let mut guard = self.products.write().await;
        let before = guard.len();
        guard.retain(|_, p| p.import_job_id.as_deref() != Some(job_id));
        Ok((before - guard.len()) as u64)
    }
}
