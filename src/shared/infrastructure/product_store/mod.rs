// Store accessor port for product documents.
//
// Purpose
// - Typed reads by product identifier or SKU.
// - Conditional (optimistic) field-group updates keyed by product identifier.
//
// Boundaries
// - The document database itself lives outside this crate. Adapters implement this trait.

use crate::shared::core::product::{DenormalizedUpdate, Product};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProductStoreError {
    #[error("version mismatch: expected {expected}, actual {actual}")]
    VersionMismatch { expected: u64, actual: u64 },

    #[error("product {0} not found")]
    NotFound(String),

    #[error("product {0} already exists")]
    AlreadyExists(String),

    #[error("sku {0} already exists")]
    DuplicateSku(String),

    #[error("backend error: {0}")]
    Backend(String),
}

impl ProductStoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ProductStoreError::Backend(_))
    }
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn find_by_id(&self, product_id: &str) -> Result<Option<Product>, ProductStoreError>;

    async fn find_by_sku(&self, sku: &str) -> Result<Option<Product>, ProductStoreError>;

    /// Apply `update` only if the stored version still equals `expected_version`.
    /// Returns the new version.
    async fn apply_if_unchanged(
        &self,
        product_id: &str,
        expected_version: u64,
        update: DenormalizedUpdate,
    ) -> Result<u64, ProductStoreError>;

    /// Insert a new product. Identifier and SKU must both be unused.
    async fn insert(&self, product: Product) -> Result<(), ProductStoreError>;

    /// Delete every product created by the given import job. Returns how many were removed.
    async fn delete_by_import_job(&self, job_id: &str) -> Result<u64, ProductStoreError>;
}

pub mod in_memory;
