use crate::modules::bulk_import::core::row::ImportRow;
use crate::shared::infrastructure::import_source::{ImportSource, ImportSourceError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryImportSource {
    sources: RwLock<HashMap<String, Vec<ImportRow>>>,
    is_offline: bool,
    failing_reads: AtomicUsize,
}

impl InMemoryImportSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle_offline(&mut self) {
        self.is_offline = !self.is_offline;
    }

    /// Make the next `count` reads fail with a backend error.
    pub fn fail_next_reads(&self, count: usize) {
        self.failing_reads.store(count, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<(), ImportSourceError> {
        if self.is_offline {
            return Err(ImportSourceError::Backend("Import source offline".into()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ImportSource for InMemoryImportSource {
    async fn stage(
        &self,
        job_id: &str,
        rows: Vec<ImportRow>,
    ) -> Result<String, ImportSourceError> {
        self.ensure_online()?;
        let source_ref = format!("staged/{job_id}");
        self.sources.write().await.insert(source_ref.clone(), rows);
        Ok(source_ref)
    }

    async fn read_batch(
        &self,
        source_ref: &str,
        offset: u64,
        limit: usize,
    ) -> Result<Vec<ImportRow>, ImportSourceError> {
        self.ensure_online()?;
        let failing = self.failing_reads.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_reads.store(failing - 1, Ordering::SeqCst);
            return Err(ImportSourceError::Backend("Import source read timeout".into()));
        }
        let guard = self.sources.read().await;
        let rows = guard
            .get(source_ref)
            .ok_or_else(|| ImportSourceError::UnknownSource(source_ref.to_string()))?;
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(rows.len());
        let end = start.saturating_add(limit).min(rows.len());
        Ok(rows[start..end].to_vec())
    }

    async fn discard(&self, source_ref: &str) -> Result<bool, ImportSourceError> {
        self.ensure_online()?;
        Ok(self.sources.write().await.remove(source_ref).is_some())
    }
}
