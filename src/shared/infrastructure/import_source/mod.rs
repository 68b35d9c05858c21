// Import source port.
//
// Rows arrive already parsed. The coordinator pages through them by offset,
// so a resumed job can continue from the rows it already processed.

use crate::modules::bulk_import::core::row::ImportRow;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ImportSourceError {
    #[error("unknown import source {0}")]
    UnknownSource(String),

    #[error("backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait ImportSource: Send + Sync {
    /// Keep parsed rows for a job. Returns the reference the coordinator reads them by.
    async fn stage(
        &self,
        job_id: &str,
        rows: Vec<ImportRow>,
    ) -> Result<String, ImportSourceError>;

    /// Rows `offset..offset + limit`. Shorter (or empty) at the end of the source.
    async fn read_batch(
        &self,
        source_ref: &str,
        offset: u64,
        limit: usize,
    ) -> Result<Vec<ImportRow>, ImportSourceError>;

    /// Drop staged rows. Returns `false` when nothing was staged under `source_ref`.
    async fn discard(&self, source_ref: &str) -> Result<bool, ImportSourceError>;
}

pub mod in_memory;
