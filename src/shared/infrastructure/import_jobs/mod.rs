// Import job store port.
//
// Purpose
// - Share import job state between coordinator instances and the admin API.
//
// Responsibilities
// - Never overwrite a terminal job.
// - Never lose a cancellation request: `save` keeps a stored `cancel_requested` flag.
// - Only delete jobs that reached a terminal state.

use crate::modules::bulk_import::core::job::{ImportJob, ImportStatus};
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// One page of the job history, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportJobQuery {
    pub status: Option<ImportStatus>,
    /// 1-based.
    pub page: u32,
    pub page_size: u32,
}

impl Default for ImportJobQuery {
    fn default() -> Self {
        Self {
            status: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ImportJobQuery {
    /// Page numbers start at 1 and page sizes stay within `1..=MAX_PAGE_SIZE`.
    pub fn normalized(self) -> Self {
        Self {
            status: self.status,
            page: self.page.max(1),
            page_size: self.page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1) as usize * self.page_size as usize
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportJobPage {
    pub jobs: Vec<ImportJob>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub has_more: bool,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JobStoreError {
    #[error("import job {0} not found")]
    NotFound(String),

    #[error("import job {job_id} is already {status}")]
    Terminal { job_id: String, status: ImportStatus },

    #[error("import job {job_id} is still {status}")]
    Active { job_id: String, status: ImportStatus },

    #[error("backend error: {0}")]
    Backend(String),
}

impl JobStoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, JobStoreError::Backend(_))
    }
}

#[async_trait]
pub trait ImportJobStore: Send + Sync {
    /// Store `job` unless a job with the same id exists. Returns the stored job either way.
    async fn create_if_absent(&self, job: ImportJob) -> Result<ImportJob, JobStoreError>;

    async fn get(&self, job_id: &str) -> Result<Option<ImportJob>, JobStoreError>;

    /// Overwrite the stored job. Fails with `Terminal` when the stored job is terminal.
    async fn save(&self, job: &ImportJob) -> Result<(), JobStoreError>;

    /// Flag a non-terminal job for cancellation. Returns the updated job.
    async fn request_cancel(&self, job_id: &str) -> Result<ImportJob, JobStoreError>;

    async fn list(&self, query: &ImportJobQuery) -> Result<ImportJobPage, JobStoreError>;

    /// Remove a terminal job. Fails with `Active` while it is pending or running.
    async fn delete(&self, job_id: &str) -> Result<ImportJob, JobStoreError>;

    /// How many stored jobs read their rows from `source_ref`.
    async fn count_by_source(&self, source_ref: &str) -> Result<u64, JobStoreError>;
}

pub mod in_memory;
