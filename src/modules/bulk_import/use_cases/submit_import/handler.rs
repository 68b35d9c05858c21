// Submit an import.
//
// Stages the parsed rows, records a pending job and publishes `job.created`.
// The coordinator picks the job up from that event, possibly on another instance.

use crate::modules::bulk_import::adapters::outbound::event_emitter::dispatch_intents;
use crate::modules::bulk_import::core::events::ImportJobCreated;
use crate::modules::bulk_import::core::intents::ImportIntent;
use crate::modules::bulk_import::core::job::{ImportJob, ImportMode};
use crate::modules::bulk_import::core::row::ImportRow;
use crate::shared::infrastructure::event_publisher::{EmitStatus, EventEmitter};
use crate::shared::infrastructure::import_jobs::{ImportJobStore, JobStoreError};
use crate::shared::infrastructure::import_source::{ImportSource, ImportSourceError};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

pub const MAX_IMPORT_ROWS: usize = 50_000;

#[derive(Debug, Clone, PartialEq)]
pub struct SubmitImport {
    pub mode: ImportMode,
    pub rows: Vec<ImportRow>,
    pub submitted_by: String,
    pub correlation_id: Option<String>,
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("import contains no rows")]
    Empty,

    #[error("import has {0} rows, at most {MAX_IMPORT_ROWS} are accepted")]
    TooManyRows(usize),

    #[error("row number {0} is used by more than one row")]
    DuplicateRowNumber(u64),

    #[error(transparent)]
    Source(#[from] ImportSourceError),

    #[error(transparent)]
    Jobs(#[from] JobStoreError),

    #[error("import job {0} was recorded but could not be dispatched")]
    NotDispatched(String),
}

pub struct SubmitImportHandler<TJobs, TSource>
where
    TJobs: ImportJobStore + 'static,
    TSource: ImportSource + 'static,
{
    jobs: Arc<TJobs>,
    source: Arc<TSource>,
    emitter: EventEmitter,
}

impl<TJobs, TSource> SubmitImportHandler<TJobs, TSource>
where
    TJobs: ImportJobStore + 'static,
    TSource: ImportSource + 'static,
{
    pub fn new(jobs: Arc<TJobs>, source: Arc<TSource>, emitter: EventEmitter) -> Self {
        Self {
            jobs,
            source,
            emitter,
        }
    }

    #[tracing::instrument(
        name = "import.submit",
        skip_all,
        fields(mode = ?command.mode, rows = command.rows.len())
    )]
    pub async fn handle(&self, command: SubmitImport) -> Result<ImportJob, SubmitError> {
        if command.rows.is_empty() {
            return Err(SubmitError::Empty);
        }
        if command.rows.len() > MAX_IMPORT_ROWS {
            return Err(SubmitError::TooManyRows(command.rows.len()));
        }

        let rows = number_rows(command.rows)?;
        let job_id = Uuid::now_v7().to_string();
        let total_rows = rows.len() as u64;
        let source_ref = self.source.stage(&job_id, rows).await?;

        let job = self
            .jobs
            .create_if_absent(ImportJob::pending(
                job_id.clone(),
                source_ref.clone(),
                total_rows,
                command.mode,
                command.correlation_id.clone(),
                Utc::now(),
            ))
            .await?;
        info!(job_id = %job.job_id, submitted_by = %command.submitted_by, "import job submitted");

        let created = ImportIntent::PublishJobCreated {
            payload: ImportJobCreated {
                job_id: job_id.clone(),
                source_ref,
                total_rows,
                mode: command.mode,
            },
        };
        let correlation_id = command.correlation_id.as_deref();
        let statuses = dispatch_intents(&self.emitter, correlation_id, vec![created]).await;
        if statuses.contains(&EmitStatus::Failed) {
            warn!(job_id = %job_id, "import job left pending, job.created not published");
            return Err(SubmitError::NotDispatched(job_id));
        }
        Ok(job)
    }
}

/// Rows without a row number get their 1-based position in the upload.
/// Row numbers identify the imported products, so each must be unique.
fn number_rows(rows: Vec<ImportRow>) -> Result<Vec<ImportRow>, SubmitError> {
    let mut used = HashSet::with_capacity(rows.len());
    rows.into_iter()
        .enumerate()
        .map(|(index, mut row)| {
            if row.row_number == 0 {
                row.row_number = index as u64 + 1;
            }
            if !used.insert(row.row_number) {
                return Err(SubmitError::DuplicateRowNumber(row.row_number));
            }
            Ok(row)
        })
        .collect()
}
