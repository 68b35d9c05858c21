// Import job state machine.
//
// pending -> running -> { completed | failed | cancelled }
//
// A running job may be started again by a new lock owner (resume after the
// previous owner crashed). Terminal jobs never change again. A failed job can be
// retried as a new pending job over the same source.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Row errors kept on the job document. Further errors are only counted.
pub const MAX_ROW_ERRORS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImportMode {
    ValidateOnly,
    PartialImport,
    AllOrNothing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImportStatus {
    Pending,
    Running,
    Cancelled,
    Completed,
    Failed,
}

impl ImportStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ImportStatus::Cancelled | ImportStatus::Completed | ImportStatus::Failed
        )
    }
}

impl fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ImportStatus::Pending => "pending",
            ImportStatus::Running => "running",
            ImportStatus::Cancelled => "cancelled",
            ImportStatus::Completed => "completed",
            ImportStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowError {
    pub row_number: u64,
    pub sku: Option<String>,
    pub message: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("job is already {0}")]
    Terminal(ImportStatus),

    #[error("cannot move job from {from} to {to}")]
    Invalid { from: ImportStatus, to: ImportStatus },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportJob {
    pub job_id: String,
    pub status: ImportStatus,
    pub mode: ImportMode,
    pub source_ref: String,
    pub total_rows: u64,
    pub processed_rows: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub owner_token: Option<String>,
    pub cancel_requested: bool,
    pub failure_reason: Option<String>,
    pub row_errors: Vec<RowError>,
    pub error_report_ref: Option<String>,
    /// The failed job this one retries.
    #[serde(default)]
    pub retry_of: Option<String>,
    pub correlation_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ImportJob {
    pub fn pending(
        job_id: impl Into<String>,
        source_ref: impl Into<String>,
        total_rows: u64,
        mode: ImportMode,
        correlation_id: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            status: ImportStatus::Pending,
            mode,
            source_ref: source_ref.into(),
            total_rows,
            processed_rows: 0,
            success_count: 0,
            failure_count: 0,
            owner_token: None,
            cancel_requested: false,
            failure_reason: None,
            row_errors: Vec::new(),
            error_report_ref: None,
            retry_of: None,
            correlation_id,
            created_at,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn can_retry(&self) -> bool {
        self.status == ImportStatus::Failed
    }

    /// A new pending job over the same rows, mode and size as this failed one.
    pub fn retry(
        &self,
        job_id: impl Into<String>,
        correlation_id: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<ImportJob, TransitionError> {
        if !self.can_retry() {
            return Err(TransitionError::Invalid {
                from: self.status,
                to: ImportStatus::Pending,
            });
        }
        let mut retry = ImportJob::pending(
            job_id,
            self.source_ref.clone(),
            self.total_rows,
            self.mode,
            correlation_id,
            at,
        );
        retry.retry_of = Some(self.job_id.clone());
        Ok(retry)
    }

    fn ensure_not_terminal(&self) -> Result<(), TransitionError> {
        if self.status.is_terminal() {
            return Err(TransitionError::Terminal(self.status));
        }
        Ok(())
    }

    /// Take ownership of a pending job, or of a running job left behind by an expired owner.
    pub fn start(&mut self, owner_token: &str, at: DateTime<Utc>) -> Result<(), TransitionError> {
        self.ensure_not_terminal()?;
        self.status = ImportStatus::Running;
        self.owner_token = Some(owner_token.to_string());
        self.started_at.get_or_insert(at);
        Ok(())
    }

    /// Account for one committed batch.
    pub fn record_batch(&mut self, rows: u64, succeeded: u64, errors: Vec<RowError>) {
        self.processed_rows += rows;
        self.success_count += succeeded;
        self.record_errors(errors);
    }

    pub fn record_errors(&mut self, errors: Vec<RowError>) {
        self.failure_count += errors.len() as u64;
        let room = MAX_ROW_ERRORS.saturating_sub(self.row_errors.len());
        self.row_errors.extend(errors.into_iter().take(room));
    }

    pub fn complete(&mut self, at: DateTime<Utc>) -> Result<(), TransitionError> {
        self.finish(ImportStatus::Completed, at)?;
        if self.failure_count > 0 {
            self.error_report_ref = Some(format!("import-jobs/{}/errors", self.job_id));
        }
        Ok(())
    }

    pub fn fail(
        &mut self,
        reason: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        self.finish(ImportStatus::Failed, at)?;
        self.failure_reason = Some(reason.into());
        if self.failure_count > 0 {
            self.error_report_ref = Some(format!("import-jobs/{}/errors", self.job_id));
        }
        Ok(())
    }

    pub fn cancel(&mut self, at: DateTime<Utc>) -> Result<(), TransitionError> {
        self.finish(ImportStatus::Cancelled, at)
    }

    fn finish(&mut self, to: ImportStatus, at: DateTime<Utc>) -> Result<(), TransitionError> {
        self.ensure_not_terminal()?;
        if self.status != ImportStatus::Running {
            return Err(TransitionError::Invalid {
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.completed_at = Some(at);
        Ok(())
    }

    pub fn percent_complete(&self) -> f64 {
        if self.total_rows == 0 {
            return 100.0;
        }
        let percent = self.processed_rows as f64 / self.total_rows as f64 * 100.0;
        (percent * 100.0).round() / 100.0
    }
}
