use crate::modules::bulk_import::core::events::ImportJobCreated;
use crate::modules::bulk_import::core::job::{ImportJob, ImportMode, ImportStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImportPhase {
    Validating,
    Importing,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportProgress {
    pub job_id: String,
    pub phase: ImportPhase,
    pub processed_rows: u64,
    pub total_rows: u64,
    pub percent_complete: f64,
    pub success_count: u64,
    pub failure_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportCompleted {
    pub job_id: String,
    pub mode: ImportMode,
    pub status: ImportStatus,
    pub total_rows: u64,
    pub processed_rows: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub error_report_ref: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportFailed {
    pub job_id: String,
    pub reason: String,
    pub processed_rows: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub rolled_back_rows: u64,
    pub error_report_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportCancelled {
    pub job_id: String,
    pub processed_rows: u64,
    pub total_rows: u64,
    pub success_count: u64,
    pub failure_count: u64,
}

/// Outbound facts produced while driving an import job.
/// The outbound event_emitter adapter maps each one to a topic.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportIntent {
    PublishJobCreated { payload: ImportJobCreated },
    PublishProgress { payload: ImportProgress },
    PublishCompleted { payload: ImportCompleted },
    PublishFailed { payload: ImportFailed },
    PublishCancelled { payload: ImportCancelled },
}

impl ImportIntent {
    pub fn progress(job: &ImportJob, phase: ImportPhase, processed_rows: u64) -> Self {
        let percent_complete = if job.total_rows == 0 {
            100.0
        } else {
            let raw = processed_rows as f64 / job.total_rows as f64 * 100.0;
            (raw * 100.0).round() / 100.0
        };
        ImportIntent::PublishProgress {
            payload: ImportProgress {
                job_id: job.job_id.clone(),
                phase,
                processed_rows,
                total_rows: job.total_rows,
                percent_complete,
                success_count: job.success_count,
                failure_count: job.failure_count,
            },
        }
    }

    pub fn completed(job: &ImportJob) -> Self {
        ImportIntent::PublishCompleted {
            payload: ImportCompleted {
                job_id: job.job_id.clone(),
                mode: job.mode,
                status: job.status,
                total_rows: job.total_rows,
                processed_rows: job.processed_rows,
                success_count: job.success_count,
                failure_count: job.failure_count,
                error_report_ref: job.error_report_ref.clone(),
                completed_at: job.completed_at,
            },
        }
    }

    pub fn failed(job: &ImportJob, rolled_back_rows: u64) -> Self {
        ImportIntent::PublishFailed {
            payload: ImportFailed {
                job_id: job.job_id.clone(),
                reason: job.failure_reason.clone().unwrap_or_default(),
                processed_rows: job.processed_rows,
                success_count: job.success_count,
                failure_count: job.failure_count,
                rolled_back_rows,
                error_report_ref: job.error_report_ref.clone(),
            },
        }
    }

    pub fn cancelled(job: &ImportJob) -> Self {
        ImportIntent::PublishCancelled {
            payload: ImportCancelled {
                job_id: job.job_id.clone(),
                processed_rows: job.processed_rows,
                total_rows: job.total_rows,
                success_count: job.success_count,
                failure_count: job.failure_count,
            },
        }
    }
}
