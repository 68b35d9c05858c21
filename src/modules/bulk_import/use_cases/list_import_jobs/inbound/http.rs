use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::modules::bulk_import::core::job::{ImportJob, ImportMode, ImportStatus};
use crate::shared::core::principal::{ADMIN_ROLE, Principal};
use crate::shared::infrastructure::import_jobs::{DEFAULT_PAGE_SIZE, ImportJobQuery};
use crate::shell::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryParams {
    pub status: Option<ImportStatus>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// History entry. Row errors stay behind the per-job error report.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportJobSummary {
    pub job_id: String,
    pub status: ImportStatus,
    pub mode: ImportMode,
    pub total_rows: u64,
    pub processed_rows: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub failure_reason: Option<String>,
    pub retry_of: Option<String>,
    pub can_retry: bool,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<ImportJob> for ImportJobSummary {
    fn from(job: ImportJob) -> Self {
        Self {
            can_retry: job.can_retry(),
            job_id: job.job_id,
            status: job.status,
            mode: job.mode,
            total_rows: job.total_rows,
            processed_rows: job.processed_rows,
            success_count: job.success_count,
            failure_count: job.failure_count,
            failure_reason: job.failure_reason,
            retry_of: job.retry_of,
            created_at: job.created_at,
            completed_at: job.completed_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportJobHistory {
    pub jobs: Vec<ImportJobSummary>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub has_more: bool,
}

pub async fn handle(
    State(state): State<AppState>,
    principal: Principal,
    Query(params): Query<HistoryParams>,
) -> impl IntoResponse {
    if !principal.has_role(ADMIN_ROLE) {
        return StatusCode::FORBIDDEN.into_response();
    }
    let query = ImportJobQuery {
        status: params.status,
        page: params.page.unwrap_or(1),
        page_size: params.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
    };
    match state.list_import_jobs.handle(query).await {
        Ok(page) => Json(ImportJobHistory {
            jobs: page.jobs.into_iter().map(ImportJobSummary::from).collect(),
            total: page.total,
            page: page.page,
            page_size: page.page_size,
            has_more: page.has_more,
        })
        .into_response(),
        Err(err) => {
            error!(error = %err, "import history lookup failed");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}
