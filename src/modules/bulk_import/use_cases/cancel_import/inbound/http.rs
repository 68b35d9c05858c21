use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::error;

use crate::shared::core::principal::{ADMIN_ROLE, Principal};
use crate::shared::infrastructure::import_jobs::JobStoreError;
use crate::shell::state::AppState;

pub async fn handle(
    State(state): State<AppState>,
    principal: Principal,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    if !principal.has_role(ADMIN_ROLE) {
        return StatusCode::FORBIDDEN.into_response();
    }
    match state.cancel_import.handle(&job_id, &principal.user_id).await {
        Ok(job) => (StatusCode::ACCEPTED, Json(job)).into_response(),
        Err(JobStoreError::NotFound(_)) => StatusCode::NOT_FOUND.into_response(),
        Err(JobStoreError::Terminal { .. }) => StatusCode::CONFLICT.into_response(),
        Err(err) => {
            error!(error = %err, "import cancellation failed");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}
