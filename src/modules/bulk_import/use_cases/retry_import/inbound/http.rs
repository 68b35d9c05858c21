use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde_json::json;
use tracing::error;

use crate::modules::bulk_import::use_cases::retry_import::handler::RetryError;
use crate::modules::bulk_import::use_cases::submit_import::inbound::http::CORRELATION_ID_HEADER;
use crate::shared::core::principal::{ADMIN_ROLE, Principal};
use crate::shell::state::AppState;

pub async fn handle(
    State(state): State<AppState>,
    principal: Principal,
    Path(job_id): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if !principal.has_role(ADMIN_ROLE) {
        return StatusCode::FORBIDDEN.into_response();
    }
    let correlation_id = headers
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    match state
        .retry_import
        .handle(&job_id, &principal.user_id, correlation_id)
        .await
    {
        Ok(job) => (StatusCode::ACCEPTED, Json(job)).into_response(),
        Err(RetryError::NotFound(_)) => StatusCode::NOT_FOUND.into_response(),
        Err(err @ RetryError::NotRetryable(_)) => {
            (StatusCode::CONFLICT, Json(json!({"error": err.to_string()}))).into_response()
        }
        Err(err) => {
            error!(error = %err, "import retry failed");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}
