use axum::{
    Json,
    extract::State,
    extract::rejection::JsonRejection,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::error;

use crate::modules::bulk_import::core::job::ImportMode;
use crate::modules::bulk_import::core::row::ImportRow;
use crate::modules::bulk_import::use_cases::submit_import::handler::{
    SubmitError, SubmitImport,
};
use crate::shared::core::principal::{ADMIN_ROLE, Principal};
use crate::shell::state::AppState;

pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitImportBody {
    pub mode: ImportMode,
    pub rows: Vec<ImportRow>,
}

pub async fn handle(
    State(state): State<AppState>,
    principal: Principal,
    headers: HeaderMap,
    body: Result<Json<SubmitImportBody>, JsonRejection>,
) -> impl IntoResponse {
    if !principal.has_role(ADMIN_ROLE) {
        return StatusCode::FORBIDDEN.into_response();
    }
    let Json(body) = match body {
        Ok(b) => b,
        Err(_) => return StatusCode::UNPROCESSABLE_ENTITY.into_response(),
    };

    let command = SubmitImport {
        mode: body.mode,
        rows: body.rows,
        submitted_by: principal.user_id,
        correlation_id: headers
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(String::from),
    };

    match state.submit_import.handle(command).await {
        Ok(job) => (StatusCode::ACCEPTED, Json(job)).into_response(),
        Err(
            err @ (SubmitError::Empty
            | SubmitError::TooManyRows(_)
            | SubmitError::DuplicateRowNumber(_)),
        ) => (StatusCode::BAD_REQUEST, err.to_string()).into_response(),
        Err(err) => {
            error!(error = %err, "import submission failed");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}
