use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use tracing::error;

use crate::modules::bulk_import::core::job::{ImportJob, RowError};
use crate::shared::core::principal::{ADMIN_ROLE, Principal};
use crate::shell::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportJobView {
    #[serde(flatten)]
    pub job: ImportJob,
    pub percent_complete: f64,
    pub can_retry: bool,
}

/// Row errors kept on the job. `truncated` is set when more rows failed than were kept.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub job_id: String,
    pub failure_count: u64,
    pub row_errors: Vec<RowError>,
    pub truncated: bool,
}

impl From<ImportJob> for ErrorReport {
    fn from(job: ImportJob) -> Self {
        Self {
            truncated: job.failure_count > job.row_errors.len() as u64,
            job_id: job.job_id,
            failure_count: job.failure_count,
            row_errors: job.row_errors,
        }
    }
}

pub async fn handle(
    State(state): State<AppState>,
    principal: Principal,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    if !principal.has_role(ADMIN_ROLE) {
        return StatusCode::FORBIDDEN.into_response();
    }
    match state.get_import_job.handle(&job_id).await {
        Ok(Some(job)) => Json(ImportJobView {
            percent_complete: job.percent_complete(),
            can_retry: job.can_retry(),
            job,
        })
        .into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!(error = %err, "import job lookup failed");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}

pub async fn handle_errors(
    State(state): State<AppState>,
    principal: Principal,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    if !principal.has_role(ADMIN_ROLE) {
        return StatusCode::FORBIDDEN.into_response();
    }
    match state.get_import_job.handle(&job_id).await {
        Ok(Some(job)) => Json(ErrorReport::from(job)).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!(error = %err, "import error report lookup failed");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}

#[cfg(test)]
mod get_import_job_http_inbound_tests {
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
        routing::get,
    };
    use chrono::Utc;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::{handle, handle_errors};
    use crate::modules::bulk_import::core::job::{ImportJob, ImportMode, RowError};
    use crate::shared::core::principal::{USER_ID_HEADER, USER_ROLES_HEADER};
    use crate::shared::infrastructure::import_jobs::ImportJobStore;
    use crate::shell::state::AppState;
    use crate::tests::fixtures::state::test_state;

    fn app(state: AppState) -> Router {
        Router::new()
            .route("/admin/import-jobs/{job_id}", get(handle))
            .route("/admin/import-jobs/{job_id}/errors", get(handle_errors))
            .with_state(state)
    }

    fn request(path: &str, roles: &str) -> Request<Body> {
        Request::get(format!("/admin/import-jobs/{path}"))
            .header(USER_ID_HEADER, "admin-1")
            .header(USER_ROLES_HEADER, roles)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn it_should_return_the_job_with_its_progress() {
        let (state, _) = test_state();
        let mut job = ImportJob::pending(
            "job-1",
            "staged/job-1",
            4,
            ImportMode::PartialImport,
            None,
            Utc::now(),
        );
        job.start("instance-a:1", Utc::now()).unwrap();
        job.record_batch(1, 1, Vec::new());
        state.import_jobs.create_if_absent(job).await.unwrap();

        let response = app(state).oneshot(request("job-1", "admin")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["jobId"], "job-1");
        assert_eq!(json["status"], "running");
        assert_eq!(json["percentComplete"], 25.0);
        assert_eq!(json["canRetry"], false);
    }

    #[tokio::test]
    async fn it_should_serve_the_row_errors_of_a_job() {
        let (state, _) = test_state();
        let mut job = ImportJob::pending(
            "job-1",
            "staged/job-1",
            3,
            ImportMode::PartialImport,
            None,
            Utc::now(),
        );
        job.start("instance-a:1", Utc::now()).unwrap();
        let error = RowError {
            row_number: 2,
            sku: Some("SKU-2".into()),
            message: "price must be positive".into(),
        };
        job.record_batch(3, 2, vec![error]);
        job.complete(Utc::now()).unwrap();
        state.import_jobs.create_if_absent(job).await.unwrap();

        let response = app(state).oneshot(request("job-1/errors", "admin")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["jobId"], "job-1");
        assert_eq!(json["failureCount"], 1);
        assert_eq!(json["truncated"], false);
        assert_eq!(json["rowErrors"][0]["rowNumber"], 2);
        assert_eq!(json["rowErrors"][0]["sku"], "SKU-2");
    }

    #[tokio::test]
    async fn it_should_return_404_for_the_errors_of_an_unknown_job() {
        let (state, _) = test_state();
        let response = app(state).oneshot(request("nope/errors", "admin")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn it_should_return_404_for_an_unknown_job() {
        let (state, _) = test_state();
        let response = app(state).oneshot(request("nope", "admin")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn it_should_return_403_for_a_non_admin() {
        let (state, _) = test_state();
        let response = app(state).oneshot(request("job-1", "support")).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
