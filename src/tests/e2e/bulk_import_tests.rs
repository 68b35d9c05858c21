// End to end: an admin submits an import, the self-published job.created event is
// delivered back to the service, and the admin reads the finished job.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use tower::ServiceExt;

use crate::modules::bulk_import::adapters::outbound::event_emitter::{
    COMPLETED_TOPIC, FAILED_TOPIC, JOB_CREATED_TOPIC,
};
use crate::shared::core::principal::{USER_ID_HEADER, USER_ROLES_HEADER};
use crate::shared::infrastructure::event_publisher::in_memory::InMemoryEventPublisher;
use crate::shell::http::router;
use crate::shell::state::AppState;
use crate::tests::fixtures::events::envelope;
use crate::tests::fixtures::state::{settle, test_state};

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

fn admin(request: axum::http::request::Builder) -> axum::http::request::Builder {
    request
        .header(USER_ID_HEADER, "admin-1")
        .header(USER_ROLES_HEADER, "admin")
}

async fn submit(app: &Router, body: serde_json::Value) -> String {
    let request = admin(Request::post("/admin/import-jobs"))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, json) = call(app, request).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    json["jobId"].as_str().unwrap().to_string()
}

/// Deliver the last job.created event the service published, as the sidecar would,
/// and wait for the import run it started.
async fn deliver_job_created(
    app: &Router,
    state: &AppState,
    publisher: &InMemoryEventPublisher,
) -> serde_json::Value {
    let created = publisher.published_on(JOB_CREATED_TOPIC).await;
    let event = created.last().unwrap();
    let request = Request::post(format!("/events/{JOB_CREATED_TOPIC}"))
        .header("content-type", "application/json")
        .body(Body::from(envelope(&event.event_id, event.data.clone())))
        .unwrap();
    let status = call(app, request).await.1["status"].clone();
    settle(state).await;
    status
}

async fn job(app: &Router, job_id: &str) -> serde_json::Value {
    let request = admin(Request::get(format!("/admin/import-jobs/{job_id}")))
        .body(Body::empty())
        .unwrap();
    let (status, json) = call(app, request).await;
    assert_eq!(status, StatusCode::OK);
    json
}

#[tokio::test]
async fn it_should_import_a_submitted_file_end_to_end() {
    let (state, publisher) = test_state();
    let app = router(state.clone());
    let rows: Vec<_> = (1..=23)
        .map(|n| {
            serde_json::json!({
                "sku": format!("SKU-{n}"),
                "name": format!("Product {n}"),
                "price": 5.0
            })
        })
        .collect();

    let job_id = submit(&app, serde_json::json!({"mode": "partial-import", "rows": rows})).await;
    assert_eq!(job(&app, &job_id).await["status"], "pending");

    assert_eq!(deliver_job_created(&app, &state, &publisher).await, "SUCCESS");

    let finished = job(&app, &job_id).await;
    assert_eq!(finished["status"], "completed");
    assert_eq!(finished["successCount"], 23);
    assert_eq!(finished["percentComplete"], 100.0);
    assert_eq!(state.products.count().await, 23);
    assert_eq!(publisher.published_on(COMPLETED_TOPIC).await.len(), 1);

    assert_eq!(deliver_job_created(&app, &state, &publisher).await, "DROP");
}

#[tokio::test]
async fn it_should_keep_the_catalog_untouched_when_an_all_or_nothing_row_fails() {
    let (state, publisher) = test_state();
    let app = router(state.clone());
    let rows = serde_json::json!([
        {"sku": "SKU-1", "name": "Tee", "price": 5.0},
        {"sku": "SKU-2", "price": 5.0},
        {"sku": "SKU-3", "name": "Cap", "price": 7.5}
    ]);

    let job_id = submit(&app, serde_json::json!({"mode": "all-or-nothing", "rows": rows})).await;
    assert_eq!(deliver_job_created(&app, &state, &publisher).await, "SUCCESS");

    let finished = job(&app, &job_id).await;
    assert_eq!(finished["status"], "failed");
    assert_eq!(finished["rowErrors"][0]["rowNumber"], 2);
    assert_eq!(state.products.count().await, 0);
    assert_eq!(publisher.published_on(FAILED_TOPIC).await.len(), 1);
}

#[tokio::test]
async fn it_should_retry_a_failed_import_and_clean_up_after_it() {
    let (state, publisher) = test_state();
    let app = router(state.clone());
    let rows = serde_json::json!([
        {"sku": "SKU-1", "name": "Tee", "price": 5.0},
        {"sku": "SKU-2", "name": "Mug", "price": 9.0}
    ]);
    let failed_id = submit(&app, serde_json::json!({"mode": "partial-import", "rows": rows})).await;
    // One initial read plus three retries.
    state.import_source.fail_next_reads(4);
    assert_eq!(deliver_job_created(&app, &state, &publisher).await, "SUCCESS");
    assert_eq!(job(&app, &failed_id).await["canRetry"], true);

    let request = admin(Request::post(format!("/admin/import-jobs/{failed_id}/retry")))
        .body(Body::empty())
        .unwrap();
    let (status, retry) = call(&app, request).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let retry_id = retry["jobId"].as_str().unwrap().to_string();
    assert_eq!(deliver_job_created(&app, &state, &publisher).await, "SUCCESS");
    assert_eq!(job(&app, &retry_id).await["status"], "completed");
    assert_eq!(state.products.count().await, 2);

    let request = admin(Request::get("/admin/import-jobs?status=failed"))
        .body(Body::empty())
        .unwrap();
    let (_, history) = call(&app, request).await;
    assert_eq!(history["total"], 1);
    assert_eq!(history["jobs"][0]["jobId"], failed_id.as_str());

    for job_id in [&failed_id, &retry_id] {
        let request = admin(Request::delete(format!("/admin/import-jobs/{job_id}")))
            .body(Body::empty())
            .unwrap();
        assert_eq!(call(&app, request).await.0, StatusCode::NO_CONTENT);
    }
    let request = admin(Request::get("/admin/import-jobs")).body(Body::empty()).unwrap();
    assert_eq!(call(&app, request).await.1["total"], 0);
}
