use axum::{
    Json, Router,
    extract::State,
    routing::{MethodRouter, get, post},
};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::modules::bulk_import::adapters::outbound::event_emitter::JOB_CREATED_TOPIC;
use crate::modules::bulk_import::use_cases::cancel_import::inbound::http as cancel_http;
use crate::modules::bulk_import::use_cases::delete_import::inbound::http as delete_http;
use crate::modules::bulk_import::use_cases::get_import_job::inbound::http as get_job_http;
use crate::modules::bulk_import::use_cases::list_import_jobs::inbound::http as list_http;
use crate::modules::bulk_import::use_cases::retry_import::inbound::http as retry_http;
use crate::modules::bulk_import::use_cases::run_import::inbound::http as run_http;
use crate::modules::bulk_import::use_cases::submit_import::inbound::http as submit_http;
use crate::modules::catalog_sync::use_cases::sync_analytics::inbound::http as analytics_http;
use crate::modules::catalog_sync::use_cases::sync_inventory::inbound::http as inventory_http;
use crate::modules::catalog_sync::use_cases::sync_qa::inbound::http as qa_http;
use crate::modules::catalog_sync::use_cases::sync_reviews::inbound::http as reviews_http;
use crate::shell::state::AppState;

/// Subscribed topics and the handler serving each one.
fn event_handlers() -> Vec<(&'static str, MethodRouter<AppState>)> {
    vec![
        (reviews_http::REVIEW_CREATED_TOPIC, post(reviews_http::handle_created)),
        (reviews_http::REVIEW_UPDATED_TOPIC, post(reviews_http::handle_updated)),
        (reviews_http::REVIEW_DELETED_TOPIC, post(reviews_http::handle_deleted)),
        (inventory_http::STOCK_UPDATED_TOPIC, post(inventory_http::handle_stock_updated)),
        (inventory_http::STOCK_RESERVED_TOPIC, post(inventory_http::handle_reserved)),
        (inventory_http::STOCK_RELEASED_TOPIC, post(inventory_http::handle_released)),
        (analytics_http::SALES_UPDATED_TOPIC, post(analytics_http::handle_sales)),
        (analytics_http::VIEWS_UPDATED_TOPIC, post(analytics_http::handle_views)),
        (analytics_http::CONVERSIONS_UPDATED_TOPIC, post(analytics_http::handle_conversions)),
        (qa_http::QUESTION_CREATED_TOPIC, post(qa_http::handle_question_created)),
        (qa_http::ANSWER_CREATED_TOPIC, post(qa_http::handle_answer_created)),
        (qa_http::QUESTION_DELETED_TOPIC, post(qa_http::handle_question_deleted)),
        (JOB_CREATED_TOPIC, post(run_http::handle_job_created)),
    ]
}

pub fn event_route(topic: &str) -> String {
    format!("/events/{topic}")
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Subscription {
    pub pubsubname: String,
    pub topic: String,
    pub route: String,
}

async fn subscribe(State(state): State<AppState>) -> Json<Vec<Subscription>> {
    let subscriptions = event_handlers()
        .into_iter()
        .map(|(topic, _)| Subscription {
            pubsubname: state.config.pubsub_name.clone(),
            topic: topic.to_string(),
            route: event_route(topic),
        })
        .collect();
    Json(subscriptions)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

pub fn router(state: AppState) -> Router {
    let events = event_handlers()
        .into_iter()
        .fold(Router::new(), |router, (topic, handler)| {
            router.route(&event_route(topic), handler)
        });

    Router::new()
        .route("/health", get(health))
        .route("/dapr/subscribe", get(subscribe))
        .route("/admin/import-jobs", get(list_http::handle).post(submit_http::handle))
        .route(
            "/admin/import-jobs/{job_id}",
            get(get_job_http::handle).delete(delete_http::handle),
        )
        .route("/admin/import-jobs/{job_id}/errors", get(get_job_http::handle_errors))
        .route("/admin/import-jobs/{job_id}/cancel", post(cancel_http::handle))
        .route("/admin/import-jobs/{job_id}/retry", post(retry_http::handle))
        .merge(events)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
