use axum::{Json, body::Bytes, extract::State};

use crate::modules::catalog_sync::core::badges::MetricsSnapshot;
use crate::modules::catalog_sync::core::events::{ConversionsUpdated, SalesUpdated, ViewsUpdated};
use crate::modules::catalog_sync::use_cases::denormalize::into_handler_outcome;
use crate::shared::core::envelope::{HandlerResponse, decode};
use crate::shell::state::AppState;

pub const SALES_UPDATED_TOPIC: &str = "analytics.product.sales.updated";
pub const VIEWS_UPDATED_TOPIC: &str = "analytics.product.views.updated";
pub const CONVERSIONS_UPDATED_TOPIC: &str = "analytics.product.conversions.updated";

pub async fn handle_sales(State(state): State<AppState>, body: Bytes) -> Json<HandlerResponse> {
    let outcome = match decode::<SalesUpdated>(SALES_UPDATED_TOPIC, &body) {
        Ok((meta, data)) => {
            let snapshot = MetricsSnapshot::Sales {
                category_rank: data.category_rank,
            };
            let result = state.sync_analytics.handle(&meta, &data.product_id, snapshot).await;
            into_handler_outcome(result)
        }
        Err(outcome) => outcome,
    };
    Json(outcome.into())
}

pub async fn handle_views(State(state): State<AppState>, body: Bytes) -> Json<HandlerResponse> {
    let outcome = match decode::<ViewsUpdated>(VIEWS_UPDATED_TOPIC, &body) {
        Ok((meta, data)) => {
            let snapshot = MetricsSnapshot::Views {
                growth_percent: data.growth_percent(),
            };
            let result = state.sync_analytics.handle(&meta, &data.product_id, snapshot).await;
            into_handler_outcome(result)
        }
        Err(outcome) => outcome,
    };
    Json(outcome.into())
}

pub async fn handle_conversions(
    State(state): State<AppState>,
    body: Bytes,
) -> Json<HandlerResponse> {
    let outcome = match decode::<ConversionsUpdated>(CONVERSIONS_UPDATED_TOPIC, &body) {
        Ok((meta, data)) => {
            let snapshot = MetricsSnapshot::Conversions {
                conversion_rate: data.conversion_rate,
                category_average: data.category_average_conversion_rate,
            };
            let result = state.sync_analytics.handle(&meta, &data.product_id, snapshot).await;
            into_handler_outcome(result)
        }
        Err(outcome) => outcome,
    };
    Json(outcome.into())
}
