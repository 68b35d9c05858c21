use axum::{Json, body::Bytes, extract::State};

use crate::modules::catalog_sync::core::availability::{StockFlags, StockLevel};
use crate::modules::catalog_sync::core::events::{
    ProductRef, StockReleased, StockReserved, StockUpdated,
};
use crate::modules::catalog_sync::use_cases::denormalize::into_handler_outcome;
use crate::shared::core::envelope::{EventMeta, HandlerResponse, decode};
use crate::shell::state::AppState;

pub const STOCK_UPDATED_TOPIC: &str = "inventory.stock.updated";
pub const STOCK_RESERVED_TOPIC: &str = "inventory.reserved";
pub const STOCK_RELEASED_TOPIC: &str = "inventory.released";

async fn sync(
    state: &AppState,
    meta: &EventMeta,
    sku: String,
    product_id: Option<String>,
    level: StockLevel,
) -> Json<HandlerResponse> {
    let target = ProductRef::Sku { sku, product_id };
    let result = state.sync_inventory.handle(meta, &target, level).await;
    Json(into_handler_outcome(result).into())
}

pub async fn handle_stock_updated(
    State(state): State<AppState>,
    body: Bytes,
) -> Json<HandlerResponse> {
    match decode::<StockUpdated>(STOCK_UPDATED_TOPIC, &body) {
        Ok((meta, data)) => {
            let level = StockLevel {
                available_quantity: data.available_quantity,
                low_stock_threshold: data.low_stock_threshold,
                flags: Some(StockFlags {
                    discontinued: data.discontinued,
                    available_date: data.available_date,
                }),
            };
            sync(&state, &meta, data.sku, data.product_id, level).await
        }
        Err(outcome) => Json(outcome.into()),
    }
}

pub async fn handle_reserved(State(state): State<AppState>, body: Bytes) -> Json<HandlerResponse> {
    match decode::<StockReserved>(STOCK_RESERVED_TOPIC, &body) {
        Ok((meta, data)) => {
            let level = StockLevel {
                available_quantity: data.available_quantity,
                low_stock_threshold: None,
                flags: None,
            };
            sync(&state, &meta, data.sku, data.product_id, level).await
        }
        Err(outcome) => Json(outcome.into()),
    }
}

pub async fn handle_released(State(state): State<AppState>, body: Bytes) -> Json<HandlerResponse> {
    match decode::<StockReleased>(STOCK_RELEASED_TOPIC, &body) {
        Ok((meta, data)) => {
            let level = StockLevel {
                available_quantity: data.available_quantity,
                low_stock_threshold: None,
                flags: None,
            };
            sync(&state, &meta, data.sku, data.product_id, level).await
        }
        Err(outcome) => Json(outcome.into()),
    }
}
