use axum::{Json, body::Bytes, extract::State};

use crate::modules::catalog_sync::core::events::{ReviewCreated, ReviewDeleted, ReviewUpdated};
use crate::modules::catalog_sync::core::reviews::ReviewChange;
use crate::modules::catalog_sync::use_cases::denormalize::into_handler_outcome;
use crate::shared::core::envelope::{HandlerResponse, decode};
use crate::shell::state::AppState;

pub const REVIEW_CREATED_TOPIC: &str = "review.created";
pub const REVIEW_UPDATED_TOPIC: &str = "review.updated";
pub const REVIEW_DELETED_TOPIC: &str = "review.deleted";

pub async fn handle_created(State(state): State<AppState>, body: Bytes) -> Json<HandlerResponse> {
    let outcome = match decode::<ReviewCreated>(REVIEW_CREATED_TOPIC, &body) {
        Ok((meta, data)) => into_handler_outcome(
            state
                .sync_reviews
                .handle(
                    &meta,
                    &data.product_id,
                    ReviewChange::Created {
                        rating: data.rating,
                        verified: data.verified_purchase,
                    },
                )
                .await,
        ),
        Err(outcome) => outcome,
    };
    Json(outcome.into())
}

pub async fn handle_updated(State(state): State<AppState>, body: Bytes) -> Json<HandlerResponse> {
    let outcome = match decode::<ReviewUpdated>(REVIEW_UPDATED_TOPIC, &body) {
        Ok((meta, data)) => into_handler_outcome(
            state
                .sync_reviews
                .handle(
                    &meta,
                    &data.product_id,
                    ReviewChange::Updated {
                        old_rating: data.old_rating,
                        new_rating: data.new_rating,
                    },
                )
                .await,
        ),
        Err(outcome) => outcome,
    };
    Json(outcome.into())
}

pub async fn handle_deleted(State(state): State<AppState>, body: Bytes) -> Json<HandlerResponse> {
    let outcome = match decode::<ReviewDeleted>(REVIEW_DELETED_TOPIC, &body) {
        Ok((meta, data)) => into_handler_outcome(
            state
                .sync_reviews
                .handle(
                    &meta,
                    &data.product_id,
                    ReviewChange::Deleted {
                        rating: data.rating,
                        verified: data.verified_purchase,
                    },
                )
                .await,
        ),
        Err(outcome) => outcome,
    };
    Json(outcome.into())
}
