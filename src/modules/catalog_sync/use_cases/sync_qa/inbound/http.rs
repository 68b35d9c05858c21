use axum::{Json, body::Bytes, extract::State};

use crate::modules::catalog_sync::core::events::{AnswerCreated, QuestionCreated, QuestionDeleted};
use crate::modules::catalog_sync::core::qa::QaChange;
use crate::modules::catalog_sync::use_cases::denormalize::into_handler_outcome;
use crate::shared::core::envelope::{HandlerResponse, decode};
use crate::shell::state::AppState;

pub const QUESTION_CREATED_TOPIC: &str = "product.question.created";
pub const ANSWER_CREATED_TOPIC: &str = "product.answer.created";
pub const QUESTION_DELETED_TOPIC: &str = "product.question.deleted";

pub async fn handle_question_created(
    State(state): State<AppState>,
    body: Bytes,
) -> Json<HandlerResponse> {
    let outcome = match decode::<QuestionCreated>(QUESTION_CREATED_TOPIC, &body) {
        Ok((meta, data)) => into_handler_outcome(
            state
                .sync_qa
                .handle(&meta, &data.product_id, QaChange::QuestionCreated)
                .await,
        ),
        Err(outcome) => outcome,
    };
    Json(outcome.into())
}

pub async fn handle_answer_created(
    State(state): State<AppState>,
    body: Bytes,
) -> Json<HandlerResponse> {
    let outcome = match decode::<AnswerCreated>(ANSWER_CREATED_TOPIC, &body) {
        Ok((meta, data)) => {
            let change = QaChange::AnswerCreated {
                first_answer: data.first_answer,
            };
            into_handler_outcome(state.sync_qa.handle(&meta, &data.product_id, change).await)
        }
        Err(outcome) => outcome,
    };
    Json(outcome.into())
}

pub async fn handle_question_deleted(
    State(state): State<AppState>,
    body: Bytes,
) -> Json<HandlerResponse> {
    let outcome = match decode::<QuestionDeleted>(QUESTION_DELETED_TOPIC, &body) {
        Ok((meta, data)) => {
            let change = QaChange::QuestionDeleted {
                had_answers: data.had_answers,
            };
            into_handler_outcome(state.sync_qa.handle(&meta, &data.product_id, change).await)
        }
        Err(outcome) => outcome,
    };
    Json(outcome.into())
}
