use axum::{Json, body::Bytes, extract::State};
use tracing::{debug, error};

use crate::modules::bulk_import::adapters::outbound::event_emitter::JOB_CREATED_TOPIC;
use crate::modules::bulk_import::core::events::ImportJobCreated;
use crate::modules::bulk_import::use_cases::run_import::handler::Claim;
use crate::shared::core::envelope::{HandlerOutcome, HandlerResponse, decode};
use crate::shell::state::AppState;

/// Acknowledges the delivery once this instance holds the job's lock, then runs the
/// import on the shell's task tracker. A run interrupted by shutdown re-publishes the event.
pub async fn handle_job_created(
    State(state): State<AppState>,
    body: Bytes,
) -> Json<HandlerResponse> {
    let outcome = match decode::<ImportJobCreated>(JOB_CREATED_TOPIC, &body) {
        Ok((meta, data)) => match state.run_import.claim(&meta, data).await {
            Ok(Claim::Acquired(claimed)) => {
                debug!(job_id = %claimed.job_id(), "import job claimed, running in background");
                let coordinator = state.run_import.clone();
                state
                    .import_runs
                    .spawn(async move { coordinator.run_detached(claimed).await });
                HandlerOutcome::Success
            }
            Ok(Claim::Declined(outcome)) => outcome.handler_outcome(),
            Err(err) => {
                error!(error = %err, "import job could not be claimed");
                err.handler_outcome()
            }
        },
        Err(outcome) => outcome,
    };
    Json(outcome.into())
}
