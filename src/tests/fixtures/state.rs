// Shared test fixture for an application state wired with in-memory adapters.

use crate::shared::config::ServiceConfig;
use crate::shared::infrastructure::event_publisher::in_memory::InMemoryEventPublisher;
use crate::shell::state::AppState;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub fn test_config() -> ServiceConfig {
    ServiceConfig {
        instance_id: "instance-test".to_string(),
        import_batch_size: 10,
        import_progress_interval_secs: 0,
        import_retry_min_delay_ms: 1,
        ..ServiceConfig::default()
    }
}

pub fn test_state() -> (AppState, Arc<InMemoryEventPublisher>) {
    let publisher = Arc::new(InMemoryEventPublisher::new());
    let state = AppState::in_memory(test_config(), publisher.clone(), CancellationToken::new());
    (state, publisher)
}

/// Wait for detached import runs and emissions started through `state`.
pub async fn settle(state: &AppState) {
    state.import_runs.close();
    state.import_runs.wait().await;
    state.import_runs.reopen();
    state.emitter.flush().await;
}
