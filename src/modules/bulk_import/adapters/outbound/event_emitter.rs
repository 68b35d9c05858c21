use crate::modules::bulk_import::core::intents::ImportIntent;
use crate::shared::infrastructure::event_publisher::{EmitStatus, EventEmitter, OutboundEvent};
use tracing::warn;

pub const JOB_CREATED_TOPIC: &str = "product.bulk.import.job.created";
pub const PROGRESS_TOPIC: &str = "product.bulk.import.progress";
pub const COMPLETED_TOPIC: &str = "product.bulk.import.completed";
pub const FAILED_TOPIC: &str = "product.bulk.import.failed";
pub const CANCELLED_TOPIC: &str = "product.bulk.import.cancelled";

/// Translate import intents into outbound events and emit them.
pub async fn dispatch_intents(
    emitter: &EventEmitter,
    correlation_id: Option<&str>,
    intents: Vec<ImportIntent>,
) -> Vec<EmitStatus> {
    let mut statuses = Vec::with_capacity(intents.len());
    for intent in intents {
        let (topic, data) = match intent {
            ImportIntent::PublishJobCreated { payload } => {
                (JOB_CREATED_TOPIC, serde_json::to_value(payload))
            }
            ImportIntent::PublishProgress { payload } => {
                (PROGRESS_TOPIC, serde_json::to_value(payload))
            }
            ImportIntent::PublishCompleted { payload } => {
                (COMPLETED_TOPIC, serde_json::to_value(payload))
            }
            ImportIntent::PublishFailed { payload } => {
                (FAILED_TOPIC, serde_json::to_value(payload))
            }
            ImportIntent::PublishCancelled { payload } => {
                (CANCELLED_TOPIC, serde_json::to_value(payload))
            }
        };
        let status = match data {
            Ok(data) => {
                let event = OutboundEvent::new(topic, data, correlation_id.map(String::from));
                emitter.emit(event).await
            }
            Err(error) => {
                warn!(topic, %error, "could not serialize outbound event");
                EmitStatus::Failed
            }
        };
        statuses.push(status);
    }
    statuses
}

#[cfg(test)]
mod import_intent_dispatch_tests {
    use super::*;
    use crate::modules::bulk_import::core::intents::ImportPhase;
    use crate::modules::bulk_import::core::job::{ImportJob, ImportMode};
    use crate::shared::infrastructure::event_publisher::in_memory::InMemoryEventPublisher;
    use chrono::Utc;
    use rstest::rstest;
    use std::sync::Arc;
    use std::time::Duration;

    #[rstest]
    #[tokio::test]
    async fn it_should_publish_progress_with_percent_complete() {
        let publisher = Arc::new(InMemoryEventPublisher::new());
        let emitter = EventEmitter::new(publisher.clone(), Duration::from_secs(1));
        let job = ImportJob::pending(
            "job-1",
            "staged/job-1",
            3,
            ImportMode::PartialImport,
            None,
            Utc::now(),
        );

        let statuses = dispatch_intents(
            &emitter,
            Some("corr-9"),
            vec![ImportIntent::progress(&job, ImportPhase::Importing, 1)],
        )
        .await;

        assert_eq!(statuses, vec![EmitStatus::Published]);
        let events = publisher.published_on(PROGRESS_TOPIC).await;
        assert_eq!(events[0].data["jobId"], "job-1");
        assert_eq!(events[0].data["percentComplete"], 33.33);
        assert_eq!(events[0].data["phase"], "importing");
        assert_eq!(events[0].correlation_id.as_deref(), Some("corr-9"));
    }
}
