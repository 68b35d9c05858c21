// In memory EventPublisher that records every published event for inspection.

use crate::shared::infrastructure::event_publisher::{EventPublisher, OutboundEvent, PublishError};
use tokio::sync::Mutex;

#[derive(Default)]
pub struct InMemoryEventPublisher {
    events: Mutex<Vec<OutboundEvent>>,
    is_offline: bool,
}

impl InMemoryEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle_offline(&mut self) {
        self.is_offline = !self.is_offline;
    }

    pub async fn published(&self) -> Vec<OutboundEvent> {
        self.events.lock().await.clone()
    }

    pub async fn published_on(&self, topic: &str) -> Vec<OutboundEvent> {
        self.events
            .lock()
            .await
            .iter()
            .filter(|e| e.topic == topic)
            .cloned()
            .collect()
    }
}

#[async_trait::async_trait]
impl EventPublisher for InMemoryEventPublisher {
    async fn publish(&self, event: &OutboundEvent) -> Result<(), PublishError> {
        if self.is_offline {
            return Err(PublishError::Transport("Publisher offline".into()));
        }
        self.events.lock().await.push(event.clone());
        Ok(())
    }
}
