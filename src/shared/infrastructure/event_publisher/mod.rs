// Outbound event publication.
//
// Purpose
// - EventPublisher: the transport port (sidecar, broker client, in memory).
// - EventEmitter: fire-and-forget wrapper handed to handlers at composition time.
//
// Responsibilities
// - Emission never fails the caller: failures and timeouts are logged and reported as a status.
// - Detached emissions run on a task tracker shared by every clone of the emitter,
//   so shutdown and tests can wait for them with `flush`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundEvent {
    pub topic: String,
    pub event_id: String,
    pub correlation_id: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub data: serde_json::Value,
}

impl OutboundEvent {
    pub fn new(
        topic: impl Into<String>,
        data: serde_json::Value,
        correlation_id: Option<String>,
    ) -> Self {
        Self {
            topic: topic.into(),
            event_id: Uuid::now_v7().to_string(),
            correlation_id,
            occurred_at: Utc::now(),
            data,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("publish rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &OutboundEvent) -> Result<(), PublishError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitStatus {
    Published,
    Failed,
}

#[derive(Clone)]
pub struct EventEmitter {
    publisher: Arc<dyn EventPublisher>,
    timeout: Duration,
    detached: TaskTracker,
}

impl EventEmitter {
    pub fn new(publisher: Arc<dyn EventPublisher>, timeout: Duration) -> Self {
        Self {
            publisher,
            timeout,
            detached: TaskTracker::new(),
        }
    }

    /// Emit `events` in order on a background task. Returns how many were scheduled.
    pub fn emit_detached(&self, events: Vec<OutboundEvent>) -> usize {
        let scheduled = events.len();
        if scheduled == 0 {
            return 0;
        }
        let emitter = self.clone();
        self.detached.spawn(async move {
            for event in events {
                emitter.emit(event).await;
            }
        });
        scheduled
    }

    /// Wait for every detached emission scheduled so far.
    pub async fn flush(&self) {
        self.detached.close();
        self.detached.wait().await;
        self.detached.reopen();
    }

    pub async fn emit(&self, event: OutboundEvent) -> EmitStatus {
        match tokio::time::timeout(self.timeout, self.publisher.publish(&event)).await {
            Ok(Ok(())) => {
                debug!(
                    topic = %event.topic,
                    event_id = %event.event_id,
                    correlation_id = ?event.correlation_id,
                    "event published"
                );
                EmitStatus::Published
            }
            Ok(Err(error)) => {
                warn!(
                    topic = %event.topic,
                    event_id = %event.event_id,
                    correlation_id = ?event.correlation_id,
                    %error,
                    "event publication failed"
                );
                EmitStatus::Failed
            }
            Err(_) => {
                warn!(
                    topic = %event.topic,
                    event_id = %event.event_id,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "event publication timed out"
                );
                EmitStatus::Failed
            }
        }
    }
}

pub mod dapr;
pub mod in_memory;
