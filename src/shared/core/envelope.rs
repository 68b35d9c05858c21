// Inbound event envelope and the response contract towards the delivery transport.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::warn;

/// What the sidecar should do with a delivered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HandlerOutcome {
    /// Processed or intentionally skipped.
    Success,
    /// Transient failure, redeliver.
    Retry,
    /// Permanent failure or intentional no-op, do not redeliver.
    Drop,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HandlerResponse {
    pub status: HandlerOutcome,
}

impl From<HandlerOutcome> for HandlerResponse {
    fn from(status: HandlerOutcome) -> Self {
        Self { status }
    }
}

/// Event as delivered by the sidecar. CloudEvents attribute names are accepted as aliases.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InboundEvent<T> {
    #[serde(alias = "id")]
    pub event_id: String,
    #[serde(alias = "time")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, alias = "correlationid")]
    pub correlation_id: Option<String>,
    pub data: T,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventMeta {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Option<String>,
}

impl<T> InboundEvent<T> {
    pub fn into_parts(self) -> (EventMeta, T) {
        (
            EventMeta {
                event_id: self.event_id,
                timestamp: self.timestamp,
                correlation_id: self.correlation_id,
            },
            self.data,
        )
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("malformed event payload: {0}")]
    Malformed(String),

    #[error("event is missing an event id")]
    MissingEventId,

    #[error("invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

pub fn parse_event<T: DeserializeOwned>(body: &[u8]) -> Result<InboundEvent<T>, PayloadError> {
    let event: InboundEvent<T> =
        serde_json::from_slice(body).map_err(|e| PayloadError::Malformed(e.to_string()))?;
    if event.event_id.trim().is_empty() {
        return Err(PayloadError::MissingEventId);
    }
    Ok(event)
}

/// Field-level rules a payload must satisfy beyond its shape.
pub trait EventPayload: DeserializeOwned {
    fn validate(&self) -> Result<(), PayloadError> {
        Ok(())
    }
}

/// Parse and validate a delivered event. Rejected payloads are logged by digest and
/// answered with `Drop`, so the caller can return the outcome as is.
pub fn decode<T: EventPayload>(topic: &str, body: &[u8]) -> Result<(EventMeta, T), HandlerOutcome> {
    let event = parse_event::<T>(body).and_then(|event| {
        event.data.validate()?;
        Ok(event)
    });
    match event {
        Ok(event) => Ok(event.into_parts()),
        Err(error) => {
            warn!(
                topic,
                payload_digest = %payload_digest(body),
                %error,
                "dropping invalid event payload"
            );
            Err(HandlerOutcome::Drop)
        }
    }
}

/// Short digest used to correlate dropped payloads in logs without logging their content.
pub fn payload_digest(body: &[u8]) -> String {
    let digest = Sha256::digest(body);
    hex::encode(&digest[..8])
}
