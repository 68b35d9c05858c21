// Shared test fixtures for inbound event envelopes.

use crate::shared::core::envelope::EventMeta;
use chrono::{DateTime, TimeZone, Utc};

pub const CORRELATION_ID: &str = "corr-fixed-0001";

pub fn fixed_timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
}

pub fn meta(event_id: &str) -> EventMeta {
    meta_at(event_id, fixed_timestamp())
}

pub fn meta_at(event_id: &str, timestamp: DateTime<Utc>) -> EventMeta {
    EventMeta {
        event_id: event_id.to_string(),
        timestamp,
        correlation_id: Some(CORRELATION_ID.to_string()),
    }
}

/// Serialized delivery body as the sidecar posts it.
pub fn envelope(event_id: &str, data: serde_json::Value) -> String {
    envelope_at(event_id, fixed_timestamp(), data)
}

pub fn envelope_at(event_id: &str, timestamp: DateTime<Utc>, data: serde_json::Value) -> String {
    serde_json::json!({
        "eventId": event_id,
        "timestamp": timestamp,
        "correlationId": CORRELATION_ID,
        "data": data,
    })
    .to_string()
}
