use crate::modules::catalog_sync::core::intents::CatalogIntent;
use crate::shared::infrastructure::event_publisher::{EventEmitter, OutboundEvent};
use tracing::warn;

pub const BACK_IN_STOCK_TOPIC: &str = "product.back.in.stock";
pub const BADGE_ASSIGNED_TOPIC: &str = "product.badge.auto.assigned";
pub const BADGE_REMOVED_TOPIC: &str = "product.badge.auto.removed";

/// Translate catalog intents into outbound events and hand them to the emitter in the
/// background. Returns how many were scheduled; the caller never waits on the transport.
pub fn schedule_intents(
    emitter: &EventEmitter,
    correlation_id: Option<&str>,
    intents: Vec<CatalogIntent>,
) -> usize {
    emitter.emit_detached(outbound_events(correlation_id, intents))
}

fn outbound_events(
    correlation_id: Option<&str>,
    intents: Vec<CatalogIntent>,
) -> Vec<OutboundEvent> {
    let mut events = Vec::with_capacity(intents.len());
    for intent in intents {
        let (topic, data) = match intent {
            CatalogIntent::PublishBackInStock { payload } => {
                (BACK_IN_STOCK_TOPIC, serde_json::to_value(payload))
            }
            CatalogIntent::PublishBadgeAssigned { payload } => {
                (BADGE_ASSIGNED_TOPIC, serde_json::to_value(payload))
            }
            CatalogIntent::PublishBadgeRemoved { payload } => {
                (BADGE_REMOVED_TOPIC, serde_json::to_value(payload))
            }
        };
        let data = match data {
            Ok(data) => data,
            Err(error) => {
                warn!(topic, %error, "could not serialize outbound event");
                continue;
            }
        };
        events.push(OutboundEvent::new(topic, data, correlation_id.map(String::from)));
    }
    events
}
