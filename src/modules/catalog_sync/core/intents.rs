use crate::modules::catalog_sync::core::badges::RemovalReason;
use crate::shared::core::product::{AvailabilityState, BadgeType};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackInStock {
    pub product_id: String,
    pub sku: String,
    pub product_name: String,
    pub previous_status: AvailabilityState,
    pub status: AvailabilityState,
    pub available_quantity: u64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeAssigned {
    pub product_id: String,
    pub badge_type: BadgeType,
    pub label: String,
    pub priority: u32,
    pub assigned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeRemoved {
    pub product_id: String,
    pub badge_type: BadgeType,
    pub reason: RemovalReason,
    pub removed_at: DateTime<Utc>,
}

/// Derived facts from an applied denormalized update.
/// The outbound event_emitter adapter publishes them after the handler has succeeded.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogIntent {
    PublishBackInStock { payload: BackInStock },
    PublishBadgeAssigned { payload: BadgeAssigned },
    PublishBadgeRemoved { payload: BadgeRemoved },
}
