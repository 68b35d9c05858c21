// Availability status derivation.
//
// Status precedence: discontinued > pre-order > out-of-stock > low-stock > in-stock.

use crate::shared::core::product::{AvailabilityState, AvailabilityStatus};
use chrono::{DateTime, Utc};

pub const DEFAULT_LOW_STOCK_THRESHOLD: u64 = 10;

/// Flags only the stock owner sets. Reservation events leave them untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockFlags {
    pub discontinued: bool,
    pub available_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockLevel {
    pub available_quantity: u64,
    pub low_stock_threshold: Option<u64>,
    pub flags: Option<StockFlags>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityChange {
    pub status: AvailabilityStatus,
    pub previous: Option<AvailabilityState>,
    pub back_in_stock: bool,
}

pub fn derive_state(
    quantity: u64,
    threshold: u64,
    flags: StockFlags,
    at: DateTime<Utc>,
) -> AvailabilityState {
    if flags.discontinued {
        return AvailabilityState::Discontinued;
    }
    if flags.available_date.is_some_and(|date| date > at) {
        return AvailabilityState::PreOrder;
    }
    match quantity {
        0 => AvailabilityState::OutOfStock,
        q if q <= threshold => AvailabilityState::LowStock,
        _ => AvailabilityState::InStock,
    }
}

pub fn next_availability(
    previous: Option<&AvailabilityStatus>,
    level: StockLevel,
    at: DateTime<Utc>,
) -> AvailabilityChange {
    let threshold = level
        .low_stock_threshold
        .or(previous.map(|p| p.low_stock_threshold))
        .unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD);
    let flags = level.flags.unwrap_or(StockFlags {
        discontinued: previous.is_some_and(|p| p.discontinued),
        available_date: previous.and_then(|p| p.available_date),
    });
    let state = derive_state(level.available_quantity, threshold, flags, at);
    let previous_state = previous.map(|p| p.status);

    AvailabilityChange {
        status: AvailabilityStatus {
            status: state,
            available_quantity: level.available_quantity,
            low_stock_threshold: threshold,
            discontinued: flags.discontinued,
            available_date: flags.available_date,
            last_updated: at,
        },
        previous: previous_state,
        back_in_stock: previous_state == Some(AvailabilityState::OutOfStock)
            && state != AvailabilityState::OutOfStock,
    }
}
