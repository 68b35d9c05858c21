// Idempotency ledger port.
//
// Records which inbound events a consumer has already handled. Records are
// write-once: `mark_processed` fails distinctly when the record exists, so a
// caller racing a duplicate delivery can tell it lost.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("event {event_id} already processed by {consumer}")]
    AlreadyProcessed { consumer: String, event_id: String },

    #[error("backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait ProcessedEventLedger: Send + Sync {
    async fn has_processed(&self, consumer: &str, event_id: &str) -> Result<bool, LedgerError>;

    async fn mark_processed(&self, consumer: &str, event_id: &str) -> Result<(), LedgerError>;

    /// Remove records processed before `cutoff`. Returns how many were removed.
    async fn prune_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, LedgerError>;
}

pub mod in_memory;
