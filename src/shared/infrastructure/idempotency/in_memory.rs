// In memory implementation of the ProcessedEventLedger port.

use crate::shared::infrastructure::idempotency::{LedgerError, ProcessedEventLedger};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tokio::sync::Mutex;

#[derive(Default)]
pub struct InMemoryLedger {
    records: Mutex<HashMap<(String, String), DateTime<Utc>>>,
    is_offline: bool,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle_offline(&mut self) {
        self.is_offline = !self.is_offline;
    }

    pub async fn record_at(&self, consumer: &str, event_id: &str, processed_at: DateTime<Utc>) {
        self.records
            .lock()
            .await
            .insert((consumer.to_string(), event_id.to_string()), processed_at);
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    fn ensure_online(&self) -> Result<(), LedgerError> {
        if self.is_offline {
            return Err(LedgerError::Backend("Ledger offline".into()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ProcessedEventLedger for InMemoryLedger {
    async fn has_processed(&self, consumer: &str, event_id: &str) -> Result<bool, LedgerError> {
        self.ensure_online()?;
        Ok(self
            .records
            .lock()
            .await
            .contains_key(&(consumer.to_string(), event_id.to_string())))
    }

    async fn mark_processed(&self, consumer: &str, event_id: &str) -> Result<(), LedgerError> {
        self.ensure_online()?;
        let mut guard = self.records.lock().await;
        match guard.entry((consumer.to_string(), event_id.to_string())) {
            Entry::Occupied(_) => Err(LedgerError::AlreadyProcessed {
                consumer: consumer.to_string(),
                event_id: event_id.to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(Utc::now());
                Ok(())
            }
        }
    }

    async fn prune_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, LedgerError> {
        self.ensure_online()?;
        let mut guard = self.records.lock().await;
        let before = guard.len();
        guard.retain(|_, processed_at| *processed_at >= cutoff);
        Ok(before - guard.len())
    }
}
