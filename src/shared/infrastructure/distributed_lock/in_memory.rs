// In memory implementation of the DistributedLock port, with TTL expiry on the tokio clock.

use crate::shared::infrastructure::distributed_lock::{DistributedLock, LockError};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

struct Lease {
    owner: String,
    expires_at: Instant,
}

#[derive(Default)]
pub struct InMemoryLock {
    leases: Mutex<HashMap<String, Lease>>,
    is_offline: bool,
}

impl InMemoryLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle_offline(&mut self) {
        self.is_offline = !self.is_offline;
    }

    /// Current live holder of `key`, if any.
    pub async fn holder(&self, key: &str) -> Option<String> {
        let guard = self.leases.lock().await;
        guard
            .get(key)
            .filter(|lease| lease.expires_at > Instant::now())
            .map(|lease| lease.owner.clone())
    }

    /// Drop a lease as if its TTL had run out.
    pub async fn expire(&self, key: &str) {
        self.leases.lock().await.remove(key);
    }

    fn ensure_online(&self) -> Result<(), LockError> {
        if self.is_offline {
            return Err(LockError::Backend("Lock store offline".into()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl DistributedLock for InMemoryLock {
    async fn acquire(&self, key: &str, owner: &str, ttl: Duration) -> Result<bool, LockError> {
        self.ensure_online()?;
        let now = Instant::now();
        let mut guard = self.leases.lock().await;
        if guard.get(key).is_some_and(|lease| lease.expires_at > now) {
            return Ok(false);
        }
        guard.insert(
            key.to_string(),
            Lease {
                owner: owner.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(true)
    }

    async fn renew(&self, key: &str, owner: &str, ttl: Duration) -> Result<bool, LockError> {
        self.ensure_online()?;
        let now = Instant::now();
        let mut guard = self.leases.lock().await;
        match guard.get_mut(key) {
            Some(lease) if lease.owner == owner && lease.expires_at > now => {
                lease.expires_at = now + ttl;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release(&self, key: &str, owner: &str) -> Result<bool, LockError> {
        self.ensure_online()?;
        let mut guard = self.leases.lock().await;
        if guard.get(key).is_some_and(|lease| lease.owner == owner) {
            guard.remove(key);
            return Ok(true);
        }
        Ok(false)
    }
}
