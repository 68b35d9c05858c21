// Distributed lock port.
//
// A lock is held by an owner token until it is released or its TTL expires.
// The TTL is the backstop against a crashed holder; long-running holders renew.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LockError {
    #[error("lock backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait DistributedLock: Send + Sync {
    /// Returns `false` when another owner currently holds the lock.
    async fn acquire(&self, key: &str, owner: &str, ttl: Duration) -> Result<bool, LockError>;

    /// Extend the TTL. Returns `false` when `owner` no longer holds the lock.
    async fn renew(&self, key: &str, owner: &str, ttl: Duration) -> Result<bool, LockError>;

    /// Returns `false` when `owner` did not hold the lock.
    async fn release(&self, key: &str, owner: &str) -> Result<bool, LockError>;
}

pub mod in_memory;
