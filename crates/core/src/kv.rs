//! Expiring key/value contract shared by the correlation store and its backends.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum KvError {
    #[error("key/value backend unavailable: {0}")]
    Unavailable(String),
    #[error("key/value write rejected for `{key}`: {reason}")]
    Rejected { key: String, reason: String },
}

/// Storage collaborator with per-entry time-to-live.
///
/// Reads never distinguish a key that was never written from one that has
/// expired: both yield `Ok(None)`.
#[async_trait]
pub trait ExpiringKvStore: Send + Sync {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KvError>;

    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    /// Drops entries whose deadline has passed and returns how many were removed.
    async fn purge_expired(&self) -> Result<u64, KvError>;

    fn backend_name(&self) -> &'static str;
}
