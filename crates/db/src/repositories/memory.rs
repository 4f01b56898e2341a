use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use switchboard_core::{ExpiringKvStore, KvError};
use tokio::time::Instant;

#[derive(Clone, Debug)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// Process-local store keyed by a sharded map, so writers of distinct keys
/// never contend on a single lock.
///
/// Deadlines use `tokio::time::Instant`, which follows a paused test clock.
#[derive(Default)]
pub struct InMemoryKvStore {
    entries: DashMap<String, Entry>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl ExpiringKvStore for InMemoryKvStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KvError> {
        let expires_at = Instant::now().checked_add(ttl).ok_or_else(|| KvError::Rejected {
            key: key.to_owned(),
            reason: format!("ttl of {}s overflows the clock", ttl.as_secs()),
        })?;

        self.entries.insert(key.to_owned(), Entry { value: value.to_owned(), expires_at });
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let now = Instant::now();
        let expired = match self.entries.get(key) {
            None => return Ok(None),
            Some(entry) if entry.expires_at > now => return Ok(Some(entry.value.clone())),
            Some(_) => true,
        };

        if expired {
            self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        }
        Ok(None)
    }

    async fn purge_expired(&self) -> Result<u64, KvError> {
        let now = Instant::now();
        let mut removed = 0_u64;
        self.entries.retain(|_, entry| {
            let keep = entry.expires_at > now;
            if !keep {
                removed += 1;
            }
            keep
        });
        Ok(removed)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
