use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use switchboard_core::{ExpiringKvStore, KvError};
use tracing::debug;

use super::unavailable;
use crate::DbPool;

/// SQLite-backed store; survives restarts and can be shared by several
/// server processes pointing at the same database file.
///
/// Deadlines are stored as unix epoch milliseconds in `kv_entry.expires_at`.
pub struct SqlKvStore {
    pool: DbPool,
}

impl SqlKvStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl ExpiringKvStore for SqlKvStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KvError> {
        let now = Utc::now();
        let ttl_ms = i64::try_from(ttl.as_millis()).map_err(|_| KvError::Rejected {
            key: key.to_owned(),
            reason: format!("ttl of {}s is out of range", ttl.as_secs()),
        })?;
        let expires_at = now.timestamp_millis().saturating_add(ttl_ms);

        sqlx::query(
            "INSERT INTO kv_entry (key, value, expires_at, updated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                expires_at = excluded.expires_at,
                updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(expires_at)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        sqlx::query_scalar::<_, String>(
            "SELECT value FROM kv_entry WHERE key = ? AND expires_at > ?",
        )
        .bind(key)
        .bind(Utc::now().timestamp_millis())
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)
    }

    async fn purge_expired(&self) -> Result<u64, KvError> {
        let result = sqlx::query("DELETE FROM kv_entry WHERE expires_at <= ?")
            .bind(Utc::now().timestamp_millis())
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;

        let removed = result.rows_affected();
        debug!(event_name = "db.kv.purged", removed, "purged expired kv entries");
        Ok(removed)
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}
