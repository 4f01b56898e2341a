//! Links a modal's view id back to the action that opened it.
//!
//! A start handler that opens a modal calls [`CorrelationStore::put`] with the
//! view id the platform assigned. When the submission arrives in a separate
//! request, the dispatcher resolves the originating action with
//! [`CorrelationStore::get`]. Records expire after [`CORRELATION_TTL`]; after
//! that the submission can no longer be routed.

use std::sync::Arc;
use std::time::Duration;

use switchboard_core::kv::{ExpiringKvStore, KvError};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::registry::ActionName;

/// How long a modal may stay open before its submission becomes unroutable.
pub const CORRELATION_TTL: Duration = Duration::from_secs(1800);

pub fn correlation_key(view_id: &str, workspace_id: &str) -> String {
    format!("{view_id}.{workspace_id}")
}

#[derive(Debug, Error)]
pub enum CorrelationError {
    #[error("cannot correlate `{action}`: view id is empty")]
    MissingViewId { action: String },
    #[error("failed to store correlation `{key}`: {source}")]
    Write {
        key: String,
        #[source]
        source: KvError,
    },
}

#[derive(Clone)]
pub struct CorrelationStore {
    kv: Arc<dyn ExpiringKvStore>,
}

impl CorrelationStore {
    pub fn new(kv: Arc<dyn ExpiringKvStore>) -> Self {
        Self { kv }
    }

    /// Records that `view_id` in `workspace_id` was opened by `action`.
    /// A second put for the same pair overwrites the first.
    pub async fn put(
        &self,
        action: &str,
        view_id: &str,
        workspace_id: &str,
    ) -> Result<(), CorrelationError> {
        let action = ActionName::new(action);
        if view_id.trim().is_empty() {
            return Err(CorrelationError::MissingViewId { action: action.to_string() });
        }

        let key = correlation_key(view_id, workspace_id);
        self.kv
            .set(&key, action.as_str(), CORRELATION_TTL)
            .await
            .map_err(|source| CorrelationError::Write { key: key.clone(), source })?;

        debug!(
            event_name = "slack.correlation.put",
            action = %action,
            view_id,
            workspace_id,
            "correlation record stored"
        );
        Ok(())
    }

    /// Originating action for a submission, or `None` when the record was
    /// never written, has expired, or the backend could not be read.
    pub async fn get(&self, view_id: &str, workspace_id: &str) -> Option<ActionName> {
        let key = correlation_key(view_id, workspace_id);
        match self.kv.get(&key).await {
            Ok(value) => value.map(|action| ActionName::new(&action)),
            Err(error) => {
                warn!(
                    event_name = "slack.correlation.read_failed",
                    view_id,
                    workspace_id,
                    error = %error,
                    "correlation read failed; treating as miss"
                );
                None
            }
        }
    }

    /// Round trip to the backend without touching any live record.
    pub async fn check(&self) -> Result<(), KvError> {
        self.kv.get("switchboard.health.probe").await.map(|_| ())
    }

    pub async fn purge_expired(&self) -> Result<u64, KvError> {
        self.kv.purge_expired().await
    }

    pub fn backend_name(&self) -> &'static str {
        self.kv.backend_name()
    }
}

/// Periodically drops expired records. Reads already ignore them, so this
/// only bounds storage growth.
pub fn spawn_purge_task(store: CorrelationStore, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match store.purge_expired().await {
                Ok(0) => {}
                Ok(removed) => info!(
                    event_name = "slack.correlation.purged",
                    backend = store.backend_name(),
                    removed,
                    "expired correlation records purged"
                ),
                Err(error) => warn!(
                    event_name = "slack.correlation.purge_failed",
                    backend = store.backend_name(),
                    error = %error,
                    "correlation purge failed"
                ),
            }
        }
    })
}
