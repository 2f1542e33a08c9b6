//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! Shared as `Arc<EventBus>`. Handlers publish a [`PlatformEvent`] after
//! every committed job mutation; the [`ChangeFeed`](crate::ChangeFeed)
//! consumes them.

use chrono::{DateTime, Utc};
use genflow_core::job_events::{ChangeKind, JOBS_TABLE};
use genflow_core::types::DbId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Something that happened to a persisted row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformEvent {
    /// `<table>.<insert|update|delete>` for row changes.
    pub event_type: String,
    /// Table the affected row lives in.
    pub table: Option<String>,
    pub row_id: Option<DbId>,
    /// Owner of the row, used for per-user fan-out.
    pub owner_id: Option<DbId>,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl PlatformEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            table: None,
            row_id: None,
            owner_id: None,
            payload: serde_json::json!({}),
            timestamp: Utc::now(),
        }
    }

    /// A change to a `jobs` row. `record` is the image after the change and
    /// `old_record` the image before it; either may be `null`.
    pub fn job_change(
        kind: ChangeKind,
        job_id: DbId,
        user_id: DbId,
        record: serde_json::Value,
        old_record: serde_json::Value,
    ) -> Self {
        Self {
            table: Some(JOBS_TABLE.to_string()),
            row_id: Some(job_id),
            owner_id: Some(user_id),
            payload: serde_json::json!({
                "record": record,
                "old_record": old_record,
            }),
            ..Self::new(kind.event_type())
        }
    }
}

const DEFAULT_CAPACITY: usize = 1024;

/// Fan-out hub: every subscriber sees every event published after it
/// subscribed. Slow receivers observe `RecvError::Lagged`.
pub struct EventBus {
    sender: broadcast::Sender<PlatformEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to all current subscribers. Dropped when nobody listens.
    pub fn publish(&self, event: PlatformEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("No event subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlatformEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
