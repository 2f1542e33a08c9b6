//! Row-change fan-out.
//!
//! [`ChangeFeed`] subscribes to the [`EventBus`](crate::bus::EventBus),
//! turns every job change event into a [`RowChange`] and hands it to a
//! [`ChangeSink`] (the realtime hub in the API). It runs as a long-lived
//! background task and stops when the bus is dropped.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use genflow_core::job_events::{ChangeKind, PUBLIC_SCHEMA};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::bus::PlatformEvent;

/// A single row change as delivered to realtime subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowChange {
    pub schema: String,
    pub table: String,
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    /// Row image after the change (`null` for deletes).
    pub record: serde_json::Value,
    /// Row image before the change (`null` for inserts).
    pub old_record: serde_json::Value,
    pub commit_timestamp: DateTime<Utc>,
}

impl RowChange {
    /// Build a change from a bus event, if the event describes one.
    pub fn from_event(event: &PlatformEvent) -> Option<Self> {
        let kind = ChangeKind::from_event_type(&event.event_type)?;
        let table = event.table.clone()?;
        Some(Self {
            schema: PUBLIC_SCHEMA.to_string(),
            table,
            kind,
            record: event.payload.get("record").cloned().unwrap_or_default(),
            old_record: event.payload.get("old_record").cloned().unwrap_or_default(),
            commit_timestamp: event.timestamp,
        })
    }

    /// The row image filters are evaluated against.
    ///
    /// Deletes only carry the old image, so filters match on that.
    pub fn filter_row(&self) -> &serde_json::Value {
        match self.kind {
            ChangeKind::Delete => &self.old_record,
            _ => &self.record,
        }
    }
}

/// Receiver of row changes.
#[async_trait]
pub trait ChangeSink: Send + Sync {
    async fn deliver(&self, change: &RowChange);
}

/// Background service that forwards bus events to a [`ChangeSink`].
pub struct ChangeFeed;

impl ChangeFeed {
    /// Run the forwarding loop until the bus is closed.
    pub async fn run<S: ChangeSink + ?Sized>(
        sink: Arc<S>,
        mut receiver: broadcast::Receiver<PlatformEvent>,
    ) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Some(change) = RowChange::from_event(&event) {
                        sink.deliver(&change).await;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Change feed lagged, some changes were dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, change feed shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;
    use uuid::Uuid;

    use super::*;
    use crate::bus::EventBus;

    #[derive(Default)]
    struct Collect(Mutex<Vec<RowChange>>);

    #[async_trait]
    impl ChangeSink for Collect {
        async fn deliver(&self, change: &RowChange) {
            self.0.lock().unwrap().push(change.clone());
        }
    }

    #[test]
    fn non_change_events_are_ignored() {
        assert!(RowChange::from_event(&PlatformEvent::new("job.submitted")).is_none());
        // Change type but no table.
        assert!(RowChange::from_event(&PlatformEvent::new("jobs.update")).is_none());
    }

    #[test]
    fn delete_filters_on_old_image() {
        let event = PlatformEvent::job_change(
            ChangeKind::Delete,
            Uuid::new_v4(),
            Uuid::new_v4(),
            serde_json::Value::Null,
            json!({"status": "queued"}),
        );
        let change = RowChange::from_event(&event).unwrap();
        assert_eq!(change.kind, ChangeKind::Delete);
        assert_eq!(change.filter_row()["status"], "queued");
    }

    #[test]
    fn wire_shape() {
        let event = PlatformEvent::job_change(
            ChangeKind::Insert,
            Uuid::new_v4(),
            Uuid::new_v4(),
            json!({"status": "queued"}),
            serde_json::Value::Null,
        );
        let value = serde_json::to_value(RowChange::from_event(&event).unwrap()).unwrap();
        assert_eq!(value["schema"], "public");
        assert_eq!(value["table"], "jobs");
        assert_eq!(value["type"], "INSERT");
        assert!(value["old_record"].is_null());
    }

    #[tokio::test]
    async fn feed_forwards_until_bus_dropped() {
        let bus = EventBus::default();
        let sink = Arc::new(Collect::default());
        let task = tokio::spawn(ChangeFeed::run(Arc::clone(&sink), bus.subscribe()));

        bus.publish(PlatformEvent::new("unrelated"));
        bus.publish(PlatformEvent::job_change(
            ChangeKind::Update,
            Uuid::new_v4(),
            Uuid::new_v4(),
            json!({"status": "completed"}),
            json!({"status": "processing"}),
        ));
        drop(bus);
        task.await.unwrap();

        let seen = sink.0.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].record["status"], "completed");
    }
}
