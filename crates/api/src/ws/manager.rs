use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::ws::Message;
use genflow_core::change_filter::ChangeFilter;
use genflow_core::realtime::{
    ChangeData, ChangePayload, ChangeSubscription, Frame, EVENT_POSTGRES_CHANGES,
};
use genflow_core::types::{DbId, Timestamp};
use genflow_events::{ChangeSink, RowChange};
use tokio::sync::{mpsc, RwLock};

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// One accepted change subscription on a joined channel.
#[derive(Debug, Clone)]
pub struct Binding {
    pub id: u64,
    pub subscription: ChangeSubscription,
    pub filter: Option<ChangeFilter>,
}

impl Binding {
    fn matches(&self, change: &RowChange) -> bool {
        self.subscription.schema == change.schema
            && self.subscription.table == change.table
            && change.kind.matches(&self.subscription.event)
            && self
                .filter
                .as_ref()
                .map_or(true, |f| f.matches(change.filter_row()))
    }
}

/// A joined `realtime:*` topic.
#[derive(Debug, Clone)]
struct Channel {
    join_ref: Option<String>,
    bindings: Vec<Binding>,
}

/// Metadata for a single WebSocket connection.
pub struct WsConnection {
    /// User the connection authenticated as on its first join.
    pub user_id: Option<DbId>,
    /// Channel sender for outbound messages to this connection.
    pub sender: WsSender,
    /// When this connection was established.
    pub connected_at: Timestamp,
    channels: HashMap<String, Channel>,
}

/// Manages all active realtime connections and their subscriptions.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared across the application.
pub struct WsManager {
    connections: RwLock<HashMap<String, WsConnection>>,
    next_binding_id: AtomicU64,
}

impl WsManager {
    /// Create a new, empty connection manager.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            next_binding_id: AtomicU64::new(1),
        }
    }

    /// Register a new connection.
    ///
    /// Returns the receiver half of the message channel so the caller can
    /// forward messages to the WebSocket sink.
    pub async fn add(&self, conn_id: String) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = WsConnection {
            user_id: None,
            sender: tx,
            connected_at: chrono::Utc::now(),
            channels: HashMap::new(),
        };
        self.connections.write().await.insert(conn_id, conn);
        rx
    }

    /// Remove a connection by its ID.
    pub async fn remove(&self, conn_id: &str) {
        self.connections.write().await.remove(conn_id);
    }

    /// Queue a frame for one connection. Returns `false` if it is gone.
    pub async fn send_frame(&self, conn_id: &str, frame: &Frame) -> bool {
        let Some(message) = frame_message(frame) else {
            return false;
        };
        self.connections
            .read()
            .await
            .get(conn_id)
            .is_some_and(|conn| conn.sender.send(message).is_ok())
    }

    /// Join (or re-join) `topic` with the given subscriptions.
    ///
    /// Returns the subscriptions with their assigned ids, or `None` if the
    /// connection no longer exists.
    pub async fn join(
        &self,
        conn_id: &str,
        user_id: DbId,
        topic: &str,
        join_ref: Option<String>,
        subscriptions: Vec<(ChangeSubscription, Option<ChangeFilter>)>,
    ) -> Option<Vec<ChangeSubscription>> {
        let mut conns = self.connections.write().await;
        let conn = conns.get_mut(conn_id)?;

        let bindings: Vec<Binding> = subscriptions
            .into_iter()
            .map(|(mut subscription, filter)| {
                let id = self.next_binding_id.fetch_add(1, Ordering::Relaxed);
                subscription.id = Some(id);
                Binding {
                    id,
                    subscription,
                    filter,
                }
            })
            .collect();
        let accepted = bindings.iter().map(|b| b.subscription.clone()).collect();

        conn.user_id = Some(user_id);
        conn.channels
            .insert(topic.to_string(), Channel { join_ref, bindings });
        Some(accepted)
    }

    /// Leave `topic`. Returns whether the connection had joined it.
    pub async fn leave(&self, conn_id: &str, topic: &str) -> bool {
        self.connections
            .write()
            .await
            .get_mut(conn_id)
            .is_some_and(|conn| conn.channels.remove(topic).is_some())
    }

    /// User a connection authenticated as, if it has joined anything.
    pub async fn user_of(&self, conn_id: &str) -> Option<DbId> {
        self.connections
            .read()
            .await
            .get(conn_id)
            .and_then(|conn| conn.user_id)
    }

    /// Push a row change to every channel with a matching binding.
    ///
    /// Returns the number of channels the change was sent to.
    pub async fn deliver_change(&self, change: &RowChange) -> usize {
        let data = ChangeData {
            schema: change.schema.clone(),
            table: change.table.clone(),
            kind: change.kind,
            record: change.record.clone(),
            old_record: change.old_record.clone(),
            commit_timestamp: change.commit_timestamp.to_rfc3339(),
        };

        let conns = self.connections.read().await;
        let mut count = 0;
        for conn in conns.values() {
            for (topic, channel) in &conn.channels {
                let ids: Vec<u64> = channel
                    .bindings
                    .iter()
                    .filter(|b| b.matches(change))
                    .map(|b| b.id)
                    .collect();
                if ids.is_empty() {
                    continue;
                }

                let payload = ChangePayload {
                    data: data.clone(),
                    ids,
                };
                let frame = Frame::new(
                    topic.clone(),
                    EVENT_POSTGRES_CHANGES,
                    serde_json::to_value(&payload).unwrap_or_default(),
                )
                .with_join_ref(channel.join_ref.clone());

                if let Some(message) = frame_message(&frame) {
                    let _ = conn.sender.send(message);
                    count += 1;
                }
            }
        }
        count
    }

    /// Return the current number of active connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Send a Close frame to every connection, then clear the map.
    ///
    /// Used during graceful shutdown to notify all clients before the
    /// server stops accepting new connections.
    pub async fn shutdown_all(&self) {
        let mut conns = self.connections.write().await;
        let count = conns.len();
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Close(None));
        }
        conns.clear();
        tracing::info!(count, "Closed all WebSocket connections");
    }

    /// Send a Ping frame to every connected client.
    pub async fn ping_all(&self) {
        let conns = self.connections.read().await;
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Ping(Bytes::new()));
        }
    }
}

impl Default for WsManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChangeSink for WsManager {
    async fn deliver(&self, change: &RowChange) {
        let delivered = self.deliver_change(change).await;
        tracing::trace!(
            table = %change.table,
            change = change.kind.as_str(),
            delivered,
            "Row change fanned out",
        );
    }
}

/// Serialize a frame into a text message.
pub fn frame_message(frame: &Frame) -> Option<Message> {
    match serde_json::to_string(frame) {
        Ok(text) => Some(Message::Text(text.into())),
        Err(e) => {
            tracing::error!(error = %e, topic = %frame.topic, "Failed to encode realtime frame");
            None
        }
    }
}
