//! Realtime channel wire format.
//!
//! Frames are JSON objects `{topic, event, payload, ref, join_ref}` in the
//! Phoenix channel style. A client joins a `realtime:<name>` topic with a
//! [`JoinPayload`] listing the `postgres_changes` it wants; the server then
//! pushes `postgres_changes` frames carrying a [`ChangePayload`].

use serde::{Deserialize, Serialize};

pub const EVENT_JOIN: &str = "phx_join";
pub const EVENT_LEAVE: &str = "phx_leave";
pub const EVENT_REPLY: &str = "phx_reply";
pub const EVENT_ERROR: &str = "phx_error";
pub const EVENT_CLOSE: &str = "phx_close";
pub const EVENT_HEARTBEAT: &str = "heartbeat";
pub const EVENT_ACCESS_TOKEN: &str = "access_token";
pub const EVENT_POSTGRES_CHANGES: &str = "postgres_changes";

/// Topic heartbeats are sent on.
pub const PHOENIX_TOPIC: &str = "phoenix";

/// Prefix of every subscribable topic.
pub const TOPIC_PREFIX: &str = "realtime:";

pub const REPLY_OK: &str = "ok";
pub const REPLY_ERROR: &str = "error";

/// One frame on the socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(rename = "ref", default)]
    pub msg_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_ref: Option<String>,
}

impl Frame {
    pub fn new(topic: impl Into<String>, event: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            topic: topic.into(),
            event: event.into(),
            payload,
            msg_ref: None,
            join_ref: None,
        }
    }

    pub fn with_ref(mut self, msg_ref: Option<String>) -> Self {
        self.msg_ref = msg_ref;
        self
    }

    pub fn with_join_ref(mut self, join_ref: Option<String>) -> Self {
        self.join_ref = join_ref;
        self
    }

    /// A `phx_reply` to this frame with the given status and response.
    pub fn reply(&self, status: &str, response: serde_json::Value) -> Self {
        Frame::new(
            self.topic.clone(),
            EVENT_REPLY,
            serde_json::json!({ "status": status, "response": response }),
        )
        .with_ref(self.msg_ref.clone())
        .with_join_ref(self.join_ref.clone())
    }

    /// Status of a `phx_reply` frame.
    pub fn reply_status(&self) -> Option<&str> {
        (self.event == EVENT_REPLY)
            .then(|| self.payload.get("status").and_then(|s| s.as_str()))
            .flatten()
    }
}

/// One requested change stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeSubscription {
    /// `INSERT`, `UPDATE`, `DELETE` or `*`.
    pub event: String,
    #[serde(default = "default_schema")]
    pub schema: String,
    pub table: String,
    /// Optional `column=op.value` filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    /// Server-assigned id, present in the join reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
}

fn default_schema() -> String {
    crate::job_events::PUBLIC_SCHEMA.to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JoinConfig {
    #[serde(default)]
    pub postgres_changes: Vec<ChangeSubscription>,
}

/// Payload of a `phx_join` frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JoinPayload {
    #[serde(default)]
    pub config: JoinConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

/// The `data` of a `postgres_changes` push.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeData {
    pub schema: String,
    pub table: String,
    #[serde(rename = "type")]
    pub kind: crate::job_events::ChangeKind,
    #[serde(default)]
    pub record: serde_json::Value,
    #[serde(default)]
    pub old_record: serde_json::Value,
    pub commit_timestamp: String,
}

/// Payload of a `postgres_changes` push: the change plus the ids of the
/// subscriptions it matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangePayload {
    pub data: ChangeData,
    #[serde(default)]
    pub ids: Vec<u64>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::job_events::ChangeKind;

    #[test]
    fn frame_ref_is_named_ref() {
        let frame = Frame::new("phoenix", EVENT_HEARTBEAT, json!({})).with_ref(Some("7".into()));
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["ref"], "7");
        assert!(value.get("join_ref").is_none());
    }

    #[test]
    fn reply_echoes_refs() {
        let join: Frame = serde_json::from_value(json!({
            "topic": "realtime:jobs",
            "event": "phx_join",
            "payload": {},
            "ref": "1",
            "join_ref": "1"
        }))
        .unwrap();
        let reply = join.reply(REPLY_OK, json!({}));
        assert_eq!(reply.event, EVENT_REPLY);
        assert_eq!(reply.msg_ref.as_deref(), Some("1"));
        assert_eq!(reply.join_ref.as_deref(), Some("1"));
        assert_eq!(reply.reply_status(), Some("ok"));
    }

    #[test]
    fn join_payload_defaults() {
        let payload: JoinPayload = serde_json::from_value(json!({
            "config": {"postgres_changes": [
                {"event": "UPDATE", "table": "jobs", "filter": "user_id=eq.abc"}
            ]},
            "access_token": "t"
        }))
        .unwrap();
        let sub = &payload.config.postgres_changes[0];
        assert_eq!(sub.schema, "public");
        assert_eq!(sub.filter.as_deref(), Some("user_id=eq.abc"));
        assert_eq!(payload.access_token.as_deref(), Some("t"));
    }

    #[test]
    fn change_payload_parses() {
        let payload: ChangePayload = serde_json::from_value(json!({
            "data": {
                "schema": "public",
                "table": "jobs",
                "type": "UPDATE",
                "record": {"id": "j1", "status": "completed"},
                "old_record": {"id": "j1", "status": "processing"},
                "commit_timestamp": "2026-01-01T00:00:00Z"
            },
            "ids": [3]
        }))
        .unwrap();
        assert_eq!(payload.data.kind, ChangeKind::Update);
        assert_eq!(payload.ids, vec![3]);
    }
}
