//! Job queue client for the Upstash Redis REST API.
//!
//! Commands are sent as a JSON array (`["LPUSH", key, value]`) in the body
//! of a `POST` to the REST endpoint with a bearer token. Upstash answers
//! `{"result": ...}` on success and `{"error": "..."}` on failure.

use async_trait::async_trait;
use serde::Deserialize;

use crate::http::ensure_success;

/// Errors from the job queue layer.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("Redis request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The REST endpoint returned a non-2xx status code.
    #[error("Redis REST error ({status}): {body}")]
    Api { status: u16, body: String },

    /// Redis rejected the command.
    #[error("Redis command failed: {0}")]
    Command(String),

    /// The reply did not have the expected shape.
    #[error("Unexpected Redis reply: {0}")]
    Reply(String),
}

/// A Redis list used as a job queue.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Push `value` onto the head of `list`; returns the new list length.
    async fn lpush(&self, list: &str, value: &str) -> Result<i64, QueueError>;

    /// Current length of `list` (0 when it does not exist).
    async fn llen(&self, list: &str) -> Result<i64, QueueError>;
}

#[derive(Debug, Deserialize)]
struct RestReply {
    result: Option<serde_json::Value>,
    error: Option<String>,
}

/// [`JobQueue`] over the Upstash REST API.
pub struct RedisRestQueue {
    client: reqwest::Client,
    url: String,
    token: String,
}

impl RedisRestQueue {
    pub fn new(client: reqwest::Client, url: String, token: String) -> Self {
        Self { client, url, token }
    }

    async fn command(&self, args: &[&str]) -> Result<serde_json::Value, QueueError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&args)
            .send()
            .await?;

        let response = ensure_success(response)
            .await
            .map_err(|(status, body)| QueueError::Api { status, body })?;
        let reply: RestReply = response.json().await?;

        if let Some(error) = reply.error {
            return Err(QueueError::Command(error));
        }
        reply
            .result
            .ok_or_else(|| QueueError::Reply("missing result".into()))
    }

    async fn integer_command(&self, args: &[&str]) -> Result<i64, QueueError> {
        let result = self.command(args).await?;
        result
            .as_i64()
            .ok_or_else(|| QueueError::Reply(format!("expected integer, got {result}")))
    }
}

#[async_trait]
impl JobQueue for RedisRestQueue {
    async fn lpush(&self, list: &str, value: &str) -> Result<i64, QueueError> {
        self.integer_command(&["LPUSH", list, value]).await
    }

    async fn llen(&self, list: &str) -> Result<i64, QueueError> {
        self.integer_command(&["LLEN", list]).await
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[tokio::test]
    async fn rest_queue_reports_connection_failure() {
        // Port 9 (discard) is not listening on loopback.
        let queue = RedisRestQueue::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9".into(),
            "token".into(),
        );
        assert_matches!(queue.llen("job_queue").await, Err(QueueError::Request(_)));
    }

    #[test]
    fn reply_shapes() {
        let ok: RestReply = serde_json::from_str(r#"{"result": 3}"#).unwrap();
        assert_eq!(ok.result, Some(serde_json::json!(3)));
        let err: RestReply = serde_json::from_str(r#"{"error": "WRONGTYPE"}"#).unwrap();
        assert_eq!(err.error.as_deref(), Some("WRONGTYPE"));
    }
}
