//! Handler for `GET /functions/v1/queue-status`.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use genflow_upstream::JobQueue;
use serde::Serialize;

use crate::error::AppResult;
use crate::response::SuccessResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct QueueStatus {
    /// List name to current length.
    pub queues: BTreeMap<String, i64>,
}

/// GET /functions/v1/queue-status
///
/// `LLEN` of every monitored list.
pub async fn queue_status(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let mut queues = BTreeMap::new();
    for name in &state.config.status_queues {
        let len = state.queue.llen(name).await?;
        queues.insert(name.clone(), len);
    }

    tracing::debug!(?queues, "Queue status");
    Ok(Json(SuccessResponse::new(QueueStatus { queues })))
}
