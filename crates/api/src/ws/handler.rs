use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use genflow_core::change_filter::ChangeFilter;
use genflow_core::job_events::JOBS_TABLE;
use genflow_core::realtime::{
    ChangeSubscription, Frame, JoinPayload, EVENT_ACCESS_TOKEN, EVENT_CLOSE, EVENT_ERROR,
    EVENT_HEARTBEAT, EVENT_JOIN, EVENT_LEAVE, PHOENIX_TOPIC, REPLY_ERROR, REPLY_OK, TOPIC_PREFIX,
};
use genflow_core::types::DbId;
use serde_json::json;

use crate::middleware::auth::verify;
use crate::state::AppState;

/// HTTP handler that upgrades the connection to the realtime WebSocket.
///
/// After the upgrade the connection is registered with `WsManager` and
/// managed by a sender task plus the inbound loop below.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Manage a single WebSocket connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Registers the connection with `WsManager`.
///   2. Spawns a sender task that forwards messages from the manager channel.
///   3. Answers channel frames (join, leave, heartbeat) on the current task.
///   4. Cleans up on disconnect.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, "Realtime socket connected");

    let mut rx = state.ws_manager.add(conn_id.clone()).await;

    let (mut sink, mut stream) = socket.split();

    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<Frame>(text.as_str()) {
                Ok(frame) => {
                    for reply in handle_frame(&state, &conn_id, frame).await {
                        state.ws_manager.send_frame(&conn_id, &reply).await;
                    }
                }
                Err(e) => {
                    tracing::debug!(conn_id = %conn_id, error = %e, "Ignoring malformed frame");
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    state.ws_manager.remove(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, "Realtime socket disconnected");
}

/// Answer one inbound frame. Returns the frames to send back.
async fn handle_frame(state: &AppState, conn_id: &str, frame: Frame) -> Vec<Frame> {
    match frame.event.as_str() {
        EVENT_HEARTBEAT if frame.topic == PHOENIX_TOPIC => {
            vec![frame.reply(REPLY_OK, json!({}))]
        }
        EVENT_JOIN => match join(state, conn_id, &frame).await {
            Ok(accepted) => {
                tracing::info!(
                    conn_id,
                    topic = %frame.topic,
                    subscriptions = accepted.len(),
                    "Channel joined",
                );
                vec![frame.reply(REPLY_OK, json!({ "postgres_changes": accepted }))]
            }
            Err(reason) => {
                tracing::warn!(conn_id, topic = %frame.topic, %reason, "Channel join rejected");
                vec![frame.reply(REPLY_ERROR, json!({ "reason": reason }))]
            }
        },
        EVENT_LEAVE => {
            state.ws_manager.leave(conn_id, &frame.topic).await;
            vec![
                frame.reply(REPLY_OK, json!({})),
                Frame::new(frame.topic.clone(), EVENT_CLOSE, json!({}))
                    .with_join_ref(frame.join_ref.clone()),
            ]
        }
        EVENT_ACCESS_TOKEN => refresh_token(state, conn_id, &frame).await,
        _ => vec![frame.reply(REPLY_ERROR, json!({ "reason": "unknown event" }))],
    }
}

/// Validate a join request and register its subscriptions.
///
/// Only `jobs` changes are published, and every subscription must be pinned
/// to the caller's own rows with `user_id=eq.<sub>`.
async fn join(state: &AppState, conn_id: &str, frame: &Frame) -> Result<Vec<ChangeSubscription>, String> {
    if !frame.topic.starts_with(TOPIC_PREFIX) {
        return Err(format!("topic must start with '{TOPIC_PREFIX}'"));
    }

    let payload: JoinPayload = serde_json::from_value(frame.payload.clone())
        .map_err(|e| format!("invalid join payload: {e}"))?;
    let token = payload
        .access_token
        .as_deref()
        .ok_or_else(|| "access_token is required".to_string())?;
    let user_id = verify(token, &state.config.jwt)
        .map_err(|_| "invalid or expired token".to_string())?
        .sub;

    let mut subscriptions = Vec::with_capacity(payload.config.postgres_changes.len());
    for sub in payload.config.postgres_changes {
        let filter = authorize_subscription(&sub, user_id)?;
        subscriptions.push((sub, Some(filter)));
    }

    state
        .ws_manager
        .join(conn_id, user_id, &frame.topic, frame.join_ref.clone(), subscriptions)
        .await
        .ok_or_else(|| "connection closed".to_string())
}

fn authorize_subscription(sub: &ChangeSubscription, user_id: DbId) -> Result<ChangeFilter, String> {
    if sub.table != JOBS_TABLE {
        return Err(format!("unsupported table '{}'", sub.table));
    }

    let own_rows = || format!("subscriptions must be filtered by user_id=eq.{user_id}");
    let raw = sub.filter.as_deref().ok_or_else(own_rows)?;
    let filter = ChangeFilter::parse(raw).map_err(|e| e.to_string())?;

    let user = user_id.to_string();
    if filter.column != "user_id" || filter.eq_value() != Some(user.as_str()) {
        return Err(own_rows());
    }
    Ok(filter)
}

/// Re-validate a refreshed token; a bad one or a different user closes the
/// channel.
async fn refresh_token(state: &AppState, conn_id: &str, frame: &Frame) -> Vec<Frame> {
    let token = frame.payload.get("access_token").and_then(|t| t.as_str());
    let refreshed = token.and_then(|t| verify(t, &state.config.jwt).ok());
    let current = state.ws_manager.user_of(conn_id).await;

    match (refreshed, current) {
        (Some(claims), Some(user)) if claims.sub == user => Vec::new(),
        _ => {
            tracing::warn!(conn_id, topic = %frame.topic, "Token refresh rejected, closing channel");
            state.ws_manager.leave(conn_id, &frame.topic).await;
            vec![Frame::new(frame.topic.clone(), EVENT_ERROR, json!({ "reason": "invalid token" }))
                .with_join_ref(frame.join_ref.clone())]
        }
    }
}
