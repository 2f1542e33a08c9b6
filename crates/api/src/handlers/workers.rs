//! Handler for `POST /functions/v1/get-active-worker-url`.
//!
//! Looks up the current URL for a worker type and probes its `/health`
//! endpoint. The probe result is informational; a dead worker still yields
//! its URL.

use std::time::Duration;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use genflow_core::error::CoreError;
use genflow_db::WorkerStore;
use genflow_upstream::probe_worker;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::SuccessResponse;
use crate::state::AppState;

/// Worker type served by `CHAT_WORKER_URL` when no registration exists.
pub const WORKER_TYPE_CHAT: &str = "chat";

#[derive(Debug, Deserialize)]
pub struct WorkerUrlRequest {
    pub worker_type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerUrlResponse {
    #[serde(rename = "worker_url")]
    pub worker_url: String,
    pub worker_type: String,
    pub is_healthy: bool,
    pub health_error: Option<String>,
}

/// POST /functions/v1/get-active-worker-url
pub async fn get_active_worker_url(
    _auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<WorkerUrlRequest>,
) -> AppResult<impl IntoResponse> {
    let worker_type = input.worker_type.trim().to_string();
    if worker_type.is_empty() {
        return Err(CoreError::Validation("worker_type is required".into()).into());
    }

    let registered = state.store.active_worker_url(&worker_type).await?;
    let worker_url = registered
        .or_else(|| {
            (worker_type == WORKER_TYPE_CHAT)
                .then(|| state.config.chat_worker_url.clone())
                .flatten()
        })
        .ok_or_else(|| CoreError::not_found("Worker", &worker_type))?;

    let health = probe_worker(
        &state.http,
        &worker_url,
        state.config.worker_health_token.as_deref(),
        Duration::from_secs(state.config.worker_health_timeout_secs),
    )
    .await;

    tracing::info!(
        %worker_type,
        %worker_url,
        is_healthy = health.is_healthy,
        "Resolved active worker",
    );

    Ok(Json(SuccessResponse::new(WorkerUrlResponse {
        worker_url,
        worker_type,
        is_healthy: health.is_healthy,
        health_error: health.health_error,
    })))
}
