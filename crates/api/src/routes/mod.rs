pub mod functions;
pub mod health;
pub mod realtime;

use axum::Router;

use crate::state::AppState;

/// Build the versioned route tree.
///
/// Route hierarchy:
///
/// ```text
/// /functions/v1/queue-job                 enqueue a generation job (POST)
/// /functions/v1/replicate-callback        provider completion webhook (POST)
/// /functions/v1/get-active-worker-url     worker lookup + health probe (POST)
/// /functions/v1/queue-status              Redis list lengths (GET)
/// /functions/v1/jobs/{id}                 job detail with assets (GET)
///
/// /realtime/v1/websocket                  realtime change feed (WebSocket)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/functions/v1", functions::router())
        .nest("/realtime/v1", realtime::router())
}
