use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Routes mounted at `/realtime/v1`.
pub fn router() -> Router<AppState> {
    Router::new().route("/websocket", get(ws::ws_handler))
}
