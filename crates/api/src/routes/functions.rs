//! Route definitions for the `/functions/v1` surface.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{jobs, queue_job, queue_status, replicate_callback, workers};
use crate::state::AppState;

/// Routes mounted at `/functions/v1`.
///
/// ```text
/// POST   /queue-job               -> queue_job              (auth)
/// POST   /replicate-callback      -> replicate_callback     (provider webhook)
/// POST   /get-active-worker-url   -> get_active_worker_url  (auth)
/// GET    /queue-status            -> queue_status
/// GET    /jobs/{id}               -> get_job                (auth, owner only)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/queue-job", post(queue_job::queue_job))
        .route("/replicate-callback", post(replicate_callback::replicate_callback))
        .route("/get-active-worker-url", post(workers::get_active_worker_url))
        .route("/queue-status", get(queue_status::queue_status))
        .route("/jobs/{id}", get(jobs::get_job))
}
