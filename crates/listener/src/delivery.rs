//! Runs both completion delivery paths side by side.
//!
//! The realtime subscription and the poller share one [`WatchList`] and one
//! [`SignalBus`]. A change missed while the socket reconnects is picked up
//! by the next poll; a completion seen by both paths lands in the workspace
//! set once.
//!
//! [`WatchList`]: crate::poller::WatchList
//! [`SignalBus`]: crate::signals::SignalBus

use tokio_util::sync::CancellationToken;

use crate::channel::{RealtimeListener, RealtimeOutcome};
use crate::poller::Poller;

/// Run realtime and polling until `cancel` fires.
///
/// Realtime giving up does not stop delivery: polling carries on alone.
pub async fn run(realtime: RealtimeListener, poller: Poller, cancel: CancellationToken) {
    let polling = tokio::spawn(poller.run(cancel.clone()));

    if realtime.run(cancel.clone()).await == RealtimeOutcome::GaveUp {
        tracing::warn!("Realtime unavailable, continuing with polling only");
    }

    if let Err(e) = polling.await {
        tracing::error!(error = %e, "Poller task failed");
    }
}
