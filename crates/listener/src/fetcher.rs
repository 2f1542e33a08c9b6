//! Latest-request-wins fetching.
//!
//! Starting a fetch cancels the one still in flight, so a burst of lookups
//! only resolves the newest.

use std::future::Future;
use std::sync::Mutex;

use tokio_util::sync::CancellationToken;

use crate::error::ListenerError;

#[derive(Default)]
pub struct LatestFetcher {
    current: Mutex<Option<CancellationToken>>,
}

impl LatestFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `fetch`, cancelling any earlier call still running.
    ///
    /// Returns [`ListenerError::Superseded`] if a newer call starts first.
    pub async fn fetch<T, F>(&self, fetch: F) -> Result<T, ListenerError>
    where
        F: Future<Output = Result<T, ListenerError>>,
    {
        let token = CancellationToken::new();
        {
            let mut current = self.current.lock().unwrap_or_else(|p| p.into_inner());
            if let Some(previous) = current.replace(token.clone()) {
                previous.cancel();
            }
        }

        tokio::select! {
            () = token.cancelled() => Err(ListenerError::Superseded),
            result = fetch => result,
        }
    }
}
