//! Polling of watched jobs.
//!
//! Jobs seen in flight are kept on a [`WatchList`]; the poller looks each up
//! until it reaches a terminal state and publishes the same completion
//! signals the realtime channel would. It runs alongside realtime, so a
//! change dropped during a reconnect is still delivered.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use genflow_core::types::DbId;
use tokio_util::sync::CancellationToken;

use crate::client::JobsClient;
use crate::error::ListenerError;
use crate::messages::JobRow;
use crate::signals::{CompletionSignal, SignalBus};

/// Jobs that have not reached a terminal state yet.
#[derive(Debug, Default)]
pub struct WatchList {
    jobs: Mutex<BTreeSet<DbId>>,
}

impl WatchList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn watch(&self, job_id: DbId) -> bool {
        self.jobs.lock().unwrap_or_else(|p| p.into_inner()).insert(job_id)
    }

    pub fn unwatch(&self, job_id: DbId) -> bool {
        self.jobs.lock().unwrap_or_else(|p| p.into_inner()).remove(&job_id)
    }

    pub fn snapshot(&self) -> Vec<DbId> {
        self.jobs
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .copied()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.lock().unwrap_or_else(|p| p.into_inner()).is_empty()
    }

    /// Track or release a job according to its latest row, and publish a
    /// completion signal when it finished.
    pub fn observe(&self, job: &JobRow, bus: &SignalBus) {
        if !job.is_terminal() {
            if self.watch(job.id) {
                tracing::debug!(job_id = %job.id, status = %job.status, "Watching job");
            }
            return;
        }

        self.unwatch(job.id);
        match CompletionSignal::from_job(job) {
            Some(signal) => {
                bus.publish(signal);
            }
            None if job.is_completed() => {
                tracing::warn!(job_id = %job.id, "Completed job carries no workspace assets");
            }
            None => {
                tracing::warn!(
                    job_id = %job.id,
                    error = job.error_message.as_deref().unwrap_or("unknown"),
                    "Job failed",
                );
            }
        }
    }
}

pub struct Poller {
    jobs: JobsClient,
    watch: Arc<WatchList>,
    bus: Arc<SignalBus>,
    interval: Duration,
}

impl Poller {
    pub fn new(
        jobs: JobsClient,
        watch: Arc<WatchList>,
        bus: Arc<SignalBus>,
        interval: Duration,
    ) -> Self {
        Self {
            jobs,
            watch,
            bus,
            interval,
        }
    }

    /// Look up every watched job once.
    pub async fn poll_once(&self) {
        for job_id in self.watch.snapshot() {
            match self.jobs.job_detail(job_id).await {
                Ok(detail) => self.watch.observe(&detail.job, &self.bus),
                Err(ListenerError::Status { status: 403 | 404, .. }) => {
                    tracing::warn!(%job_id, "Watched job is gone, dropping it");
                    self.watch.unwatch(job_id);
                }
                Err(e) => {
                    tracing::warn!(%job_id, error = %e, "Job poll failed");
                }
            }
        }
    }

    /// Poll on a fixed interval until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Polling for job completion");
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if !self.watch.is_empty() {
                        self.poll_once().await;
                    }
                }
            }
        }
        tracing::info!("Poller stopped");
    }
}
