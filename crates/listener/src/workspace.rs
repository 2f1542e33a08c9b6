//! Client-held workspace state and the reconciler that feeds it.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use genflow_core::types::DbId;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::client::JobsClient;
use crate::error::ListenerError;
use crate::fetcher::LatestFetcher;
use crate::signals::CompletionSignal;

/// Asset ids currently shown in the workspace.
///
/// Set semantics: delivering the same asset twice changes nothing.
#[derive(Debug, Default)]
pub struct WorkspaceState {
    assets: Mutex<BTreeSet<DbId>>,
}

impl WorkspaceState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge the signal's assets. Returns the ids that were not already
    /// present.
    pub fn apply(&self, signal: &CompletionSignal) -> Vec<DbId> {
        let mut assets = self.assets.lock().unwrap_or_else(|p| p.into_inner());
        signal
            .asset_ids()
            .into_iter()
            .filter(|id| assets.insert(*id))
            .collect()
    }

    pub fn contains(&self, asset_id: DbId) -> bool {
        self.assets
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .contains(&asset_id)
    }

    pub fn len(&self) -> usize {
        self.assets.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop an asset after it was saved to the library or discarded.
    pub fn remove(&self, asset_id: DbId) -> bool {
        self.assets
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(&asset_id)
    }
}

/// User-facing notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub title: String,
    pub description: String,
}

/// Shows toasts to the user.
pub trait Notifier: Send + Sync {
    fn toast(&self, toast: Toast);
}

/// Notifier for the headless daemon: toasts become log lines.
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn toast(&self, toast: Toast) {
        tracing::info!(title = %toast.title, description = %toast.description, "Toast");
    }
}

/// Applies completion signals to the workspace and notifies the user.
///
/// Detail lookups for toasts run as separate tasks through one
/// [`LatestFetcher`], so a newer completion cancels an older lookup still
/// in flight and that toast falls back to the plain asset count.
pub struct Reconciler {
    state: Arc<WorkspaceState>,
    notifier: Arc<dyn Notifier>,
    jobs: Option<JobsClient>,
    details: Arc<LatestFetcher>,
}

impl Reconciler {
    pub fn new(state: Arc<WorkspaceState>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            state,
            notifier,
            jobs: None,
            details: Arc::new(LatestFetcher::new()),
        }
    }

    /// Look up job details for richer toasts.
    pub fn with_jobs_client(mut self, jobs: JobsClient) -> Self {
        self.jobs = Some(jobs);
        self
    }

    /// Apply one signal. Duplicate deliveries are silent.
    ///
    /// Without a jobs client the toast is shown immediately. Otherwise the
    /// returned task shows it once the detail lookup resolves.
    pub fn handle(&self, signal: &CompletionSignal) -> Option<JoinHandle<()>> {
        let added = self.state.apply(signal);
        if added.is_empty() {
            tracing::debug!(job_id = %signal.job_id(), "Signal already reconciled");
            return None;
        }

        tracing::info!(
            job_id = %signal.job_id(),
            signal = signal.name(),
            added = added.len(),
            total = self.state.len(),
            "Workspace updated",
        );

        let count = added.len();
        let Some(jobs) = self.jobs.clone() else {
            self.notifier.toast(completion_toast(default_description(count)));
            return None;
        };

        let notifier = Arc::clone(&self.notifier);
        let details = Arc::clone(&self.details);
        let job_id = signal.job_id();
        Some(tokio::spawn(async move {
            let description = describe(&details, &jobs, job_id)
                .await
                .unwrap_or_else(|| default_description(count));
            notifier.toast(completion_toast(description));
        }))
    }

    /// Consume signals until the bus closes or `cancel` fires.
    pub async fn run(
        self,
        mut receiver: broadcast::Receiver<CompletionSignal>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                received = receiver.recv() => match received {
                    Ok(signal) => {
                        self.handle(&signal);
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "Reconciler lagged, some signals were dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
        tracing::info!("Reconciler stopped");
    }
}

async fn describe(details: &LatestFetcher, jobs: &JobsClient, job_id: DbId) -> Option<String> {
    match details.fetch(jobs.job_detail(job_id)).await {
        Ok(detail) => {
            let kind = detail
                .assets
                .first()
                .map(|a| a.asset_type.as_str())
                .unwrap_or(detail.job.format.as_str());
            Some(format!("{} new {kind}(s) in your workspace", detail.assets.len()))
        }
        Err(ListenerError::Superseded) => {
            tracing::debug!(%job_id, "Job detail lookup superseded");
            None
        }
        Err(e) => {
            tracing::warn!(%job_id, error = %e, "Job detail lookup failed");
            None
        }
    }
}

fn completion_toast(description: String) -> Toast {
    Toast {
        title: "Generation complete".into(),
        description,
    }
}

fn default_description(count: usize) -> String {
    if count == 1 {
        "1 new asset in your workspace".to_string()
    } else {
        format!("{count} new assets in your workspace")
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[derive(Default)]
    struct RecordingNotifier {
        toasts: Mutex<Vec<Toast>>,
    }

    impl Notifier for RecordingNotifier {
        fn toast(&self, toast: Toast) {
            self.toasts.lock().unwrap().push(toast);
        }
    }

    fn batch(ids: Vec<DbId>) -> CompletionSignal {
        CompletionSignal::GenerationBatchCompleted {
            asset_ids: ids,
            job_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn duplicate_delivery_is_a_no_op() {
        let state = WorkspaceState::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        assert_eq!(state.apply(&batch(vec![a, b])).len(), 2);
        assert!(state.apply(&batch(vec![a, b])).is_empty());
        assert_eq!(state.apply(&batch(vec![b])).len(), 0);
        assert_eq!(state.len(), 2);
        assert!(state.contains(a));

        assert!(state.remove(a));
        assert_eq!(state.apply(&batch(vec![a])), vec![a]);
    }

    #[tokio::test]
    async fn reconciler_toasts_once_per_new_assets() {
        let state = Arc::new(WorkspaceState::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let reconciler = Reconciler::new(Arc::clone(&state), notifier.clone());
        let signal = CompletionSignal::GenerationCompleted {
            asset_id: Uuid::new_v4(),
            job_id: Uuid::new_v4(),
            asset_type: "image".into(),
        };

        assert!(reconciler.handle(&signal).is_none());
        assert!(reconciler.handle(&signal).is_none());

        let toasts = notifier.toasts.lock().unwrap();
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].description, "1 new asset in your workspace");
        assert_eq!(state.len(), 1);
    }

    #[tokio::test]
    async fn run_stops_on_cancel() {
        let reconciler = Reconciler::new(Arc::new(WorkspaceState::new()), Arc::new(TracingNotifier));
        let (_tx, rx) = broadcast::channel(4);
        let cancel = CancellationToken::new();
        cancel.cancel();
        reconciler.run(rx, cancel).await;
    }
}
