//! In-process completion signals.
//!
//! Anything in the client can publish on the [`SignalBus`]; the realtime
//! channel and the poller publish when a watched job completes.

use genflow_core::job_events::{SIGNAL_GENERATION_BATCH_COMPLETED, SIGNAL_GENERATION_COMPLETED};
use genflow_core::types::DbId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::messages::JobRow;

/// Default buffer size for the signal channel.
const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail")]
pub enum CompletionSignal {
    #[serde(rename = "generation-completed", rename_all = "camelCase")]
    GenerationCompleted {
        asset_id: DbId,
        job_id: DbId,
        asset_type: String,
    },
    #[serde(rename = "generation-batch-completed", rename_all = "camelCase")]
    GenerationBatchCompleted { asset_ids: Vec<DbId>, job_id: DbId },
}

impl CompletionSignal {
    /// The signal a completed job produces: one asset is a single
    /// completion, several are a batch. `None` for anything else.
    pub fn from_job(job: &JobRow) -> Option<Self> {
        if !job.is_completed() {
            return None;
        }
        let mut ids = job.workspace_asset_ids();
        match ids.len() {
            0 => None,
            1 => Some(Self::GenerationCompleted {
                asset_id: ids.remove(0),
                job_id: job.id,
                asset_type: job.format.clone(),
            }),
            _ => Some(Self::GenerationBatchCompleted {
                asset_ids: ids,
                job_id: job.id,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::GenerationCompleted { .. } => SIGNAL_GENERATION_COMPLETED,
            Self::GenerationBatchCompleted { .. } => SIGNAL_GENERATION_BATCH_COMPLETED,
        }
    }

    pub fn job_id(&self) -> DbId {
        match self {
            Self::GenerationCompleted { job_id, .. } | Self::GenerationBatchCompleted { job_id, .. } => {
                *job_id
            }
        }
    }

    pub fn asset_ids(&self) -> Vec<DbId> {
        match self {
            Self::GenerationCompleted { asset_id, .. } => vec![*asset_id],
            Self::GenerationBatchCompleted { asset_ids, .. } => asset_ids.clone(),
        }
    }
}

/// Broadcast hub for [`CompletionSignal`]s.
pub struct SignalBus {
    sender: broadcast::Sender<CompletionSignal>,
}

impl SignalBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a signal. Returns the number of receivers that got it.
    pub fn publish(&self, signal: CompletionSignal) -> usize {
        tracing::debug!(signal = signal.name(), job_id = %signal.job_id(), "Publishing completion signal");
        self.sender.send(signal).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CompletionSignal> {
        self.sender.subscribe()
    }
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use uuid::Uuid;

    use super::*;

    fn completed(ids: &[DbId]) -> JobRow {
        JobRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            format: "video".into(),
            status: "completed".into(),
            metadata: json!({ "workspace_asset_ids": ids }),
            error_message: None,
        }
    }

    #[test]
    fn single_asset_is_generation_completed() {
        let asset = Uuid::new_v4();
        let job = completed(&[asset]);
        let signal = CompletionSignal::from_job(&job).unwrap();
        assert_eq!(
            signal,
            CompletionSignal::GenerationCompleted {
                asset_id: asset,
                job_id: job.id,
                asset_type: "video".into(),
            }
        );
        assert_eq!(signal.name(), "generation-completed");
    }

    #[test]
    fn several_assets_are_a_batch() {
        let ids = [Uuid::new_v4(), Uuid::new_v4()];
        let signal = CompletionSignal::from_job(&completed(&ids)).unwrap();
        assert_eq!(signal.name(), "generation-batch-completed");
        assert_eq!(signal.asset_ids(), ids.to_vec());
    }

    #[test]
    fn unfinished_or_empty_jobs_emit_nothing() {
        assert!(CompletionSignal::from_job(&completed(&[])).is_none());
        let mut job = completed(&[Uuid::new_v4()]);
        job.status = "processing".into();
        assert!(CompletionSignal::from_job(&job).is_none());
    }

    #[test]
    fn wire_shape_uses_event_names_and_camel_case() {
        let asset = Uuid::new_v4();
        let job = Uuid::new_v4();
        let value = serde_json::to_value(CompletionSignal::GenerationCompleted {
            asset_id: asset,
            job_id: job,
            asset_type: "image".into(),
        })
        .unwrap();
        assert_eq!(value["type"], "generation-completed");
        assert_eq!(value["detail"]["assetId"], asset.to_string());
        assert_eq!(value["detail"]["assetType"], "image");
    }

    #[tokio::test]
    async fn bus_delivers_to_subscribers() {
        let bus = SignalBus::default();
        let mut rx = bus.subscribe();
        let signal = CompletionSignal::GenerationBatchCompleted {
            asset_ids: vec![Uuid::new_v4()],
            job_id: Uuid::new_v4(),
        };
        assert_eq!(bus.publish(signal.clone()), 1);
        assert_eq!(rx.recv().await.unwrap(), signal);
    }
}
