//! Queue payload contract and enqueue-time helpers.
//!
//! The payload is the JSON document pushed onto the Redis job list and
//! consumed by the external generation worker. Field names are camelCase
//! because the worker is not part of this workspace and reads them as-is.

use serde::{Deserialize, Serialize};

use crate::job_type::{JobFormat, JobQuality, ModelVariant};
use crate::types::{DbId, Timestamp};

/// Default Redis list that generation jobs are pushed onto.
pub const DEFAULT_JOB_QUEUE: &str = "job_queue";

/// Lists reported by the queue status endpoint when none are configured.
pub const DEFAULT_STATUS_QUEUES: [&str; 3] = ["job_queue", "sdxl_queue", "wan_queue"];

/// Credits charged when the request metadata does not specify any.
pub const DEFAULT_CREDITS: f64 = 1.0;

/// Metadata key carrying the caller-supplied prompt.
pub const META_PROMPT: &str = "prompt";

/// Metadata key carrying the caller-supplied credit cost.
pub const META_CREDITS: &str = "credits";

/// Metadata key carrying the resolved model variant.
pub const META_MODEL_VARIANT: &str = "model_variant";

/// Metadata key carrying a caller-supplied generation seed.
pub const META_SEED: &str = "seed";

/// Document pushed onto the job list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueuePayload {
    pub id: DbId,
    #[serde(rename = "type")]
    pub job_type: String,
    pub format: JobFormat,
    pub quality: JobQuality,
    pub model_variant: ModelVariant,
    pub prompt: String,
    pub user_id: DbId,
    pub project_id: Option<DbId>,
    pub video_id: Option<DbId>,
    pub image_id: Option<DbId>,
    pub metadata: serde_json::Value,
    pub created_at: Timestamp,
}

/// Extract a non-blank prompt from request metadata.
pub fn metadata_prompt(metadata: &serde_json::Value) -> Option<String> {
    metadata
        .get(META_PROMPT)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Credits to charge for a job: `metadata.credits` when it is a
/// non-negative number, otherwise [`DEFAULT_CREDITS`].
pub fn credits_for(metadata: &serde_json::Value) -> f64 {
    metadata
        .get(META_CREDITS)
        .and_then(|v| v.as_f64())
        .filter(|c| c.is_finite() && *c >= 0.0)
        .unwrap_or(DEFAULT_CREDITS)
}

/// Seed recorded in request metadata, if any.
pub fn metadata_seed(metadata: &serde_json::Value) -> Option<i64> {
    metadata.get(META_SEED).and_then(|v| v.as_i64())
}

/// Shallow-merge `patch` into `base`. Non-object values are replaced.
pub fn merge_json(base: &mut serde_json::Value, patch: &serde_json::Value) {
    match (base.as_object_mut(), patch.as_object()) {
        (Some(base_map), Some(patch_map)) => {
            for (k, v) in patch_map {
                base_map.insert(k.clone(), v.clone());
            }
        }
        _ => *base = patch.clone(),
    }
}
