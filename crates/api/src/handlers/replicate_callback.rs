//! Handler for `POST /functions/v1/replicate-callback`.
//!
//! The generation provider calls this webhook as a prediction progresses.
//! Deliveries are at-least-once, so the handler is idempotent: a job that
//! is already terminal is acknowledged without side effects, and assets are
//! upserted on `(job_id, asset_index)`.

use std::time::Duration;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use genflow_core::error::CoreError;
use genflow_core::job_events::{ChangeKind, META_PROVIDER_STATUS, META_WORKSPACE_ASSET_IDS};
use genflow_core::queue::{metadata_seed, META_MODEL_VARIANT, META_PROMPT};
use genflow_core::storage::{
    asset_extension, default_extension, workspace_asset_path, BUCKET_WORKSPACE_TEMP,
};
use genflow_db::models::job::Job;
use genflow_db::models::workspace_asset::CreateWorkspaceAsset;
use genflow_db::{AssetStore, JobStore};
use genflow_upstream::{AssetFetcher, BlobStorage};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::job_changes::publish_job_change;
use crate::response::SuccessResponse;
use crate::state::AppState;

/// Error stored when a prediction succeeds without any output.
pub const NO_OUTPUT_ERROR: &str = "Provider returned no output";

/// Error stored when the provider cancels a prediction.
pub const CANCELED_ERROR: &str = "Prediction canceled";

/// Error stored when the provider reports failure without a message.
pub const FAILED_ERROR: &str = "Prediction failed";

const STATUS_SUCCEEDED: &str = "succeeded";
const STATUS_FAILED: &str = "failed";
const STATUS_CANCELED: &str = "canceled";
const STATUS_PROCESSING: &str = "processing";

/// Prediction webhook body.
#[derive(Debug, Deserialize)]
pub struct PredictionCallback {
    /// Provider prediction id, stored on the job as `external_id`.
    pub id: String,
    pub status: String,
    /// A URL string or an array of URL strings.
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
    /// Inputs the prediction ran with (may carry the seed).
    #[serde(default)]
    pub input: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct CallbackAck {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub duplicate: bool,
}

/// POST /functions/v1/replicate-callback
pub async fn replicate_callback(
    State(state): State<AppState>,
    Json(body): Json<PredictionCallback>,
) -> AppResult<impl IntoResponse> {
    let job = state
        .store
        .find_job_by_external_id(&body.id)
        .await?
        .ok_or_else(|| CoreError::not_found("Job", &body.id))?;

    if job.is_terminal() {
        tracing::info!(
            job_id = %job.id,
            prediction_id = %body.id,
            status = %job.status,
            "Duplicate callback for finished job ignored",
        );
        return Ok(Json(SuccessResponse::new(CallbackAck { duplicate: true })));
    }

    tracing::info!(
        job_id = %job.id,
        prediction_id = %body.id,
        provider_status = %body.status,
        "Prediction callback received",
    );

    let updated = match body.status.as_str() {
        STATUS_SUCCEEDED => complete_job(&state, &job, &body).await?,
        STATUS_FAILED => {
            let error = body.error.as_ref().and_then(error_text);
            fail_job(&state, &job, error.as_deref().unwrap_or(FAILED_ERROR), &body.status).await?
        }
        STATUS_CANCELED => fail_job(&state, &job, CANCELED_ERROR, &body.status).await?,
        other => record_progress(&state, &job, other).await?,
    };

    if let Some(updated) = updated {
        publish_job_change(&state.event_bus, ChangeKind::Update, Some(&updated), Some(&job));
    }

    Ok(Json(SuccessResponse::new(CallbackAck { duplicate: false })))
}

/// Move every output into workspace storage and complete the job.
async fn complete_job(
    state: &AppState,
    job: &Job,
    body: &PredictionCallback,
) -> AppResult<Option<Job>> {
    let urls = output_urls(body.output.as_ref());
    if urls.is_empty() {
        tracing::warn!(job_id = %job.id, "Prediction succeeded without output");
        return fail_job(state, job, NO_OUTPUT_ERROR, &body.status).await;
    }

    let expires_at =
        chrono::Utc::now() + chrono::Duration::hours(state.config.workspace_asset_ttl_hours);
    let seed = metadata_seed(&job.metadata)
        .or_else(|| body.input.as_ref().and_then(metadata_seed));
    let prompt = job
        .metadata
        .get(META_PROMPT)
        .and_then(Value::as_str)
        .map(str::to_string);
    let fallback_ext = default_extension(&job.format);

    let mut inputs = Vec::with_capacity(urls.len());
    for (index, url) in urls.iter().enumerate() {
        let asset = state.fetcher.fetch(url).await?;
        let ext = asset_extension(asset.content_type.as_deref(), url, fallback_ext);
        let path = workspace_asset_path(job.user_id, job.id, index, &ext);
        let content_type = asset
            .content_type
            .clone()
            .unwrap_or_else(|| "application/octet-stream".into());
        let size = asset.bytes.len();

        state
            .storage
            .upload(BUCKET_WORKSPACE_TEMP, &path, asset.bytes, &content_type)
            .await?;
        tracing::debug!(job_id = %job.id, index, %path, size, "Uploaded workspace asset");

        inputs.push(CreateWorkspaceAsset {
            user_id: job.user_id,
            asset_type: job.format.clone(),
            temp_storage_path: path,
            job_id: job.id,
            asset_index: index as i32,
            generation_seed: seed,
            original_prompt: prompt.clone(),
            generation_settings: json!({
                "job_type": job.job_type,
                "quality": job.quality,
                META_MODEL_VARIANT: job.metadata.get(META_MODEL_VARIANT),
                "source_url": url,
            }),
            expires_at,
        });
    }

    let assets = state.store.upsert_workspace_assets(&inputs).await?;

    let result_url = match assets.first() {
        Some(first) => Some(
            state
                .storage
                .signed_url(
                    BUCKET_WORKSPACE_TEMP,
                    &first.temp_storage_path,
                    Duration::from_secs(state.config.signed_url_ttl_secs),
                )
                .await?,
        ),
        None => None,
    };

    let asset_ids: Vec<_> = assets.iter().map(|a| a.id).collect();
    let patch = json!({
        META_WORKSPACE_ASSET_IDS: asset_ids,
        "asset_count": assets.len(),
        META_PROVIDER_STATUS: body.status,
    });

    let completed = state
        .store
        .complete_job(job.id, result_url.as_deref(), &patch)
        .await?;

    match &completed {
        Some(_) => tracing::info!(job_id = %job.id, asset_count = assets.len(), "Job completed"),
        None => tracing::info!(job_id = %job.id, "Job finished concurrently, completion skipped"),
    }
    Ok(completed)
}

async fn fail_job(
    state: &AppState,
    job: &Job,
    error: &str,
    provider_status: &str,
) -> AppResult<Option<Job>> {
    let failed = state
        .store
        .fail_job(job.id, error, &json!({ META_PROVIDER_STATUS: provider_status }))
        .await?;
    if failed.is_some() {
        tracing::warn!(job_id = %job.id, error, "Job failed");
    }
    Ok(failed)
}

/// Non-terminal provider status: record it, and start processing on the
/// first `processing` report.
async fn record_progress(state: &AppState, job: &Job, status: &str) -> AppResult<Option<Job>> {
    let patch = json!({ META_PROVIDER_STATUS: status });

    if status == STATUS_PROCESSING {
        if let Some(processing) = state.store.mark_job_processing(job.id, &patch).await? {
            tracing::info!(job_id = %job.id, "Job processing");
            return Ok(Some(processing));
        }
    }

    Ok(state.store.merge_job_metadata(job.id, &patch).await?)
}

/// Output URLs in provider order. Non-string entries are skipped.
fn output_urls(output: Option<&Value>) -> Vec<String> {
    match output {
        Some(Value::String(url)) if !url.trim().is_empty() => vec![url.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .filter(|url| !url.trim().is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn error_text(error: &Value) -> Option<String> {
    match error {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
