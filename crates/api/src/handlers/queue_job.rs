//! Handler for `POST /functions/v1/queue-job`.
//!
//! Persists a job, pushes its payload onto the Redis job list and records
//! usage. The insert and the push are not atomic: when the push fails the
//! job row is removed again so no `queued` job is left that no worker will
//! ever pick up.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use genflow_core::error::CoreError;
use genflow_core::job_events::ChangeKind;
use genflow_core::job_type::{JobType, ModelVariant};
use genflow_core::queue::{
    credits_for, metadata_prompt, QueuePayload, META_MODEL_VARIANT, META_PROMPT,
};
use genflow_core::types::DbId;
use genflow_db::models::job::{CreateJob, Job};
use genflow_db::models::usage_log::CreateUsageLog;
use genflow_db::{JobStore, ProjectStore, UsageStore};
use genflow_upstream::JobQueue;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AppError, AppResult};
use crate::job_changes::publish_job_change;
use crate::middleware::auth::AuthUser;
use crate::response::SuccessResponse;
use crate::state::AppState;

/// Usage action recorded for every enqueued job.
pub const USAGE_ACTION_GENERATION: &str = "generation";

/// Error stored on a job whose queue push failed and could not be undone.
pub const QUEUE_PUSH_FAILED: &str = "queue push failed";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueJobRequest {
    pub job_type: String,
    #[serde(default)]
    pub metadata: Option<Value>,
    pub project_id: Option<DbId>,
    pub video_id: Option<DbId>,
    pub image_id: Option<DbId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueJobResponse {
    pub job: Job,
    pub queue_length: i64,
    pub model_variant: ModelVariant,
    pub job_type: String,
}

/// POST /functions/v1/queue-job
pub async fn queue_job(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<QueueJobRequest>,
) -> AppResult<impl IntoResponse> {
    let job_type = JobType::parse(&input.job_type)?;

    let mut metadata = match input.metadata {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map,
        Some(_) => return Err(AppError::BadRequest("metadata must be an object".into())),
    };

    let prompt = resolve_prompt(&state, auth.user_id, input.project_id, &metadata).await?;
    metadata.insert(META_PROMPT.into(), Value::String(prompt.clone()));
    metadata.insert(
        META_MODEL_VARIANT.into(),
        Value::String(job_type.model_variant.as_str().into()),
    );

    let job = state
        .store
        .create_job(&CreateJob {
            user_id: auth.user_id,
            job_type: job_type.canonical(),
            format: job_type.format.as_str().into(),
            quality: job_type.quality.as_str().into(),
            metadata: Value::Object(metadata),
            project_id: input.project_id,
            video_id: input.video_id,
            image_id: input.image_id,
        })
        .await?;
    publish_job_change(&state.event_bus, ChangeKind::Insert, Some(&job), None);

    let queue_length = match push_job(&state, &job, &job_type, prompt).await {
        Ok(len) => len,
        Err(e) => {
            tracing::error!(job_id = %job.id, error = %e, "Queue push failed");
            compensate(&state, &job).await;
            return Err(e);
        }
    };

    tracing::info!(
        job_id = %job.id,
        job_type = %job.job_type,
        user_id = %auth.user_id,
        queue_length,
        "Job queued",
    );

    record_usage(&state, &job).await;

    Ok(Json(SuccessResponse::new(QueueJobResponse {
        job_type: job.job_type.clone(),
        model_variant: job_type.model_variant,
        queue_length,
        job,
    })))
}

/// The prompt to generate from.
///
/// A project owned by the caller wins over `metadata.prompt`; a project that
/// is missing (or has no prompt) falls back to the metadata.
async fn resolve_prompt(
    state: &AppState,
    user_id: DbId,
    project_id: Option<DbId>,
    metadata: &Map<String, Value>,
) -> AppResult<String> {
    if let Some(project_id) = project_id {
        if let Some(prompt) = state.store.project_prompt(project_id, user_id).await? {
            return Ok(prompt);
        }
        tracing::debug!(%project_id, "Project prompt unavailable, using request metadata");
    }

    metadata_prompt(&Value::Object(metadata.clone()))
        .ok_or_else(|| CoreError::Validation("A non-empty prompt is required".into()).into())
}

async fn push_job(
    state: &AppState,
    job: &Job,
    job_type: &JobType,
    prompt: String,
) -> AppResult<i64> {
    let payload = QueuePayload {
        id: job.id,
        job_type: job.job_type.clone(),
        format: job_type.format,
        quality: job_type.quality,
        model_variant: job_type.model_variant,
        prompt,
        user_id: job.user_id,
        project_id: job.project_id,
        video_id: job.video_id,
        image_id: job.image_id,
        metadata: job.metadata.clone(),
        created_at: job.created_at,
    };
    let body = serde_json::to_string(&payload)
        .map_err(|e| AppError::InternalError(format!("Failed to encode queue payload: {e}")))?;

    Ok(state.queue.lpush(&state.config.job_queue, &body).await?)
}

/// Undo the insert after a failed push.
///
/// If the row cannot be deleted it is failed instead, so it never stays
/// `queued`.
async fn compensate(state: &AppState, job: &Job) {
    match state.store.delete_job(job.id).await {
        Ok(_) => {
            tracing::info!(job_id = %job.id, "Removed job after failed queue push");
            publish_job_change(&state.event_bus, ChangeKind::Delete, None, Some(job));
        }
        Err(delete_err) => {
            tracing::error!(job_id = %job.id, error = %delete_err, "Failed to remove unqueued job");
            match state
                .store
                .fail_job(job.id, QUEUE_PUSH_FAILED, &Value::Object(Map::new()))
                .await
            {
                Ok(Some(failed)) => {
                    publish_job_change(
                        &state.event_bus,
                        ChangeKind::Update,
                        Some(&failed),
                        Some(job),
                    );
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(job_id = %job.id, error = %e, "Unqueued job left in queued state");
                }
            }
        }
    }
}

/// Usage is best effort: the job is already dispatched.
async fn record_usage(state: &AppState, job: &Job) {
    let usage = CreateUsageLog {
        user_id: job.user_id,
        job_id: Some(job.id),
        action: USAGE_ACTION_GENERATION.into(),
        format: job.format.clone(),
        quality: job.quality.clone(),
        credits_consumed: credits_for(&job.metadata),
        metadata: serde_json::json!({ "job_type": job.job_type }),
    };

    if let Err(e) = state.store.record_usage(&usage).await {
        tracing::warn!(job_id = %job.id, error = %e, "Failed to record usage");
    }
}
