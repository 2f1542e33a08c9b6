//! Handler for `GET /functions/v1/jobs/{id}`.
//!
//! Used by the listener's polling fallback. Only the job's owner may read it.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use genflow_core::error::CoreError;
use genflow_core::types::DbId;
use genflow_db::models::job::Job;
use genflow_db::models::workspace_asset::WorkspaceAsset;
use genflow_db::{AssetStore, JobStore};
use serde::Serialize;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::SuccessResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct JobDetail {
    pub job: Job,
    pub assets: Vec<WorkspaceAsset>,
}

/// GET /functions/v1/jobs/{id}
pub async fn get_job(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = state
        .store
        .find_job(job_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Job", job_id))?;

    if job.user_id != auth.user_id {
        return Err(CoreError::Forbidden("Cannot view another user's job".into()).into());
    }

    let assets = state.store.list_workspace_assets(job.id).await?;
    Ok(Json(SuccessResponse::new(JobDetail { job, assets })))
}
