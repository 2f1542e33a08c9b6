//! In-memory [`Store`] implementation.
//!
//! Mirrors the SQL semantics of [`PgStore`](crate::store::PgStore),
//! including the terminal-state guards and the `(job_id, asset_index)`
//! upsert, so handler behaviour can be exercised without a database.
//! Locks are never held across an `.await`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use genflow_core::job_status::JobStatus;
use genflow_core::queue::merge_json;
use genflow_core::types::DbId;
use uuid::Uuid;

use crate::models::job::{CreateJob, Job};
use crate::models::project::Project;
use crate::models::usage_log::{CreateUsageLog, UsageLog};
use crate::models::workspace_asset::{CreateWorkspaceAsset, WorkspaceAsset};
use crate::store::{AssetStore, JobStore, ProjectStore, Store, UsageStore, WorkerStore};

#[derive(Default)]
struct MemoryState {
    jobs: HashMap<DbId, Job>,
    assets: Vec<WorkspaceAsset>,
    usage: Vec<UsageLog>,
    projects: HashMap<DbId, Project>,
    workers: HashMap<String, String>,
    failing_deletes: bool,
    failing_usage: bool,
}

/// Process-local store for tests and local experiments.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Seed a project and return its id.
    pub fn insert_project(
        &self,
        user_id: DbId,
        original_prompt: Option<&str>,
        enhanced_prompt: Option<&str>,
    ) -> DbId {
        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4(),
            user_id,
            title: None,
            original_prompt: original_prompt.map(str::to_string),
            enhanced_prompt: enhanced_prompt.map(str::to_string),
            created_at: now,
            updated_at: now,
        };
        let id = project.id;
        self.lock().projects.insert(id, project);
        id
    }

    /// Register the current URL for a worker type.
    pub fn set_worker_url(&self, worker_type: &str, url: &str) {
        self.lock()
            .workers
            .insert(worker_type.to_string(), url.to_string());
    }

    /// Make `delete_job` fail as if the database were unavailable.
    pub fn set_failing_deletes(&self, failing: bool) {
        self.lock().failing_deletes = failing;
    }

    /// Make `record_usage` fail as if the database were unavailable.
    pub fn set_failing_usage(&self, failing: bool) {
        self.lock().failing_usage = failing;
    }

    /// Record the provider prediction id for a job, as the external worker
    /// does once it has submitted the prediction.
    pub fn attach_external_id(&self, job_id: DbId, external_id: &str) -> Option<Job> {
        let mut state = self.lock();
        let job = state.jobs.get_mut(&job_id)?;
        job.external_id = Some(external_id.to_string());
        job.updated_at = Utc::now();
        Some(job.clone())
    }

    /// Snapshot of all jobs.
    pub fn jobs(&self) -> Vec<Job> {
        self.lock().jobs.values().cloned().collect()
    }

    /// Snapshot of all workspace assets.
    pub fn assets(&self) -> Vec<WorkspaceAsset> {
        self.lock().assets.clone()
    }

    /// Snapshot of all usage rows.
    pub fn usage_logs(&self) -> Vec<UsageLog> {
        self.lock().usage.clone()
    }

    /// Apply `update` to a job when `guard` accepts its current status.
    fn transition<F>(&self, id: DbId, guard: impl Fn(&str) -> bool, update: F) -> Option<Job>
    where
        F: FnOnce(&mut Job),
    {
        let mut state = self.lock();
        let job = state.jobs.get_mut(&id)?;
        if !guard(&job.status) {
            return None;
        }
        update(job);
        job.updated_at = Utc::now();
        Some(job.clone())
    }
}

fn not_terminal(status: &str) -> bool {
    !JobStatus::is_terminal_str(status)
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn create_job(&self, input: &CreateJob) -> Result<Job, sqlx::Error> {
        let now = Utc::now();
        let job = Job {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            job_type: input.job_type.clone(),
            format: input.format.clone(),
            quality: input.quality.clone(),
            status: JobStatus::Queued.as_str().to_string(),
            metadata: input.metadata.clone(),
            project_id: input.project_id,
            video_id: input.video_id,
            image_id: input.image_id,
            external_id: None,
            result_url: None,
            error_message: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };
        self.lock().jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn find_job(&self, id: DbId) -> Result<Option<Job>, sqlx::Error> {
        Ok(self.lock().jobs.get(&id).cloned())
    }

    async fn find_job_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Job>, sqlx::Error> {
        Ok(self
            .lock()
            .jobs
            .values()
            .find(|j| j.external_id.as_deref() == Some(external_id))
            .cloned())
    }

    async fn delete_job(&self, id: DbId) -> Result<bool, sqlx::Error> {
        let mut state = self.lock();
        if state.failing_deletes {
            return Err(sqlx::Error::PoolTimedOut);
        }
        let removed = state.jobs.remove(&id).is_some();
        if removed {
            state.assets.retain(|a| a.job_id != id);
        }
        Ok(removed)
    }

    async fn merge_job_metadata(
        &self,
        id: DbId,
        patch: &serde_json::Value,
    ) -> Result<Option<Job>, sqlx::Error> {
        Ok(self.transition(id, not_terminal, |job| merge_json(&mut job.metadata, patch)))
    }

    async fn mark_job_processing(
        &self,
        id: DbId,
        patch: &serde_json::Value,
    ) -> Result<Option<Job>, sqlx::Error> {
        Ok(self.transition(
            id,
            |s| s == JobStatus::Queued.as_str(),
            |job| {
                job.status = JobStatus::Processing.as_str().to_string();
                merge_json(&mut job.metadata, patch);
            },
        ))
    }

    async fn complete_job(
        &self,
        id: DbId,
        result_url: Option<&str>,
        patch: &serde_json::Value,
    ) -> Result<Option<Job>, sqlx::Error> {
        Ok(self.transition(id, not_terminal, |job| {
            job.status = JobStatus::Completed.as_str().to_string();
            job.result_url = result_url.map(str::to_string);
            job.error_message = None;
            job.completed_at = Some(Utc::now());
            merge_json(&mut job.metadata, patch);
        }))
    }

    async fn fail_job(
        &self,
        id: DbId,
        error: &str,
        patch: &serde_json::Value,
    ) -> Result<Option<Job>, sqlx::Error> {
        Ok(self.transition(id, not_terminal, |job| {
            job.status = JobStatus::Failed.as_str().to_string();
            job.error_message = Some(error.to_string());
            job.completed_at = Some(Utc::now());
            merge_json(&mut job.metadata, patch);
        }))
    }
}

#[async_trait]
impl AssetStore for MemoryStore {
    async fn upsert_workspace_assets(
        &self,
        inputs: &[CreateWorkspaceAsset],
    ) -> Result<Vec<WorkspaceAsset>, sqlx::Error> {
        let mut state = self.lock();
        let mut out = Vec::with_capacity(inputs.len());
        for input in inputs {
            let existing = state
                .assets
                .iter_mut()
                .find(|a| a.job_id == input.job_id && a.asset_index == input.asset_index);
            let asset = match existing {
                Some(asset) => {
                    asset.temp_storage_path = input.temp_storage_path.clone();
                    asset.clone()
                }
                None => {
                    let asset = WorkspaceAsset {
                        id: Uuid::new_v4(),
                        user_id: input.user_id,
                        asset_type: input.asset_type.clone(),
                        temp_storage_path: input.temp_storage_path.clone(),
                        job_id: input.job_id,
                        asset_index: input.asset_index,
                        generation_seed: input.generation_seed,
                        original_prompt: input.original_prompt.clone(),
                        generation_settings: input.generation_settings.clone(),
                        expires_at: input.expires_at,
                        created_at: Utc::now(),
                    };
                    state.assets.push(asset.clone());
                    asset
                }
            };
            out.push(asset);
        }
        Ok(out)
    }

    async fn list_workspace_assets(
        &self,
        job_id: DbId,
    ) -> Result<Vec<WorkspaceAsset>, sqlx::Error> {
        let mut assets: Vec<_> = self
            .lock()
            .assets
            .iter()
            .filter(|a| a.job_id == job_id)
            .cloned()
            .collect();
        assets.sort_by_key(|a| a.asset_index);
        Ok(assets)
    }
}

#[async_trait]
impl UsageStore for MemoryStore {
    async fn record_usage(&self, input: &CreateUsageLog) -> Result<UsageLog, sqlx::Error> {
        if self.lock().failing_usage {
            return Err(sqlx::Error::PoolTimedOut);
        }
        let row = UsageLog {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            job_id: input.job_id,
            action: input.action.clone(),
            format: input.format.clone(),
            quality: input.quality.clone(),
            credits_consumed: input.credits_consumed,
            metadata: input.metadata.clone(),
            created_at: Utc::now(),
        };
        self.lock().usage.push(row.clone());
        Ok(row)
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn project_prompt(
        &self,
        project_id: DbId,
        user_id: DbId,
    ) -> Result<Option<String>, sqlx::Error> {
        Ok(self
            .lock()
            .projects
            .get(&project_id)
            .filter(|p| p.user_id == user_id)
            .and_then(|p| p.prompt().map(str::to_string)))
    }
}

#[async_trait]
impl WorkerStore for MemoryStore {
    async fn active_worker_url(&self, worker_type: &str) -> Result<Option<String>, sqlx::Error> {
        Ok(self.lock().workers.get(worker_type).cloned())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> Result<(), sqlx::Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn create_input(user_id: DbId) -> CreateJob {
        CreateJob {
            user_id,
            job_type: "image_fast".into(),
            format: "image".into(),
            quality: "fast".into(),
            metadata: json!({"prompt": "a cat"}),
            project_id: None,
            video_id: None,
            image_id: None,
        }
    }

    fn asset_input(job: &Job, index: i32, path: &str) -> CreateWorkspaceAsset {
        CreateWorkspaceAsset {
            user_id: job.user_id,
            asset_type: job.format.clone(),
            temp_storage_path: path.into(),
            job_id: job.id,
            asset_index: index,
            generation_seed: None,
            original_prompt: None,
            generation_settings: json!({}),
            expires_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn created_job_is_queued() {
        let store = MemoryStore::new();
        let job = store.create_job(&create_input(Uuid::new_v4())).await.unwrap();
        assert_eq!(job.status(), Some(JobStatus::Queued));
        assert_eq!(store.find_job(job.id).await.unwrap(), Some(job));
    }

    #[tokio::test]
    async fn terminal_jobs_reject_further_transitions() {
        let store = MemoryStore::new();
        let job = store.create_job(&create_input(Uuid::new_v4())).await.unwrap();

        let done = store
            .complete_job(job.id, Some("https://signed"), &json!({"asset_count": 1}))
            .await
            .unwrap()
            .expect("first completion applies");
        assert_eq!(done.status, "completed");
        assert_eq!(done.metadata["prompt"], "a cat");
        assert_eq!(done.metadata["asset_count"], 1);

        assert!(store.complete_job(job.id, None, &json!({})).await.unwrap().is_none());
        assert!(store.fail_job(job.id, "boom", &json!({})).await.unwrap().is_none());
        assert!(store.merge_job_metadata(job.id, &json!({"x": 1})).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn processing_only_from_queued() {
        let store = MemoryStore::new();
        let job = store.create_job(&create_input(Uuid::new_v4())).await.unwrap();

        let processing = store
            .mark_job_processing(job.id, &json!({"provider_status": "processing"}))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(processing.status, "processing");
        assert!(store.mark_job_processing(job.id, &json!({})).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn asset_upsert_keeps_one_row_per_index() {
        let store = MemoryStore::new();
        let job = store.create_job(&create_input(Uuid::new_v4())).await.unwrap();

        let first = store
            .upsert_workspace_assets(&[asset_input(&job, 0, "a.png")])
            .await
            .unwrap();
        let second = store
            .upsert_workspace_assets(&[asset_input(&job, 0, "b.png")])
            .await
            .unwrap();

        assert_eq!(first[0].id, second[0].id);
        assert_eq!(second[0].temp_storage_path, "b.png");
        assert_eq!(store.list_workspace_assets(job.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn lookup_by_external_id() {
        let store = MemoryStore::new();
        let job = store.create_job(&create_input(Uuid::new_v4())).await.unwrap();
        store.attach_external_id(job.id, "pred-1");

        let found = store.find_job_by_external_id("pred-1").await.unwrap().unwrap();
        assert_eq!(found.id, job.id);
        assert!(store.find_job_by_external_id("pred-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn project_prompt_is_scoped_to_owner() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let project = store.insert_project(owner, Some("original"), Some("  "));

        assert_eq!(
            store.project_prompt(project, owner).await.unwrap().as_deref(),
            Some("original")
        );
        assert!(store.project_prompt(project, Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_removes_job() {
        let store = MemoryStore::new();
        let job = store.create_job(&create_input(Uuid::new_v4())).await.unwrap();
        assert!(store.delete_job(job.id).await.unwrap());
        assert!(!store.delete_job(job.id).await.unwrap());
        assert!(store.jobs().is_empty());
    }
}
