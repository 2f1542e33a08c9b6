//! Service seams over persistence.
//!
//! Handlers depend on these traits (as `Arc<dyn Store>`) rather than on a
//! pool, so the API can run against Postgres ([`PgStore`]) or the in-memory
//! [`MemoryStore`](crate::memory::MemoryStore) used by tests.

use async_trait::async_trait;
use genflow_core::types::DbId;

use crate::models::job::{CreateJob, Job};
use crate::models::usage_log::{CreateUsageLog, UsageLog};
use crate::models::workspace_asset::{CreateWorkspaceAsset, WorkspaceAsset};
use crate::repositories::{JobRepo, ProjectRepo, UsageLogRepo, WorkerRepo, WorkspaceAssetRepo};
use crate::DbPool;

/// Job rows and their guarded status transitions.
///
/// Every mutating method returns `None` when the transition does not apply
/// (job missing, already terminal, or not in the required source state).
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create_job(&self, input: &CreateJob) -> Result<Job, sqlx::Error>;

    async fn find_job(&self, id: DbId) -> Result<Option<Job>, sqlx::Error>;

    async fn find_job_by_external_id(&self, external_id: &str)
        -> Result<Option<Job>, sqlx::Error>;

    async fn delete_job(&self, id: DbId) -> Result<bool, sqlx::Error>;

    async fn merge_job_metadata(
        &self,
        id: DbId,
        patch: &serde_json::Value,
    ) -> Result<Option<Job>, sqlx::Error>;

    async fn mark_job_processing(
        &self,
        id: DbId,
        patch: &serde_json::Value,
    ) -> Result<Option<Job>, sqlx::Error>;

    async fn complete_job(
        &self,
        id: DbId,
        result_url: Option<&str>,
        patch: &serde_json::Value,
    ) -> Result<Option<Job>, sqlx::Error>;

    async fn fail_job(
        &self,
        id: DbId,
        error: &str,
        patch: &serde_json::Value,
    ) -> Result<Option<Job>, sqlx::Error>;
}

/// Workspace asset rows.
#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn upsert_workspace_assets(
        &self,
        inputs: &[CreateWorkspaceAsset],
    ) -> Result<Vec<WorkspaceAsset>, sqlx::Error>;

    async fn list_workspace_assets(&self, job_id: DbId)
        -> Result<Vec<WorkspaceAsset>, sqlx::Error>;
}

/// Usage accounting.
#[async_trait]
pub trait UsageStore: Send + Sync {
    async fn record_usage(&self, input: &CreateUsageLog) -> Result<UsageLog, sqlx::Error>;
}

/// Project prompt lookup.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// The generation prompt of a project owned by `user_id`.
    async fn project_prompt(
        &self,
        project_id: DbId,
        user_id: DbId,
    ) -> Result<Option<String>, sqlx::Error>;
}

/// Active worker registry.
#[async_trait]
pub trait WorkerStore: Send + Sync {
    async fn active_worker_url(&self, worker_type: &str) -> Result<Option<String>, sqlx::Error>;
}

/// Everything the API needs from persistence.
#[async_trait]
pub trait Store: JobStore + AssetStore + UsageStore + ProjectStore + WorkerStore {
    /// Verify the backing database is reachable.
    async fn health_check(&self) -> Result<(), sqlx::Error>;
}

// ---------------------------------------------------------------------------
// PgStore
// ---------------------------------------------------------------------------

/// [`Store`] backed by PostgreSQL through the repository layer.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl JobStore for PgStore {
    async fn create_job(&self, input: &CreateJob) -> Result<Job, sqlx::Error> {
        JobRepo::create(&self.pool, input).await
    }

    async fn find_job(&self, id: DbId) -> Result<Option<Job>, sqlx::Error> {
        JobRepo::find_by_id(&self.pool, id).await
    }

    async fn find_job_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Job>, sqlx::Error> {
        JobRepo::find_by_external_id(&self.pool, external_id).await
    }

    async fn delete_job(&self, id: DbId) -> Result<bool, sqlx::Error> {
        JobRepo::delete(&self.pool, id).await
    }

    async fn merge_job_metadata(
        &self,
        id: DbId,
        patch: &serde_json::Value,
    ) -> Result<Option<Job>, sqlx::Error> {
        JobRepo::merge_metadata(&self.pool, id, patch).await
    }

    async fn mark_job_processing(
        &self,
        id: DbId,
        patch: &serde_json::Value,
    ) -> Result<Option<Job>, sqlx::Error> {
        JobRepo::mark_processing(&self.pool, id, patch).await
    }

    async fn complete_job(
        &self,
        id: DbId,
        result_url: Option<&str>,
        patch: &serde_json::Value,
    ) -> Result<Option<Job>, sqlx::Error> {
        JobRepo::complete(&self.pool, id, result_url, patch).await
    }

    async fn fail_job(
        &self,
        id: DbId,
        error: &str,
        patch: &serde_json::Value,
    ) -> Result<Option<Job>, sqlx::Error> {
        JobRepo::fail(&self.pool, id, error, patch).await
    }
}

#[async_trait]
impl AssetStore for PgStore {
    async fn upsert_workspace_assets(
        &self,
        inputs: &[CreateWorkspaceAsset],
    ) -> Result<Vec<WorkspaceAsset>, sqlx::Error> {
        WorkspaceAssetRepo::upsert_batch(&self.pool, inputs).await
    }

    async fn list_workspace_assets(
        &self,
        job_id: DbId,
    ) -> Result<Vec<WorkspaceAsset>, sqlx::Error> {
        WorkspaceAssetRepo::list_by_job(&self.pool, job_id).await
    }
}

#[async_trait]
impl UsageStore for PgStore {
    async fn record_usage(&self, input: &CreateUsageLog) -> Result<UsageLog, sqlx::Error> {
        UsageLogRepo::create(&self.pool, input).await
    }
}

#[async_trait]
impl ProjectStore for PgStore {
    async fn project_prompt(
        &self,
        project_id: DbId,
        user_id: DbId,
    ) -> Result<Option<String>, sqlx::Error> {
        let project = ProjectRepo::find_for_user(&self.pool, project_id, user_id).await?;
        Ok(project.and_then(|p| p.prompt().map(str::to_string)))
    }
}

#[async_trait]
impl WorkerStore for PgStore {
    async fn active_worker_url(&self, worker_type: &str) -> Result<Option<String>, sqlx::Error> {
        let worker = WorkerRepo::find_active(&self.pool, worker_type).await?;
        Ok(worker.map(|w| w.worker_url))
    }
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> Result<(), sqlx::Error> {
        crate::health_check(&self.pool).await
    }
}
