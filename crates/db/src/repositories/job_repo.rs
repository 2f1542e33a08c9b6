//! Repository for the `jobs` table.
//!
//! Status literals come from [`JobStatus`]; no raw strings in SQL binds.
//! Every transition out of a non-terminal state is guarded in the `WHERE`
//! clause so concurrent or repeated callbacks cannot overwrite a finished job.

use genflow_core::job_status::JobStatus;
use genflow_core::types::DbId;
use sqlx::PgPool;

use crate::models::job::{CreateJob, Job};

/// Column list for `jobs` queries.
const COLUMNS: &str = "\
    id, user_id, job_type, format, quality, status, metadata, \
    project_id, video_id, image_id, external_id, result_url, error_message, \
    created_at, updated_at, completed_at";

/// Provides CRUD operations and guarded status transitions for jobs.
pub struct JobRepo;

impl JobRepo {
    /// Insert a new job in `queued` status.
    pub async fn create(pool: &PgPool, input: &CreateJob) -> Result<Job, sqlx::Error> {
        let query = format!(
            "INSERT INTO jobs (user_id, job_type, format, quality, status, metadata, \
                               project_id, video_id, image_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(input.user_id)
            .bind(&input.job_type)
            .bind(&input.format)
            .bind(&input.quality)
            .bind(JobStatus::Queued.as_str())
            .bind(&input.metadata)
            .bind(input.project_id)
            .bind(input.video_id)
            .bind(input.image_id)
            .fetch_one(pool)
            .await
    }

    /// Find a job by its primary key.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1");
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a job by the provider's prediction id.
    pub async fn find_by_external_id(
        pool: &PgPool,
        external_id: &str,
    ) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE external_id = $1");
        sqlx::query_as::<_, Job>(&query)
            .bind(external_id)
            .fetch_optional(pool)
            .await
    }

    /// Delete a job. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Shallow-merge `patch` into the job's metadata.
    ///
    /// Returns `None` if the job does not exist or is already terminal.
    pub async fn merge_metadata(
        pool: &PgPool,
        id: DbId,
        patch: &serde_json::Value,
    ) -> Result<Option<Job>, sqlx::Error> {
        let query = format!(
            "UPDATE jobs SET metadata = metadata || $2 \
             WHERE id = $1 AND status NOT IN ($3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .bind(patch)
            .bind(JobStatus::Completed.as_str())
            .bind(JobStatus::Failed.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Move a `queued` job to `processing`, merging `patch` into metadata.
    ///
    /// Returns `None` if the job is not currently `queued`.
    pub async fn mark_processing(
        pool: &PgPool,
        id: DbId,
        patch: &serde_json::Value,
    ) -> Result<Option<Job>, sqlx::Error> {
        let query = format!(
            "UPDATE jobs SET status = $2, metadata = metadata || $3 \
             WHERE id = $1 AND status = $4 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .bind(JobStatus::Processing.as_str())
            .bind(patch)
            .bind(JobStatus::Queued.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Mark a job as completed with its result URL.
    ///
    /// Returns `None` if the job does not exist or is already terminal.
    pub async fn complete(
        pool: &PgPool,
        id: DbId,
        result_url: Option<&str>,
        patch: &serde_json::Value,
    ) -> Result<Option<Job>, sqlx::Error> {
        let query = format!(
            "UPDATE jobs \
             SET status = $2, result_url = $3, metadata = metadata || $4, \
                 error_message = NULL, completed_at = NOW() \
             WHERE id = $1 AND status NOT IN ($2, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .bind(JobStatus::Completed.as_str())
            .bind(result_url)
            .bind(patch)
            .bind(JobStatus::Failed.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Mark a job as failed with an error message.
    ///
    /// No automatic retry is performed. Returns `None` if the job does not
    /// exist or is already terminal.
    pub async fn fail(
        pool: &PgPool,
        id: DbId,
        error: &str,
        patch: &serde_json::Value,
    ) -> Result<Option<Job>, sqlx::Error> {
        let query = format!(
            "UPDATE jobs \
             SET status = $2, error_message = $3, metadata = metadata || $4, \
                 completed_at = NOW() \
             WHERE id = $1 AND status NOT IN ($5, $2) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .bind(JobStatus::Failed.as_str())
            .bind(error)
            .bind(patch)
            .bind(JobStatus::Completed.as_str())
            .fetch_optional(pool)
            .await
    }
}
