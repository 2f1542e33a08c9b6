//! Repository for the `workspace_assets` table.

use genflow_core::types::DbId;
use sqlx::PgPool;

use crate::models::workspace_asset::{CreateWorkspaceAsset, WorkspaceAsset};

/// Column list for `workspace_assets` queries.
const COLUMNS: &str = "\
    id, user_id, asset_type, temp_storage_path, job_id, asset_index, \
    generation_seed, original_prompt, generation_settings, expires_at, created_at";

/// Provides insert and lookup operations for workspace assets.
pub struct WorkspaceAssetRepo;

impl WorkspaceAssetRepo {
    /// Insert a job's assets in one transaction.
    ///
    /// On `(job_id, asset_index)` conflict the existing row is kept (only its
    /// storage path is refreshed) and returned, so a repeated completion
    /// never creates a second batch.
    pub async fn upsert_batch(
        pool: &PgPool,
        inputs: &[CreateWorkspaceAsset],
    ) -> Result<Vec<WorkspaceAsset>, sqlx::Error> {
        let query = format!(
            "INSERT INTO workspace_assets (user_id, asset_type, temp_storage_path, job_id, \
                 asset_index, generation_seed, original_prompt, generation_settings, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (job_id, asset_index) DO UPDATE \
                 SET temp_storage_path = EXCLUDED.temp_storage_path \
             RETURNING {COLUMNS}"
        );

        let mut tx = pool.begin().await?;
        let mut assets = Vec::with_capacity(inputs.len());
        for input in inputs {
            let asset = sqlx::query_as::<_, WorkspaceAsset>(&query)
                .bind(input.user_id)
                .bind(&input.asset_type)
                .bind(&input.temp_storage_path)
                .bind(input.job_id)
                .bind(input.asset_index)
                .bind(input.generation_seed)
                .bind(&input.original_prompt)
                .bind(&input.generation_settings)
                .bind(input.expires_at)
                .fetch_one(&mut *tx)
                .await?;
            assets.push(asset);
        }
        tx.commit().await?;
        Ok(assets)
    }

    /// List the assets produced by a job, ordered by index.
    pub async fn list_by_job(
        pool: &PgPool,
        job_id: DbId,
    ) -> Result<Vec<WorkspaceAsset>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM workspace_assets WHERE job_id = $1 ORDER BY asset_index ASC"
        );
        sqlx::query_as::<_, WorkspaceAsset>(&query)
            .bind(job_id)
            .fetch_all(pool)
            .await
    }
}
