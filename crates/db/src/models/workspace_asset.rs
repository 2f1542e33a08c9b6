//! Workspace asset entity model and insert DTO.
//!
//! Workspace assets are generated images/videos waiting for the user to
//! save them to the library or discard them. They expire.

use genflow_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `workspace_assets` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct WorkspaceAsset {
    pub id: DbId,
    pub user_id: DbId,
    pub asset_type: String,
    pub temp_storage_path: String,
    pub job_id: DbId,
    pub asset_index: i32,
    pub generation_seed: Option<i64>,
    pub original_prompt: Option<String>,
    pub generation_settings: serde_json::Value,
    pub expires_at: Timestamp,
    pub created_at: Timestamp,
}

/// DTO for inserting (or re-inserting) one asset of a job.
///
/// `(job_id, asset_index)` identifies the asset; inserting the same pair
/// twice returns the existing row.
#[derive(Debug, Clone)]
pub struct CreateWorkspaceAsset {
    pub user_id: DbId,
    pub asset_type: String,
    pub temp_storage_path: String,
    pub job_id: DbId,
    pub asset_index: i32,
    pub generation_seed: Option<i64>,
    pub original_prompt: Option<String>,
    pub generation_settings: serde_json::Value,
    pub expires_at: Timestamp,
}
