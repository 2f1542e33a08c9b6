//! Usage accounting rows written once per enqueued job.

use genflow_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `usage_logs` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct UsageLog {
    pub id: DbId,
    pub user_id: DbId,
    pub job_id: Option<DbId>,
    pub action: String,
    pub format: String,
    pub quality: String,
    pub credits_consumed: f64,
    pub metadata: serde_json::Value,
    pub created_at: Timestamp,
}

/// DTO for inserting a usage row.
#[derive(Debug, Clone)]
pub struct CreateUsageLog {
    pub user_id: DbId,
    pub job_id: Option<DbId>,
    pub action: String,
    pub format: String,
    pub quality: String,
    pub credits_consumed: f64,
    pub metadata: serde_json::Value,
}
