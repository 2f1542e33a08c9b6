//! Job entity model and insert DTO.

use genflow_core::job_status::JobStatus;
use genflow_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `jobs` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Job {
    pub id: DbId,
    pub user_id: DbId,
    pub job_type: String,
    pub format: String,
    pub quality: String,
    pub status: String,
    pub metadata: serde_json::Value,
    pub project_id: Option<DbId>,
    pub video_id: Option<DbId>,
    pub image_id: Option<DbId>,
    pub external_id: Option<String>,
    pub result_url: Option<String>,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

impl Job {
    /// Parsed status, `None` if the column holds an unknown value.
    pub fn status(&self) -> Option<JobStatus> {
        self.status.parse().ok()
    }

    /// Whether the job has reached `completed` or `failed`.
    pub fn is_terminal(&self) -> bool {
        JobStatus::is_terminal_str(&self.status)
    }
}

/// DTO for inserting a new `queued` job.
#[derive(Debug, Clone)]
pub struct CreateJob {
    pub user_id: DbId,
    pub job_type: String,
    pub format: String,
    pub quality: String,
    pub metadata: serde_json::Value,
    pub project_id: Option<DbId>,
    pub video_id: Option<DbId>,
    pub image_id: Option<DbId>,
}
