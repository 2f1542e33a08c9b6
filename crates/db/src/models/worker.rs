//! Active worker registry rows.

use genflow_core::types::Timestamp;
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `active_workers` table: the current URL per worker type.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ActiveWorker {
    pub worker_type: String,
    pub worker_url: String,
    pub updated_at: Timestamp,
}
