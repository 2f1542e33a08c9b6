//! Project entity model. Only the prompt is consumed by the pipeline.

use genflow_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `projects` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Project {
    pub id: DbId,
    pub user_id: DbId,
    pub title: Option<String>,
    pub original_prompt: Option<String>,
    pub enhanced_prompt: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Project {
    /// The prompt to generate from: the enhanced prompt when present,
    /// otherwise the original one. Blank values count as absent.
    pub fn prompt(&self) -> Option<&str> {
        [&self.enhanced_prompt, &self.original_prompt]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .map(str::trim)
            .find(|p| !p.is_empty())
    }
}
