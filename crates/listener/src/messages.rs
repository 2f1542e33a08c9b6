//! Job rows as they arrive from the change feed or the jobs API.

use genflow_core::job_events::META_WORKSPACE_ASSET_IDS;
use genflow_core::job_status::JobStatus;
use genflow_core::types::DbId;
use serde::Deserialize;

/// The subset of a `jobs` row the listener reads.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JobRow {
    pub id: DbId,
    pub user_id: DbId,
    #[serde(default)]
    pub format: String,
    pub status: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl JobRow {
    pub fn is_completed(&self) -> bool {
        self.status == JobStatus::Completed.as_str()
    }

    pub fn is_terminal(&self) -> bool {
        JobStatus::is_terminal_str(&self.status)
    }

    /// Workspace asset ids recorded on a completed job, in asset order.
    pub fn workspace_asset_ids(&self) -> Vec<DbId> {
        self.metadata
            .get(META_WORKSPACE_ASSET_IDS)
            .and_then(|v| v.as_array())
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| id.as_str())
                    .filter_map(|id| id.parse().ok())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Client-side `metadata.<key> == <value>` predicate narrowing which job
/// changes the listener acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataPredicate {
    pub key: String,
    pub value: String,
}

impl MetadataPredicate {
    /// Parse `key=value`.
    pub fn parse(raw: &str) -> Option<Self> {
        let (key, value) = raw.split_once('=')?;
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        Some(Self {
            key: key.to_string(),
            value: value.trim().to_string(),
        })
    }

    pub fn matches(&self, metadata: &serde_json::Value) -> bool {
        match metadata.get(&self.key) {
            Some(serde_json::Value::String(s)) => s == &self.value,
            Some(serde_json::Value::Number(n)) => n.to_string() == self.value,
            Some(serde_json::Value::Bool(b)) => b.to_string() == self.value,
            _ => false,
        }
    }
}
