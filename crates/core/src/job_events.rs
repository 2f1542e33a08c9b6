//! Event names for job row changes and client completion signals.
//!
//! Change events flow from the API's event bus to the realtime change feed;
//! completion signals are what the listener emits once a job's assets are
//! known.

/// Event bus type for a new `jobs` row.
pub const EVENT_JOB_INSERTED: &str = "jobs.insert";

/// Event bus type for a modified `jobs` row.
pub const EVENT_JOB_UPDATED: &str = "jobs.update";

/// Event bus type for a removed `jobs` row.
pub const EVENT_JOB_DELETED: &str = "jobs.delete";

/// Table name carried in change events for job rows.
pub const JOBS_TABLE: &str = "jobs";

/// Schema name carried in change events.
pub const PUBLIC_SCHEMA: &str = "public";

/// A single asset from a job has landed in the workspace.
pub const SIGNAL_GENERATION_COMPLETED: &str = "generation-completed";

/// Several assets from one job have landed in the workspace.
pub const SIGNAL_GENERATION_BATCH_COMPLETED: &str = "generation-batch-completed";

/// Metadata key under which completed jobs list their workspace asset ids.
pub const META_WORKSPACE_ASSET_IDS: &str = "workspace_asset_ids";

/// Metadata key recording the last raw status reported by the provider.
pub const META_PROVIDER_STATUS: &str = "provider_status";

/// Kind of row change, as named on the realtime wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    /// Map an event bus type to a change kind, if it is a job change.
    pub fn from_event_type(event_type: &str) -> Option<Self> {
        match event_type {
            EVENT_JOB_INSERTED => Some(Self::Insert),
            EVENT_JOB_UPDATED => Some(Self::Update),
            EVENT_JOB_DELETED => Some(Self::Delete),
            _ => None,
        }
    }

    pub fn event_type(self) -> &'static str {
        match self {
            Self::Insert => EVENT_JOB_INSERTED,
            Self::Update => EVENT_JOB_UPDATED,
            Self::Delete => EVENT_JOB_DELETED,
        }
    }

    /// Wire name (`INSERT`, `UPDATE`, `DELETE`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }

    /// Whether a subscription for `wanted` (`*` or a kind) accepts this kind.
    pub fn matches(self, wanted: &str) -> bool {
        wanted == "*" || wanted.eq_ignore_ascii_case(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_round_trip() {
        for kind in [ChangeKind::Insert, ChangeKind::Update, ChangeKind::Delete] {
            assert_eq!(ChangeKind::from_event_type(kind.event_type()), Some(kind));
        }
        assert_eq!(ChangeKind::from_event_type("project.created"), None);
    }

    #[test]
    fn wildcard_and_case_insensitive_matching() {
        assert!(ChangeKind::Update.matches("*"));
        assert!(ChangeKind::Update.matches("update"));
        assert!(!ChangeKind::Insert.matches("UPDATE"));
    }
}
