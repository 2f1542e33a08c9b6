//! Job lifecycle status.
//!
//! Stored as lowercase text in the `jobs.status` column. Transitions are
//! driven externally (worker and provider callbacks):
//!
//! ```text
//! queued -> processing -> completed | failed
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

/// Statuses after which a job never changes again.
pub const TERMINAL_STATUSES: [JobStatus; 2] = [JobStatus::Completed, JobStatus::Failed];

impl JobStatus {
    /// Column value for this status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        TERMINAL_STATUSES.contains(&self)
    }

    /// Whether a raw column value is a terminal status.
    ///
    /// Unknown values are treated as non-terminal.
    pub fn is_terminal_str(raw: &str) -> bool {
        raw.parse::<Self>().is_ok_and(Self::is_terminal)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(CoreError::Validation(format!("Unknown job status '{other}'"))),
        }
    }
}
