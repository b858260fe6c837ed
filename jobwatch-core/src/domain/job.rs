//! Job domain types

use serde::{Deserialize, Serialize};

/// Identifier assigned to a job by the remote service at creation time.
///
/// Ids are positive integers, unique and monotonically assigned within a
/// service session; they are never reused.
pub type JobId = u64;

/// Observed processing status of a job.
///
/// The client treats status messages as a pass-through: the service reports
/// one of these values on each read and the most recent read is never
/// persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Completed,
}

impl JobStatus {
    /// Wire representation used in status bodies and stream payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Completed => "completed",
        }
    }

    /// Parses a wire status body. Returns `None` for anything the service
    /// does not emit.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(JobStatus::Pending),
            "completed" => Some(JobStatus::Completed),
            _ => None,
        }
    }

    /// Whether this status ends a job's lifecycle.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
