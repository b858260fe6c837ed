//! Status event payload and stream channel naming

use serde::{Deserialize, Serialize};

use crate::domain::job::JobId;

/// Prefix for per-job stream channel names.
const CHANNEL_PREFIX: &str = "status_";

/// A single status observation for one job.
///
/// This is both the JSON payload carried by stream events and the unit the
/// client dispatches to status callbacks. `message` is deliberately a free
/// string: the client passes whatever the service reported straight through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub id: JobId,
    pub message: String,
}

impl StatusEvent {
    pub fn new(id: JobId, message: impl Into<String>) -> Self {
        Self {
            id,
            message: message.into(),
        }
    }

    /// Name of the stream channel carrying events for `id`.
    ///
    /// The service multiplexes per-job channels over one connection; the
    /// name is derived deterministically from the job id so both sides
    /// agree without negotiation.
    pub fn channel(id: JobId) -> String {
        format!("{CHANNEL_PREFIX}{id}")
    }

    /// Recovers the job id from a stream channel name, if it is one.
    pub fn parse_channel(name: &str) -> Option<JobId> {
        name.strip_prefix(CHANNEL_PREFIX)?.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_name_embeds_job_id() {
        assert_eq!(StatusEvent::channel(7), "status_7");
        assert_eq!(StatusEvent::parse_channel("status_7"), Some(7));
    }

    #[test]
    fn test_foreign_channel_names_are_rejected() {
        assert_eq!(StatusEvent::parse_channel("progress_7"), None);
        assert_eq!(StatusEvent::parse_channel("status_"), None);
        assert_eq!(StatusEvent::parse_channel("status_x"), None);
    }

    #[test]
    fn test_payload_serializes_to_wire_shape() {
        let event = StatusEvent::new(3, "completed");
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"id":3,"message":"completed"}"#);

        let back: StatusEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
