//! Error types for the jobwatch client

use jobwatch_core::domain::job::JobId;
use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors surfaced by the status client, the transport backends, and the
/// watcher that owns them.
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// The service answered with an unexpected status code
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Failed to parse a response body
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// The service does not know the job, or this client's token is not
    /// authorized to read it
    #[error("job {0} was not found on the service")]
    JobNotFound(JobId),

    /// `stop` was called for a job id with no active subscription
    #[error("job {0} is not being listened")]
    ListenerNotFound(JobId),

    /// A stream payload for one job could not be decoded; the connection
    /// and every other subscription are unaffected
    #[error("malformed status payload for job {id}: {source}")]
    MessageParse {
        id: JobId,
        #[source]
        source: serde_json::Error,
    },

    /// The status stream failed and fallback to polling was not enabled
    #[error("status stream failed: {0}")]
    Stream(String),

    /// A wait ended because the job's subscription was released before a
    /// terminal status arrived
    #[error("subscription for job {0} closed before completion")]
    SubscriptionClosed(JobId),

    /// Operation on a watcher that has already been disposed
    #[error("watcher has been disposed")]
    Disposed,

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ClientError {
    /// Create an API error from status code and message
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    /// Check if this error means the job is unknown or unauthorized
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::JobNotFound(_)) || matches!(self, Self::ApiError { status: 404, .. })
    }
}
