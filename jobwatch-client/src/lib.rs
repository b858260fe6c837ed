//! Jobwatch Client
//!
//! Tracks the completion status of asynchronously processed jobs on a
//! remote service, over either a pull-based poll loop or a push-based
//! status stream, switching between the two at runtime without losing
//! in-flight subscriptions.
//!
//! The entry point is [`JobWatcher`]: it creates jobs, registers status
//! callbacks with the currently active transport backend, and, when the
//! stream transport fails with fallback enabled, atomically replaces the
//! backend while re-registering every tracked job.
//!
//! # Example
//!
//! ```no_run
//! use jobwatch_client::{JobWatcher, WatcherConfig};
//!
//! #[tokio::main]
//! async fn main() -> jobwatch_client::Result<()> {
//!     let watcher = JobWatcher::new(
//!         WatcherConfig::new("http://localhost:8080").with_fallback(true),
//!     )?;
//!
//!     let job = watcher.create().await?;
//!     watcher.wait_for_job(job).await?;
//!     watcher.dispose().await?;
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod error;
mod poll;
mod push;
mod watcher;

// Re-export commonly used types
pub use backend::{BackendMode, StatusCallback, TransportBackend};
pub use config::WatcherConfig;
pub use error::{ClientError, Result};
pub use jobwatch_core::domain::job::{JobId, JobStatus};
pub use jobwatch_core::dto::status::StatusEvent;
pub use watcher::JobWatcher;

use reqwest::{Client, StatusCode};
use tracing::debug;
use uuid::Uuid;

/// HTTP client for the job service's point-to-point endpoints.
///
/// Every request carries the correlation token the service uses to
/// authorize status reads; the token is fixed at construction and shared
/// by all backends of one watcher.
#[derive(Debug, Clone)]
pub struct StatusClient {
    /// Base URL of the job service (e.g., "http://localhost:8080")
    base_url: String,
    /// Correlation token appended to every request
    token: Uuid,
    /// HTTP client instance
    client: Client,
}

impl StatusClient {
    /// Create a new status client
    pub fn new(base_url: impl Into<String>, token: Uuid) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            client: Client::new(),
        }
    }

    /// Create a status client with a custom HTTP client, e.g. to configure
    /// timeouts or proxies
    pub fn with_client(base_url: impl Into<String>, token: Uuid, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            client,
        }
    }

    /// Base URL of the job service
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Correlation token used by this client
    pub fn token(&self) -> Uuid {
        self.token
    }

    /// Asks the service to create a new job.
    ///
    /// The service answers with the assigned id as a plain-text body.
    pub async fn create_job(&self) -> Result<JobId> {
        let url = self.url("create");
        let response = self.client.post(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), message));
        }

        let body = response.text().await?;
        body.trim()
            .parse()
            .map_err(|_| ClientError::ParseError(format!("expected a job id, got {body:?}")))
    }

    /// Fetches the current status body for one job.
    ///
    /// The body is passed through verbatim; an unknown id and a rejected
    /// token both surface as [`ClientError::JobNotFound`].
    pub async fn fetch_status(&self, id: JobId) -> Result<String> {
        let url = self.url(&format!("status/{id}"));
        let response = self.client.get(&url).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(ClientError::JobNotFound(id)),
            StatusCode::UNAUTHORIZED => {
                debug!(job = id, "token rejected for status read");
                Err(ClientError::JobNotFound(id))
            }
            status if status.is_success() => Ok(response.text().await?),
            status => {
                let message = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                Err(ClientError::api_error(status.as_u16(), message))
            }
        }
    }

    /// Builds the token-scoped URL for a route.
    fn url(&self, route: &str) -> String {
        format!("{}/{}?uuid={}", self.base_url, route, self.token)
    }
}
