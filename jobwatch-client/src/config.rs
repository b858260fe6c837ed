//! Watcher configuration
//!
//! Defines the client-facing knobs: service base URL, transport mode,
//! fallback behavior, and the polling interval.

use std::time::Duration;

use crate::backend::BackendMode;
use crate::error::{ClientError, Result};

/// Default period between status polls.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Configuration for a [`JobWatcher`](crate::JobWatcher).
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Base URL of the job service (e.g., "http://localhost:8080")
    pub base_url: String,

    /// Preferred transport. `Auto` is resolved to a concrete mode once,
    /// when the watcher constructs its first backend.
    pub mode: BackendMode,

    /// Replace a failed push backend with a polling backend instead of
    /// surfacing a fatal stream error.
    pub fallback: bool,

    /// How often each subscribed job is polled in `Poll` mode.
    pub poll_interval: Duration,
}

impl WatcherConfig {
    /// Creates a configuration with defaults: auto transport, fallback
    /// disabled, one-second polling.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            mode: BackendMode::Auto,
            fallback: false,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Sets the transport mode.
    pub fn with_mode(mut self, mode: BackendMode) -> Self {
        self.mode = mode;
        self
    }

    /// Enables or disables automatic fallback to polling.
    pub fn with_fallback(mut self, fallback: bool) -> Self {
        self.fallback = fallback;
        self
    }

    /// Sets the polling interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(ClientError::InvalidConfig(
                "base_url cannot be empty".to_string(),
            ));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ClientError::InvalidConfig(
                "base_url must start with http:// or https://".to_string(),
            ));
        }

        if self.poll_interval.is_zero() {
            return Err(ClientError::InvalidConfig(
                "poll_interval must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
