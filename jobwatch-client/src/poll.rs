//! Polling transport backend
//!
//! One recurring request loop per subscribed job. Polling trades latency
//! (bounded by the interval) for universal compatibility; it is also the
//! fallback target when the push transport fails.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, error, warn};

use jobwatch_core::domain::job::JobId;
use jobwatch_core::dto::status::StatusEvent;

use crate::StatusClient;
use crate::backend::{StatusCallback, TransportBackend};
use crate::error::{ClientError, Result};

/// Polling backend: owns one tokio interval task per subscribed job.
pub struct PollBackend {
    client: StatusClient,
    interval: Duration,
    listeners: Arc<Mutex<HashMap<JobId, PollSubscription>>>,
}

struct PollSubscription {
    ticker: JoinHandle<()>,
    callback: StatusCallback,
}

impl PollBackend {
    pub fn new(client: StatusClient, interval: Duration) -> Self {
        Self {
            client,
            interval,
            listeners: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Recurring status fetch for a single job.
    ///
    /// Tick error policy: transient failures are logged and the next tick
    /// is the retry; an unknown or unauthorized job is fatal for this loop
    /// only, releasing its own subscription. Other jobs keep polling.
    async fn tick_loop(
        client: StatusClient,
        id: JobId,
        callback: StatusCallback,
        period: Duration,
        listeners: Arc<Mutex<HashMap<JobId, PollSubscription>>>,
    ) {
        let mut ticker = time::interval(period);
        // The first interval tick completes immediately; consume it so the
        // first fetch lands one full period after `listen`. Stopping within
        // that period therefore never observes a callback.
        ticker.tick().await;

        loop {
            ticker.tick().await;

            match client.fetch_status(id).await {
                Ok(message) => {
                    debug!(job = id, status = %message, "poll tick");
                    callback(StatusEvent::new(id, message));
                }
                Err(err @ ClientError::JobNotFound(_)) => {
                    error!(job = id, "{err}; stopping its polling loop");
                    listeners.lock().unwrap().remove(&id);
                    break;
                }
                Err(err) => {
                    warn!(job = id, "status poll failed: {err}");
                }
            }
        }
    }
}

impl TransportBackend for PollBackend {
    fn listen(&self, id: JobId, callback: StatusCallback) {
        let mut listeners = self.listeners.lock().unwrap();

        // One subscription per job: re-listening releases the old timer.
        if let Some(previous) = listeners.remove(&id) {
            previous.ticker.abort();
        }

        let ticker = tokio::spawn(Self::tick_loop(
            self.client.clone(),
            id,
            Arc::clone(&callback),
            self.interval,
            Arc::clone(&self.listeners),
        ));

        listeners.insert(id, PollSubscription { ticker, callback });
    }

    fn jobs(&self) -> Vec<(JobId, StatusCallback)> {
        self.listeners
            .lock()
            .unwrap()
            .iter()
            .map(|(id, subscription)| (*id, Arc::clone(&subscription.callback)))
            .collect()
    }

    fn stop(&self, id: JobId) -> Result<()> {
        match self.listeners.lock().unwrap().remove(&id) {
            Some(subscription) => {
                subscription.ticker.abort();
                Ok(())
            }
            None => Err(ClientError::ListenerNotFound(id)),
        }
    }

    fn dispose(&self) {
        let mut listeners = self.listeners.lock().unwrap();
        for (_, subscription) in listeners.drain() {
            subscription.ticker.abort();
        }
    }
}

impl Drop for PollBackend {
    fn drop(&mut self) {
        self.dispose();
    }
}
