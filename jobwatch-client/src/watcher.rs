//! Job watcher
//!
//! Owns exactly one transport backend at a time, the correlation token
//! shared by every backend it constructs, and the supervisor that turns
//! push-stream failures into either a fallback to polling or a fatal
//! error.

use std::sync::{Arc, Mutex as StdMutex, Weak};

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use jobwatch_core::domain::job::{JobId, JobStatus};
use jobwatch_core::dto::status::StatusEvent;

use crate::StatusClient;
use crate::backend::{Backend, BackendMode, StatusCallback, TransportBackend};
use crate::config::WatcherConfig;
use crate::error::{ClientError, Result};
use crate::poll::PollBackend;
use crate::push::{PushBackend, StreamFailure};

/// Tracks completion of remote jobs through a swappable transport backend.
///
/// Cloning is cheap and shares the same backend, token, and subscriptions.
#[derive(Clone)]
pub struct JobWatcher {
    inner: Arc<Inner>,
}

struct Inner {
    client: StatusClient,
    config: WatcherConfig,
    /// The single owned backend slot. `None` once disposed, or after a
    /// fatal stream failure with fallback disabled.
    backend: Mutex<Option<Backend>>,
    /// Set when the stream failed and fallback was disabled; every later
    /// operation surfaces this instead of a plain dispose error.
    fatal: StdMutex<Option<String>>,
    /// Cloned into each push backend so stream failures reach the
    /// supervisor regardless of how often the backend is swapped.
    errors: mpsc::UnboundedSender<StreamFailure>,
}

impl JobWatcher {
    /// Creates a watcher and its initial backend.
    ///
    /// The correlation token authorizing status reads is generated here,
    /// once, and reused by every backend for the watcher's lifetime. Must
    /// be called from within a tokio runtime: backends run their timers
    /// and stream reader on spawned tasks.
    pub fn new(config: WatcherConfig) -> Result<Self> {
        config.validate()?;

        let token = Uuid::new_v4();
        let client = StatusClient::new(&config.base_url, token);
        let (errors, error_rx) = mpsc::unbounded_channel();

        let mode = config.mode.resolve();
        let backend = build_backend(&client, &config, &errors, mode);
        info!(%mode, "status backend initialized");

        let inner = Arc::new(Inner {
            client,
            config,
            backend: Mutex::new(Some(backend)),
            fatal: StdMutex::new(None),
            errors,
        });

        spawn_supervisor(Arc::downgrade(&inner), error_rx);

        Ok(Self { inner })
    }

    /// The HTTP client bound to this watcher's token, for direct status
    /// queries outside any subscription.
    pub fn client(&self) -> &StatusClient {
        &self.inner.client
    }

    /// Correlation token scoping this watcher's jobs.
    pub fn token(&self) -> Uuid {
        self.inner.client.token()
    }

    /// Asks the service to create a new job and returns its id.
    pub async fn create(&self) -> Result<JobId> {
        self.ensure_live().await?;
        let id = self.inner.client.create_job().await?;
        info!(job = id, "job created");
        Ok(id)
    }

    /// Subscribes `callback` to status events for `id` on the current
    /// backend.
    pub async fn listen(
        &self,
        id: JobId,
        callback: impl Fn(StatusEvent) + Send + Sync + 'static,
    ) -> Result<()> {
        self.listen_callback(id, Arc::new(callback)).await
    }

    /// Unsubscribes `id`; no event for the job fires after this returns.
    pub async fn stop(&self, id: JobId) -> Result<()> {
        let slot = self.inner.backend.lock().await;
        let backend = slot.as_ref().ok_or_else(|| self.inner.closed_error())?;
        backend.stop(id)
    }

    /// Ids with an active subscription on the current backend.
    pub async fn jobs(&self) -> Result<Vec<JobId>> {
        let slot = self.inner.backend.lock().await;
        let backend = slot.as_ref().ok_or_else(|| self.inner.closed_error())?;
        Ok(backend.jobs().into_iter().map(|(id, _)| id).collect())
    }

    /// The currently active transport mode.
    pub async fn mode(&self) -> Result<BackendMode> {
        let slot = self.inner.backend.lock().await;
        let backend = slot.as_ref().ok_or_else(|| self.inner.closed_error())?;
        Ok(backend.mode())
    }

    /// Resolves the first time the job reports a terminal status, then
    /// releases the subscription.
    ///
    /// Status events are drained from a channel rather than handled inside
    /// the backend's callback, so completion handling never re-enters the
    /// backend that delivered the event. If the job never completes this
    /// never resolves; bounding the wait is the caller's responsibility.
    pub async fn wait_for_job(&self, id: JobId) -> Result<()> {
        let (events_tx, mut events) = mpsc::unbounded_channel();
        let callback: StatusCallback = Arc::new(move |event: StatusEvent| {
            let _ = events_tx.send(event);
        });
        self.listen_callback(id, callback).await?;

        while let Some(event) = events.recv().await {
            debug!(job = id, status = %event.message, "status update");
            if JobStatus::parse(&event.message).is_some_and(|status| status.is_terminal()) {
                self.stop(id).await?;
                return Ok(());
            }
        }

        // Every sender dropped: the subscription was released before a
        // terminal status arrived (fatal stream error or dispose).
        Err(self.inner.subscription_closed_error(id))
    }

    /// Replaces the current backend with a freshly constructed one for
    /// `mode`, carrying every active subscription over.
    pub async fn change_backend(&self, mode: BackendMode) -> Result<()> {
        self.inner.change_backend(mode).await
    }

    /// Releases the backend and all subscriptions. Terminal: every
    /// operation afterwards, including a second `dispose`, fails with
    /// [`ClientError::Disposed`].
    pub async fn dispose(&self) -> Result<()> {
        let mut slot = self.inner.backend.lock().await;
        let backend = slot.take().ok_or_else(|| self.inner.closed_error())?;
        backend.dispose();
        info!("watcher disposed");
        Ok(())
    }

    async fn listen_callback(&self, id: JobId, callback: StatusCallback) -> Result<()> {
        let slot = self.inner.backend.lock().await;
        let backend = slot.as_ref().ok_or_else(|| self.inner.closed_error())?;
        backend.listen(id, callback);
        debug!(job = id, "listening for status events");
        Ok(())
    }

    async fn ensure_live(&self) -> Result<()> {
        if self.inner.backend.lock().await.is_none() {
            return Err(self.inner.closed_error());
        }
        Ok(())
    }
}

impl Inner {
    /// Swap sequence: construct the replacement, reproduce every
    /// subscription on it, dispose the old backend, install the new one.
    /// The slot lock is held throughout, so no other operation observes an
    /// intermediate state and the disposed backend cannot deliver into a
    /// half-migrated map.
    async fn change_backend(&self, mode: BackendMode) -> Result<()> {
        let resolved = mode.resolve();
        let mut slot = self.backend.lock().await;
        let old = slot.take().ok_or_else(|| self.closed_error())?;

        let next = build_backend(&self.client, &self.config, &self.errors, resolved);
        for (id, callback) in old.jobs() {
            next.listen(id, callback);
        }
        old.dispose();
        *slot = Some(next);

        info!(mode = %resolved, "status backend switched");
        Ok(())
    }

    async fn handle_stream_failure(&self, failure: StreamFailure) {
        if self.config.fallback {
            warn!(
                "status stream failed: {}; falling back to polling",
                failure.message
            );
            if let Err(err) = self.change_backend(BackendMode::Poll).await {
                error!("fallback to polling failed: {err}");
            }
        } else {
            error!("status stream failed: {}", failure.message);
            *self.fatal.lock().unwrap() = Some(failure.message);
            // Releasing the backend drops every subscription, so pending
            // waits observe their channel closing and report the failure.
            if let Some(backend) = self.backend.lock().await.take() {
                backend.dispose();
            }
        }
    }

    fn closed_error(&self) -> ClientError {
        match self.fatal.lock().unwrap().clone() {
            Some(message) => ClientError::Stream(message),
            None => ClientError::Disposed,
        }
    }

    fn subscription_closed_error(&self, id: JobId) -> ClientError {
        match self.fatal.lock().unwrap().clone() {
            Some(message) => ClientError::Stream(message),
            None => ClientError::SubscriptionClosed(id),
        }
    }
}

fn build_backend(
    client: &StatusClient,
    config: &WatcherConfig,
    errors: &mpsc::UnboundedSender<StreamFailure>,
    mode: BackendMode,
) -> Backend {
    match mode.resolve() {
        BackendMode::Poll => Backend::Poll(PollBackend::new(
            client.clone(),
            config.poll_interval,
        )),
        _ => Backend::Push(PushBackend::new(
            client.base_url(),
            client.token(),
            errors.clone(),
        )),
    }
}

/// Drains stream failures on a dedicated task.
///
/// Running fallback outside any backend callback means a backend swap can
/// never be re-entered from a callback of the backend being replaced. The
/// weak reference lets the watcher (and its subscriptions) drop normally
/// while a failure is still in flight.
fn spawn_supervisor(inner: Weak<Inner>, mut errors: mpsc::UnboundedReceiver<StreamFailure>) {
    tokio::spawn(async move {
        while let Some(failure) = errors.recv().await {
            let Some(inner) = inner.upgrade() else { break };
            inner.handle_stream_failure(failure).await;
        }
    });
}
