//! Transport backend contract
//!
//! A backend is the active strategy for learning job status: either a set
//! of recurring poll loops or a single long-lived status stream. The
//! watcher owns exactly one backend at a time and migrates subscriptions
//! between instances when the strategy changes.

use std::sync::Arc;

use jobwatch_core::domain::job::JobId;
use jobwatch_core::dto::status::StatusEvent;

use crate::error::Result;
use crate::poll::PollBackend;
use crate::push::PushBackend;

/// Callback invoked with every status event observed for a subscribed job.
///
/// Callbacks are shared with the backend's worker tasks, so they must be
/// `Send + Sync`; they are cloned by handle during backend migration.
pub type StatusCallback = Arc<dyn Fn(StatusEvent) + Send + Sync>;

/// Transport selection for status listening.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMode {
    /// Resolve to the best supported transport at configuration time.
    /// Never a live backend state.
    Auto,
    /// Long-lived status stream, one connection per backend instance.
    Push,
    /// Recurring status requests, one timer per subscribed job.
    Poll,
}

impl BackendMode {
    /// Resolves `Auto` to a concrete transport.
    ///
    /// Stream support is compiled into this client unconditionally, so
    /// `Auto` always lands on `Push`; polling remains the explicit choice
    /// for environments where a persistent stream is unwanted.
    pub fn resolve(self) -> BackendMode {
        match self {
            BackendMode::Auto => BackendMode::Push,
            concrete => concrete,
        }
    }
}

impl std::fmt::Display for BackendMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BackendMode::Auto => "auto",
            BackendMode::Push => "push",
            BackendMode::Poll => "poll",
        };
        f.write_str(name)
    }
}

/// Contract every transport backend implements.
///
/// All methods are synchronous: the concurrent work (timers, stream reads)
/// runs on tokio tasks owned by the backend, and these methods only touch
/// the subscription bookkeeping.
pub trait TransportBackend {
    /// Registers `callback` for status events of `id`.
    ///
    /// A job id holds at most one subscription per backend instance;
    /// listening again for the same id replaces the previous registration
    /// and releases its transport handle.
    fn listen(&self, id: JobId, callback: StatusCallback);

    /// Current subscriptions as `(id, callback)` pairs, in no particular
    /// order. Used to reproduce state on a replacement backend.
    fn jobs(&self) -> Vec<(JobId, StatusCallback)>;

    /// Unregisters the subscription for `id` and releases its handle.
    ///
    /// Fails with [`ClientError::ListenerNotFound`](crate::ClientError) if
    /// the id was never subscribed or already stopped. No event for the
    /// job fires after this returns.
    fn stop(&self, id: JobId) -> Result<()>;

    /// Releases the transport resource and every subscription. Safe to
    /// call more than once.
    fn dispose(&self);
}

/// The active transport, held in the watcher's single backend slot.
///
/// Swapping strategies means constructing the new variant, migrating the
/// subscription entries, then dropping the old variant; two live transports
/// never coexist for one watcher.
pub(crate) enum Backend {
    Poll(PollBackend),
    Push(PushBackend),
}

impl Backend {
    pub(crate) fn mode(&self) -> BackendMode {
        match self {
            Backend::Poll(_) => BackendMode::Poll,
            Backend::Push(_) => BackendMode::Push,
        }
    }
}

impl TransportBackend for Backend {
    fn listen(&self, id: JobId, callback: StatusCallback) {
        match self {
            Backend::Poll(backend) => backend.listen(id, callback),
            Backend::Push(backend) => backend.listen(id, callback),
        }
    }

    fn jobs(&self) -> Vec<(JobId, StatusCallback)> {
        match self {
            Backend::Poll(backend) => backend.jobs(),
            Backend::Push(backend) => backend.jobs(),
        }
    }

    fn stop(&self, id: JobId) -> Result<()> {
        match self {
            Backend::Poll(backend) => backend.stop(id),
            Backend::Push(backend) => backend.stop(id),
        }
    }

    fn dispose(&self) {
        match self {
            Backend::Poll(backend) => backend.dispose(),
            Backend::Push(backend) => backend.dispose(),
        }
    }
}
