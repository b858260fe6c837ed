//! In-memory job store
//!
//! Jobs are keyed by monotonically assigned positive ids and scoped by the
//! correlation token of the client that created them. Status is derived
//! from elapsed time against the configured job duration; a completion
//! announcement is broadcast once per job for stream subscribers.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use jobwatch_core::domain::job::{JobId, JobStatus};
use jobwatch_core::dto::status::StatusEvent;

/// Broadcast capacity; slow stream consumers lag rather than block.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// A status event together with the token of the job's owner, so stream
/// handlers can filter per client.
#[derive(Debug, Clone)]
pub struct StatusFrame {
    pub event: StatusEvent,
    pub token: Uuid,
}

/// Why a status read was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobLookupError {
    /// No job with this id exists.
    NotFound,
    /// The job exists but belongs to a different token.
    Unauthorized,
}

struct JobRecord {
    token: Uuid,
    created_at: Instant,
}

/// Shared state of the mock service.
pub struct JobStore {
    jobs: Mutex<HashMap<JobId, JobRecord>>,
    next_id: AtomicU64,
    events: broadcast::Sender<StatusFrame>,
    disconnect: broadcast::Sender<()>,
    job_duration: Duration,
}

impl JobStore {
    /// Creates a store whose jobs complete `job_duration` after creation.
    pub fn new(job_duration: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (disconnect, _) = broadcast::channel(1);
        Self {
            jobs: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            events,
            disconnect,
            job_duration,
        }
    }

    /// How long a job takes to complete.
    pub fn job_duration(&self) -> Duration {
        self.job_duration
    }

    /// Registers a new job for `token` and schedules its completion
    /// announcement. Ids are positive, monotonic, and never reused.
    pub fn create_job(&self, token: Uuid) -> JobId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        self.jobs.lock().unwrap().insert(
            id,
            JobRecord {
                token,
                created_at: Instant::now(),
            },
        );

        let events = self.events.clone();
        let delay = self.job_duration;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // No receivers is fine; poll readers derive status themselves.
            let _ = events.send(StatusFrame {
                event: StatusEvent::new(id, JobStatus::Completed.as_str()),
                token,
            });
        });

        debug!(job = id, "job registered");
        id
    }

    /// Current status of a job, as observed by `token`.
    pub fn get_status(&self, id: JobId, token: Uuid) -> Result<JobStatus, JobLookupError> {
        let jobs = self.jobs.lock().unwrap();
        let record = jobs.get(&id).ok_or(JobLookupError::NotFound)?;

        if record.token != token {
            return Err(JobLookupError::Unauthorized);
        }

        if record.created_at.elapsed() >= self.job_duration {
            Ok(JobStatus::Completed)
        } else {
            Ok(JobStatus::Pending)
        }
    }

    /// Subscribes to completion announcements for all clients; stream
    /// handlers filter by token.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusFrame> {
        self.events.subscribe()
    }

    /// A receiver that fires when open streams should be severed.
    pub fn disconnect_watch(&self) -> broadcast::Receiver<()> {
        self.disconnect.subscribe()
    }

    /// Severs every open status stream. Test hook for forcing
    /// connection-level failures while the HTTP endpoints stay up.
    pub fn disconnect_streams(&self) {
        let _ = self.disconnect.send(());
    }
}
