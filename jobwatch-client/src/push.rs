//! Streaming transport backend
//!
//! One persistent status stream per backend instance, scoped by the
//! client's correlation token. The service multiplexes per-job channels
//! over the single connection; this backend demultiplexes inbound events
//! by channel name into the registered callbacks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures::StreamExt;
use reqwest_eventsource::{Event as SourceEvent, EventSource};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, trace};
use uuid::Uuid;

use jobwatch_core::domain::job::JobId;
use jobwatch_core::dto::status::StatusEvent;

use crate::backend::{StatusCallback, TransportBackend};
use crate::error::{ClientError, Result};

/// A connection-level stream failure.
///
/// Reported at most once per backend instance; the watcher decides whether
/// it means fallback or a fatal error.
#[derive(Debug, Clone)]
pub(crate) struct StreamFailure {
    pub message: String,
}

/// Push backend: a single stream connection plus a demultiplexing map from
/// job id to callback.
pub struct PushBackend {
    listeners: Arc<Mutex<HashMap<JobId, StatusCallback>>>,
    reader: JoinHandle<()>,
}

impl PushBackend {
    /// Opens the stream and starts the reader task.
    ///
    /// The connection is created once per backend instance, not per job;
    /// `listen` only attaches demux handlers. `errors` is the watcher's
    /// error channel and receives at most one failure for the lifetime of
    /// this backend; the backend never reconnects on its own.
    pub(crate) fn new(
        base_url: &str,
        token: Uuid,
        errors: mpsc::UnboundedSender<StreamFailure>,
    ) -> Self {
        let url = format!("{base_url}/status?uuid={token}");
        let listeners: Arc<Mutex<HashMap<JobId, StatusCallback>>> =
            Arc::new(Mutex::new(HashMap::new()));

        let source = EventSource::get(&url);
        let reader = tokio::spawn(Self::read_loop(source, Arc::clone(&listeners), errors));

        Self { listeners, reader }
    }

    async fn read_loop(
        mut source: EventSource,
        listeners: Arc<Mutex<HashMap<JobId, StatusCallback>>>,
        errors: mpsc::UnboundedSender<StreamFailure>,
    ) {
        while let Some(event) = source.next().await {
            match event {
                Ok(SourceEvent::Open) => debug!("status stream connected"),
                Ok(SourceEvent::Message(message)) => Self::dispatch(&listeners, message),
                Err(err) => {
                    source.close();
                    let _ = errors.send(StreamFailure {
                        message: err.to_string(),
                    });
                    break;
                }
            }
        }
    }

    /// Routes one inbound stream event to its job's callback.
    ///
    /// A malformed payload fails that dispatch only; the connection and
    /// every other subscription stay intact.
    fn dispatch(
        listeners: &Mutex<HashMap<JobId, StatusCallback>>,
        message: eventsource_stream::Event,
    ) {
        let Some(id) = StatusEvent::parse_channel(&message.event) else {
            trace!(event = %message.event, "ignoring unrecognized stream event");
            return;
        };

        let callback = listeners.lock().unwrap().get(&id).cloned();
        let Some(callback) = callback else {
            debug!(job = id, "stream event for unsubscribed job");
            return;
        };

        match serde_json::from_str::<StatusEvent>(&message.data) {
            Ok(event) => callback(event),
            Err(source) => {
                let err = ClientError::MessageParse { id, source };
                error!(job = id, "{err}");
            }
        }
    }
}

impl TransportBackend for PushBackend {
    fn listen(&self, id: JobId, callback: StatusCallback) {
        self.listeners.lock().unwrap().insert(id, callback);
    }

    fn jobs(&self) -> Vec<(JobId, StatusCallback)> {
        self.listeners
            .lock()
            .unwrap()
            .iter()
            .map(|(id, callback)| (*id, Arc::clone(callback)))
            .collect()
    }

    fn stop(&self, id: JobId) -> Result<()> {
        match self.listeners.lock().unwrap().remove(&id) {
            Some(_) => Ok(()),
            None => Err(ClientError::ListenerNotFound(id)),
        }
    }

    fn dispose(&self) {
        self.reader.abort();
        self.listeners.lock().unwrap().clear();
    }
}

impl Drop for PushBackend {
    fn drop(&mut self) {
        self.dispose();
    }
}
