//! Job API Handlers
//!
//! Endpoints for creating jobs, reading status point-to-point, and
//! streaming completion announcements.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt, future};
use serde::Deserialize;
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

use jobwatch_core::domain::job::JobId;
use jobwatch_core::dto::status::StatusEvent;

use crate::api::error::{ApiError, ApiResult};
use crate::service::job::{JobLookupError, JobStore, StatusFrame};

/// Correlation token carried by every request.
#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub uuid: Uuid,
}

/// POST /create
/// Register a new job for the calling token; the body is the assigned id.
pub async fn create_job(
    State(store): State<Arc<JobStore>>,
    Query(query): Query<TokenQuery>,
) -> String {
    let id = store.create_job(query.uuid);
    tracing::info!(job = id, "job created");
    id.to_string()
}

/// GET /status/{id}
/// Current status of one job: 404 for unknown ids, 401 for a token
/// mismatch, otherwise "pending" or "completed".
pub async fn get_status(
    State(store): State<Arc<JobStore>>,
    Path(id): Path<JobId>,
    Query(query): Query<TokenQuery>,
) -> ApiResult<String> {
    tracing::debug!(job = id, "status read");

    match store.get_status(id, query.uuid) {
        Ok(status) => Ok(status.as_str().to_string()),
        Err(JobLookupError::NotFound) => {
            Err(ApiError::NotFound(format!("Job {} not found", id)))
        }
        Err(JobLookupError::Unauthorized) => {
            Err(ApiError::Unauthorized("unauthorized".to_string()))
        }
    }
}

/// GET /status
/// Persistent status stream for the calling token. One named channel per
/// job id, multiplexed over a single connection.
pub async fn status_stream(
    State(store): State<Arc<JobStore>>,
    Query(query): Query<TokenQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let token = query.uuid;
    tracing::debug!("status stream opened");

    let events = BroadcastStream::new(store.subscribe()).filter_map(move |frame| {
        future::ready(match frame {
            Ok(frame) if frame.token == token => status_to_event(&frame),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!("status broadcast lagged: {err}");
                None
            }
        })
    });

    // End the response when the disconnect hook fires so clients observe
    // a dropped connection.
    let mut disconnect = store.disconnect_watch();
    let events = events.take_until(Box::pin(async move {
        let _ = disconnect.recv().await;
    }));

    Sse::new(events).keep_alive(KeepAlive::default())
}

/// POST /admin/disconnect
/// Severs every open status stream.
pub async fn disconnect_streams(State(store): State<Arc<JobStore>>) -> StatusCode {
    tracing::info!("severing open status streams");
    store.disconnect_streams();
    StatusCode::NO_CONTENT
}

fn status_to_event(frame: &StatusFrame) -> Option<Result<Event, Infallible>> {
    let data = serde_json::to_string(&frame.event).ok()?;
    Some(Ok(Event::default()
        .event(StatusEvent::channel(frame.event.id))
        .data(data)))
}
