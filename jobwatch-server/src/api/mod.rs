//! API Module
//!
//! HTTP surface of the mock job service: plain-text create/status
//! endpoints and the token-scoped status stream.

pub mod error;
pub mod job;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::service::job::JobStore;

/// Create the service router with all endpoints
pub fn create_router(store: Arc<JobStore>) -> Router {
    Router::new()
        .route("/create", post(job::create_job))
        .route("/status/{id}", get(job::get_status))
        .route("/status", get(job::status_stream))
        // Test hook: sever open streams without taking the service down
        .route("/admin/disconnect", post(job::disconnect_streams))
        .with_state(store)
        .layer(TraceLayer::new_for_http())
}
