//! Jobwatch Server
//!
//! Mock remote job service: accepts job creation requests, reports job
//! status over plain HTTP, and announces completions over a token-scoped
//! status stream. Jobs have no real work behind them: a job counts as
//! completed once the configured processing duration has elapsed.
//!
//! Exposed as a library so integration tests can mount the router
//! in-process; the binary in `main.rs` serves it standalone.

pub mod api;
pub mod service;

pub use api::create_router;
pub use service::job::JobStore;
