//! Jobwatch Core
//!
//! Core types shared across the jobwatch services.
//!
//! This crate contains:
//! - Domain types: job identifiers and job status
//! - DTOs: the status event payload exchanged over the wire

pub mod domain;
pub mod dto;
