//! Core domain types
//!
//! Fundamental types shared between the status-listening client and the
//! job service: job identifiers and the status values a job moves through.

pub mod job;
