//! Business logic for the mock job service

pub mod job;
