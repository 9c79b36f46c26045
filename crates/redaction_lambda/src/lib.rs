//! AWS-oriented adapters and handlers for the redaction transform.
//!
//! This crate owns runtime integration details (Lambda event decoding, S3 and
//! presigned-URL adapters, structured logging and environment configuration).
//! Redaction semantics live in `redaction_core`.

pub mod adapters;
pub mod config;
pub mod handlers;
