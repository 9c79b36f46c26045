//! Shared object-read redaction primitives.
//!
//! This crate owns the transform driver, the redaction policies and the
//! request/response contracts. It intentionally excludes AWS SDK and Lambda
//! runtime concerns, which live in `redaction_lambda`.

pub mod contract;
pub mod error;
pub mod policy;
pub mod storage_keys;
pub mod transform;
