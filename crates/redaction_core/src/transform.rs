//! The intercepting-read driver: fetch the original object, apply exactly one
//! redaction policy and produce the response for the original caller.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

use serde_json::{json, Value};

use crate::contract::{content_fingerprint, OriginObject, ReadRequest, TransformResult};
use crate::error::{FetchError, TransformError};
use crate::policy::RedactionPolicy;

/// Fetch capability supplied by the hosting platform.
pub trait OriginFetcher: Send + Sync {
    fn fetch(&self, request: &ReadRequest) -> Result<OriginObject, FetchError>;
}

/// Structured logging capability passed into every invocation.
pub trait InvocationLog: Send + Sync {
    fn info(&self, event: &str, details: Value);
    fn error(&self, event: &str, details: Value);
}

/// Handles one intercepted read. Every failure is mapped to a 500 result;
/// nothing escapes this boundary.
pub fn handle(
    request: ReadRequest,
    policy: &dyn RedactionPolicy,
    fetcher: &dyn OriginFetcher,
    log: &dyn InvocationLog,
) -> TransformResult {
    let started_at = Instant::now();
    log.info(
        "transform_started",
        json!({
            "request_id": request.request_id.clone(),
            "policy": policy.name(),
        }),
    );

    match run_transform(&request, policy, fetcher, log) {
        Ok(result) => {
            log.info(
                "transform_completed",
                json!({
                    "request_id": request.request_id.clone(),
                    "policy": policy.name(),
                    "status_code": result.status_code,
                    "duration_ms": started_at.elapsed().as_millis(),
                }),
            );
            result
        }
        Err(error) => {
            log.error(
                "transform_failed",
                json!({
                    "request_id": request.request_id.clone(),
                    "policy": policy.name(),
                    "error_code": error.code(),
                    "error": error.to_string(),
                    "duration_ms": started_at.elapsed().as_millis(),
                }),
            );
            TransformResult::failure(error.public_message())
        }
    }
}

fn run_transform(
    request: &ReadRequest,
    policy: &dyn RedactionPolicy,
    fetcher: &dyn OriginFetcher,
    log: &dyn InvocationLog,
) -> Result<TransformResult, TransformError> {
    let origin = fetcher.fetch(request)?;
    log.info(
        "origin_fetched",
        json!({
            "request_id": request.request_id.clone(),
            "bytes": origin.body.len(),
            "content_type": origin.content_type.clone(),
            "fingerprint": content_fingerprint(&origin.body),
        }),
    );

    let redacted = catch_unwind(AssertUnwindSafe(|| policy.apply(&origin.body)))
        .map_err(|panic| TransformError::Unexpected(panic_message(panic.as_ref())))??;
    log.info(
        "policy_applied",
        json!({
            "request_id": request.request_id.clone(),
            "policy": policy.name(),
            "bytes": redacted.len(),
            "fingerprint": content_fingerprint(&redacted),
        }),
    );

    Ok(TransformResult::success(redacted, origin.content_type))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("policy panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("policy panicked: {message}")
    } else {
        "policy panicked".to_string()
    }
}
