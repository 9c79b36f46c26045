use std::time::Instant;

use redaction_core::contract::content_fingerprint;
use redaction_core::policy::RedactionPolicy;
use redaction_core::storage_keys::{decode_event_object_key, redacted_object_key};
use redaction_core::transform::InvocationLog;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::adapters::object_store::ObjectStore;

pub const SUCCESS_MESSAGE: &str = "Objects redacted successfully";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectCreatedConfig {
    pub output_bucket: Option<String>,
    pub output_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RedactedObjectRecord {
    pub bucket: String,
    pub key: String,
    pub changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObjectCreatedResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
    pub objects: Vec<RedactedObjectRecord>,
}

#[derive(Debug, Deserialize)]
struct S3Notification {
    #[serde(rename = "Records")]
    records: Vec<S3NotificationRecord>,
}

#[derive(Debug, Deserialize)]
struct S3NotificationRecord {
    s3: S3Entity,
}

#[derive(Debug, Deserialize)]
struct S3Entity {
    bucket: S3Bucket,
    object: S3Object,
}

#[derive(Debug, Deserialize)]
struct S3Bucket {
    name: String,
}

#[derive(Debug, Deserialize)]
struct S3Object {
    key: String,
}

/// Redacts every object announced by an S3 `ObjectCreated` notification and,
/// when an output bucket is configured, stores the redacted copy there.
pub fn handle_object_created_event(
    event: Value,
    config: &ObjectCreatedConfig,
    policy: &dyn RedactionPolicy,
    store: &dyn ObjectStore,
    log: &dyn InvocationLog,
) -> Result<ObjectCreatedResponse, String> {
    let notification: S3Notification = serde_json::from_value(event)
        .map_err(|error| format!("invalid s3 notification event: {error}"))?;

    let total = notification.records.len();
    let mut objects = Vec::with_capacity(total);
    let mut failures = Vec::new();
    for record in notification.records {
        let bucket = record.s3.bucket.name;
        let key = decode_event_object_key(&record.s3.object.key);
        match redact_object(&bucket, &key, config, policy, store, log) {
            Ok(object) => objects.push(object),
            Err(error) => failures.push((format!("{bucket}/{key}"), error)),
        }
    }

    // A failed batch is retried as a whole; records that already succeeded are
    // logged so the rewrite of their output is traceable.
    if !failures.is_empty() {
        log.error(
            "object_batch_incomplete",
            json!({
                "total": total,
                "failed": failures.iter().map(|(object, _)| object.as_str()).collect::<Vec<_>>(),
                "completed": objects
                    .iter()
                    .map(|object| json!({
                        "bucket": object.bucket,
                        "key": object.key,
                        "output_key": object.output_key,
                    }))
                    .collect::<Vec<_>>(),
            }),
        );
        let details = failures
            .iter()
            .map(|(object, error)| format!("{object}: {error}"))
            .collect::<Vec<_>>()
            .join("; ");
        return Err(format!(
            "{} of {total} objects failed: {details}",
            failures.len()
        ));
    }

    Ok(ObjectCreatedResponse {
        status_code: 200,
        body: serde_json::to_string(SUCCESS_MESSAGE).expect("message should serialize"),
        objects,
    })
}

fn redact_object(
    bucket: &str,
    key: &str,
    config: &ObjectCreatedConfig,
    policy: &dyn RedactionPolicy,
    store: &dyn ObjectStore,
    log: &dyn InvocationLog,
) -> Result<RedactedObjectRecord, String> {
    let started_at = Instant::now();
    log.info(
        "object_received",
        json!({ "bucket": bucket, "key": key, "policy": policy.name() }),
    );

    if is_own_output(bucket, key, config) {
        log.info(
            "object_skipped",
            json!({ "bucket": bucket, "key": key, "reason": "already redacted output" }),
        );
        return Ok(RedactedObjectRecord {
            bucket: bucket.to_string(),
            key: key.to_string(),
            changed: false,
            output_key: None,
        });
    }

    let original = store.get_object(bucket, key).map_err(|error| {
        log.error(
            "object_fetch_failed",
            json!({ "bucket": bucket, "key": key, "error": error.clone() }),
        );
        error
    })?;

    let redacted = policy.apply(&original.body).map_err(|error| {
        let message = error.to_string();
        log.error(
            "object_redaction_failed",
            json!({ "bucket": bucket, "key": key, "error": message.clone() }),
        );
        message
    })?;

    let changed = redacted != original.body;
    log.info(
        "object_redacted",
        json!({
            "bucket": bucket,
            "key": key,
            "changed": changed,
            "original_fingerprint": content_fingerprint(&original.body),
            "redacted_fingerprint": content_fingerprint(&redacted),
        }),
    );

    let output_key = match &config.output_bucket {
        Some(output_bucket) => {
            let output_key = redacted_object_key(&config.output_prefix, key);
            store.put_object(
                output_bucket,
                &output_key,
                &redacted,
                original.content_type.as_deref(),
            )?;
            log.info(
                "redacted_copy_written",
                json!({
                    "bucket": output_bucket,
                    "key": output_key.clone(),
                    "duration_ms": started_at.elapsed().as_millis(),
                }),
            );
            Some(output_key)
        }
        None => None,
    };

    Ok(RedactedObjectRecord {
        bucket: bucket.to_string(),
        key: key.to_string(),
        changed,
        output_key,
    })
}

// A redacted copy written back into the source bucket raises its own
// notification; it must not be redacted again.
fn is_own_output(bucket: &str, key: &str, config: &ObjectCreatedConfig) -> bool {
    let Some(output_bucket) = &config.output_bucket else {
        return false;
    };
    if output_bucket != bucket {
        return false;
    }

    let prefix = config.output_prefix.trim_matches('/');
    prefix.is_empty() || key.starts_with(&format!("{prefix}/"))
}
