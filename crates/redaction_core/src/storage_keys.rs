use percent_encoding::percent_decode_str;

pub const DEFAULT_REDACTED_PREFIX: &str = "redacted";

/// Key under which a redacted copy of `source_key` is written.
pub fn redacted_object_key(base_prefix: &str, source_key: &str) -> String {
    let trimmed_prefix = base_prefix.trim_matches('/');
    let trimmed_key = source_key.trim_start_matches('/');
    if trimmed_prefix.is_empty() {
        trimmed_key.to_string()
    } else {
        format!("{trimmed_prefix}/{trimmed_key}")
    }
}

/// Decodes an object key as delivered in S3 event notifications, where spaces
/// arrive as `+` and other reserved bytes are percent-encoded. Malformed
/// escapes are kept literally.
pub fn decode_event_object_key(raw_key: &str) -> String {
    percent_decode_str(&raw_key.replace('+', " "))
        .decode_utf8_lossy()
        .into_owned()
}
