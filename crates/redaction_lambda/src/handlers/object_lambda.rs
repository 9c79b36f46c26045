use redaction_core::contract::{
    validate_read_request, ContinuationToken, InvocationResponse, ReadRequest, TransformResult,
    ValidationError, INTERNAL_ERROR_MESSAGE,
};
use redaction_core::policy::RedactionPolicy;
use redaction_core::transform::{handle, InvocationLog, OriginFetcher};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::adapters::response_writer::{ResponseWriter, WriteBackTarget};

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ObjectLambdaEvent {
    #[serde(rename = "xAmzRequestId")]
    pub request_id: String,
    #[serde(rename = "getObjectContext")]
    pub get_object_context: GetObjectContext,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct GetObjectContext {
    #[serde(rename = "inputS3Url")]
    pub input_s3_url: String,
    #[serde(rename = "outputRoute")]
    pub output_route: String,
    #[serde(rename = "outputToken")]
    pub output_token: String,
}

pub fn decode_object_lambda_event(
    event: Value,
) -> Result<(ReadRequest, WriteBackTarget), ValidationError> {
    let event: ObjectLambdaEvent = serde_json::from_value(event)
        .map_err(|error| ValidationError::new(format!("Malformed object lambda event: {error}")))?;

    let context = event.get_object_context;
    if context.output_route.trim().is_empty() {
        return Err(ValidationError::new("outputRoute cannot be empty"));
    }

    let request = validate_read_request(ReadRequest {
        request_id: event.request_id,
        continuation_token: ContinuationToken::new(context.output_token.clone()),
        object_url: context.input_s3_url,
    })?;
    let target = WriteBackTarget {
        route: context.output_route,
        token: ContinuationToken::new(context.output_token),
    };
    Ok((request, target))
}

/// Route and token of an event that may be otherwise malformed, so that a
/// rejected request can still be answered.
fn salvage_write_back_target(event: &Value) -> Option<WriteBackTarget> {
    let context = event.get("getObjectContext")?;
    let route = context.get("outputRoute")?.as_str()?;
    let token = context.get("outputToken")?.as_str()?;
    if route.trim().is_empty() || token.trim().is_empty() {
        return None;
    }

    Some(WriteBackTarget {
        route: route.to_string(),
        token: ContinuationToken::new(token),
    })
}

/// Runs the transform for an intercepted `GetObject` and delivers the result
/// to the access point exactly once.
pub fn handle_object_lambda_event(
    event: Value,
    policy: &dyn RedactionPolicy,
    fetcher: &dyn OriginFetcher,
    writer: &dyn ResponseWriter,
    log: &dyn InvocationLog,
) -> Result<InvocationResponse, ValidationError> {
    let fallback_target = salvage_write_back_target(&event);
    let (request, target) = match decode_object_lambda_event(event) {
        Ok(value) => value,
        Err(error) => {
            log.error(
                "object_lambda_event_rejected",
                json!({ "error": error.message() }),
            );
            if let Some(target) = fallback_target {
                let rejection = TransformResult::failure(INTERNAL_ERROR_MESSAGE);
                match writer.write_response(target, &rejection) {
                    Ok(()) => log.info(
                        "rejection_written_back",
                        json!({ "status_code": rejection.status_code }),
                    ),
                    Err(write_error) => log.error(
                        "write_back_failed",
                        json!({ "status_code": rejection.status_code, "error": write_error }),
                    ),
                }
            }
            return Err(error);
        }
    };

    let request_id = request.request_id.clone();
    let result = handle(request, policy, fetcher, log);

    match writer.write_response(target, &result) {
        Ok(()) => {
            log.info(
                "write_back_completed",
                json!({
                    "request_id": request_id,
                    "status_code": result.status_code,
                }),
            );
            Ok(result.to_envelope())
        }
        Err(error) => {
            log.error(
                "write_back_failed",
                json!({
                    "request_id": request_id,
                    "status_code": result.status_code,
                    "error": error,
                }),
            );
            Ok(TransformResult::failure(INTERNAL_ERROR_MESSAGE).to_envelope())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use redaction_core::contract::{OriginObject, ResponseBody};
    use redaction_core::error::FetchError;
    use redaction_core::policy::PartialRedactionPolicy;

    use super::*;

    struct StaticFetcher(Result<OriginObject, FetchError>);

    impl OriginFetcher for StaticFetcher {
        fn fetch(&self, _request: &ReadRequest) -> Result<OriginObject, FetchError> {
            self.0.clone()
        }
    }

    struct CapturingWriter {
        writes: Mutex<Vec<(WriteBackTarget, TransformResult)>>,
        fail: bool,
    }

    impl CapturingWriter {
        fn new(fail: bool) -> Self {
            Self {
                writes: Mutex::new(Vec::new()),
                fail,
            }
        }

        fn writes(&self) -> Vec<(WriteBackTarget, TransformResult)> {
            self.writes.lock().expect("poisoned mutex").clone()
        }
    }

    impl ResponseWriter for CapturingWriter {
        fn write_response(
            &self,
            target: WriteBackTarget,
            result: &TransformResult,
        ) -> Result<(), String> {
            self.writes
                .lock()
                .expect("poisoned mutex")
                .push((target, result.clone()));
            if self.fail {
                Err("connection reset".to_string())
            } else {
                Ok(())
            }
        }
    }

    struct SilentLog;

    impl InvocationLog for SilentLog {
        fn info(&self, _event: &str, _details: Value) {}
        fn error(&self, _event: &str, _details: Value) {}
    }

    fn sample_event() -> Value {
        json!({
            "xAmzRequestId": "req-ol-1",
            "getObjectContext": {
                "inputS3Url": "https://ap.example/object?X-Amz-Signature=abc",
                "outputRoute": "io-route",
                "outputToken": "io-token"
            },
            "userRequest": {"url": "https://olap.example/object", "headers": {}},
            "protocolVersion": "1.00"
        })
    }

    #[test]
    fn decodes_context_into_request_and_target() {
        let (request, target) = decode_object_lambda_event(sample_event()).expect("event decodes");

        assert_eq!(request.request_id, "req-ol-1");
        assert_eq!(request.continuation_token.as_str(), "io-token");
        assert!(request.object_url.starts_with("https://ap.example/object"));
        assert_eq!(target.route, "io-route");
    }

    #[test]
    fn rejects_event_without_output_token() {
        let mut event = sample_event();
        event["getObjectContext"]["outputToken"] = json!("");

        let error = decode_object_lambda_event(event).expect_err("empty token should fail");
        assert_eq!(error.message(), "continuationToken cannot be empty");
    }

    #[test]
    fn writes_transformed_body_once() {
        let fetcher = StaticFetcher(Ok(OriginObject::new(b"hello".to_vec())));
        let writer = CapturingWriter::new(false);

        let response = handle_object_lambda_event(
            sample_event(),
            &PartialRedactionPolicy,
            &fetcher,
            &writer,
            &SilentLog,
        )
        .expect("event should be handled");

        assert_eq!(response.status_code, 200);
        let writes = writer.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].0.token.as_str(), "io-token");
        assert_eq!(writes[0].1.payload_bytes(), b"partially redacted hello");
    }

    #[test]
    fn fetch_failure_is_still_written_back() {
        let fetcher = StaticFetcher(Err(FetchError::PermissionDenied("403".to_string())));
        let writer = CapturingWriter::new(false);

        let response = handle_object_lambda_event(
            sample_event(),
            &PartialRedactionPolicy,
            &fetcher,
            &writer,
            &SilentLog,
        )
        .expect("event should be handled");

        assert_eq!(response.status_code, 500);
        let writes = writer.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].1.status_code, 500);
    }

    #[test]
    fn write_back_failure_is_not_retried() {
        let fetcher = StaticFetcher(Ok(OriginObject::new(b"hello".to_vec())));
        let writer = CapturingWriter::new(true);

        let response = handle_object_lambda_event(
            sample_event(),
            &PartialRedactionPolicy,
            &fetcher,
            &writer,
            &SilentLog,
        )
        .expect("event should be handled");

        assert_eq!(writer.writes().len(), 1);
        assert_eq!(response.status_code, 500);
        assert_eq!(
            response.body,
            ResponseBody::Error {
                error: "Internal server error".to_string()
            }
        );
    }

    #[test]
    fn invalid_event_with_usable_route_is_answered_once() {
        let mut event = sample_event();
        event["xAmzRequestId"] = json!("");
        let fetcher = StaticFetcher(Ok(OriginObject::new(b"hello".to_vec())));
        let writer = CapturingWriter::new(false);

        let error = handle_object_lambda_event(
            event,
            &PartialRedactionPolicy,
            &fetcher,
            &writer,
            &SilentLog,
        )
        .expect_err("blank request id should be rejected");

        assert_eq!(error.message(), "requestId cannot be empty");
        let writes = writer.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].0.route, "io-route");
        assert_eq!(writes[0].0.token.as_str(), "io-token");
        assert_eq!(writes[0].1, TransformResult::failure(INTERNAL_ERROR_MESSAGE));
    }

    #[test]
    fn missing_input_url_is_answered_with_internal_error() {
        let mut event = sample_event();
        event["getObjectContext"]
            .as_object_mut()
            .expect("context object")
            .remove("inputS3Url");
        let fetcher = StaticFetcher(Ok(OriginObject::new(b"hello".to_vec())));
        let writer = CapturingWriter::new(false);

        handle_object_lambda_event(event, &PartialRedactionPolicy, &fetcher, &writer, &SilentLog)
            .expect_err("missing input url should be rejected");

        let writes = writer.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].1.status_code, 500);
    }

    #[test]
    fn event_without_token_cannot_be_answered() {
        let mut event = sample_event();
        event["getObjectContext"]["outputToken"] = json!("  ");
        let fetcher = StaticFetcher(Ok(OriginObject::new(b"hello".to_vec())));
        let writer = CapturingWriter::new(false);

        handle_object_lambda_event(event, &PartialRedactionPolicy, &fetcher, &writer, &SilentLog)
            .expect_err("blank token should be rejected");

        assert!(writer.writes().is_empty());
    }
}
