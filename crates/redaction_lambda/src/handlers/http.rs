use redaction_core::contract::{
    validate_read_request, ContinuationToken, InvocationResponse, ReadRequest, ResponseBody,
    TransformResult,
};
use redaction_core::policy::RedactionPolicy;
use redaction_core::transform::{handle, InvocationLog, OriginFetcher};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::adapters::origin::OriginAllowList;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiGatewayResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub headers: Value,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum HttpInvocationResponse {
    ApiGateway(ApiGatewayResponse),
    Direct(InvocationResponse),
}

impl HttpInvocationResponse {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::ApiGateway(response) => response.status_code,
            Self::Direct(response) => response.status_code,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HttpReadPayload {
    #[serde(default)]
    request_id: Option<String>,
    continuation_token: ContinuationToken,
    object_url: String,
}

/// Serves the `/conveyance` route and direct invocations carrying a read
/// request descriptor. The caller-supplied `objectUrl` is fetched only when
/// `allow_list` accepts it.
pub fn handle_http_event(
    event: Value,
    fallback_request_id: &str,
    allow_list: &OriginAllowList,
    policy: &dyn RedactionPolicy,
    fetcher: &dyn OriginFetcher,
    log: &dyn InvocationLog,
) -> HttpInvocationResponse {
    let via_api_gateway = event.get("body").is_some();

    let payload = match normalize_apigw_event(event) {
        Ok(value) => value,
        Err(message) => return validation_error_response(via_api_gateway, &message),
    };

    let payload = match serde_json::from_value::<HttpReadPayload>(payload) {
        Ok(value) => value,
        Err(error) => {
            return validation_error_response(
                via_api_gateway,
                &format!("Malformed request: {error}"),
            )
        }
    };

    let request_id = payload
        .request_id
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| fallback_request_id.to_string());

    let request = match validate_read_request(ReadRequest {
        request_id,
        continuation_token: payload.continuation_token,
        object_url: payload.object_url,
    }) {
        Ok(value) => value,
        Err(error) => return validation_error_response(via_api_gateway, error.message()),
    };

    if let Err(message) = allow_list.check(&request.object_url) {
        log.error(
            "origin_rejected",
            json!({ "request_id": request.request_id, "error": message.clone() }),
        );
        return validation_error_response(via_api_gateway, &message);
    }

    let result = handle(request, policy, fetcher, log);
    if via_api_gateway {
        HttpInvocationResponse::ApiGateway(api_gateway_response(&result))
    } else {
        HttpInvocationResponse::Direct(result.to_envelope())
    }
}

fn normalize_apigw_event(event: Value) -> Result<Value, String> {
    let Some(object) = event.as_object() else {
        return Err("Request payload must be a JSON object".to_string());
    };

    let Some(body) = object.get("body") else {
        return Ok(event);
    };

    match body {
        Value::Null => Ok(json!({})),
        Value::Object(_) => Ok(body.clone()),
        Value::String(text) => {
            serde_json::from_str(text).map_err(|error| format!("Malformed JSON body: {error}"))
        }
        _ => Err("Request body must be a JSON object".to_string()),
    }
}

fn api_gateway_response(result: &TransformResult) -> ApiGatewayResponse {
    ApiGatewayResponse {
        status_code: result.status_code,
        headers: json!({"Content-Type": "application/json"}),
        body: serde_json::to_string(&result.response_body())
            .expect("response payload should serialize"),
    }
}

fn validation_error_response(via_api_gateway: bool, message: &str) -> HttpInvocationResponse {
    if via_api_gateway {
        HttpInvocationResponse::ApiGateway(ApiGatewayResponse {
            status_code: 400,
            headers: json!({"Content-Type": "application/json"}),
            body: json!({
                "error": "validation_error",
                "message": message,
            })
            .to_string(),
        })
    } else {
        HttpInvocationResponse::Direct(InvocationResponse {
            status_code: 400,
            body: ResponseBody::Error {
                error: message.to_string(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use redaction_core::contract::OriginObject;
    use redaction_core::error::FetchError;
    use redaction_core::policy::PartialRedactionPolicy;

    use super::*;

    struct CountingFetcher {
        calls: AtomicUsize,
    }

    impl CountingFetcher {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl OriginFetcher for CountingFetcher {
        fn fetch(&self, request: &ReadRequest) -> Result<OriginObject, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(request.object_url, "https://origin.example/deed.txt");
            Ok(OriginObject::new(b"hello".to_vec()))
        }
    }

    fn allow_list() -> OriginAllowList {
        OriginAllowList::from_csv("origin.example")
    }

    struct SilentLog;

    impl InvocationLog for SilentLog {
        fn info(&self, _event: &str, _details: Value) {}
        fn error(&self, _event: &str, _details: Value) {}
    }

    #[test]
    fn api_gateway_event_returns_proxy_response() {
        let fetcher = CountingFetcher::new();
        let response = handle_http_event(
            json!({
                "httpMethod": "POST",
                "path": "/conveyance",
                "body": "{\"requestId\":\"req-7\",\"continuationToken\":\"tok\",\"objectUrl\":\"https://origin.example/deed.txt\"}"
            }),
            "lambda-req",
            &allow_list(),
            &PartialRedactionPolicy,
            &fetcher,
            &SilentLog,
        );

        let HttpInvocationResponse::ApiGateway(response) = response else {
            panic!("expected api gateway response");
        };
        assert_eq!(response.status_code, 200);
        let body: Value = serde_json::from_str(&response.body).expect("body should parse");
        assert_eq!(body, json!({"data": "partially redacted hello"}));
    }

    #[test]
    fn direct_invocation_returns_bare_envelope() {
        let fetcher = CountingFetcher::new();
        let response = handle_http_event(
            json!({
                "continuationToken": "tok",
                "objectUrl": "https://origin.example/deed.txt"
            }),
            "lambda-req",
            &allow_list(),
            &PartialRedactionPolicy,
            &fetcher,
            &SilentLog,
        );

        assert_eq!(
            serde_json::to_value(&response).expect("response serializes"),
            json!({"statusCode": 200, "body": {"data": "partially redacted hello"}})
        );
    }

    #[test]
    fn rejects_missing_object_url_without_fetching() {
        let fetcher = CountingFetcher::new();
        let response = handle_http_event(
            json!({"body": {"continuationToken": "tok"}}),
            "lambda-req",
            &allow_list(),
            &PartialRedactionPolicy,
            &fetcher,
            &SilentLog,
        );

        assert_eq!(response.status_code(), 400);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn rejects_malformed_json_body() {
        let fetcher = CountingFetcher::new();
        let response = handle_http_event(
            json!({"body": "{not json"}),
            "lambda-req",
            &allow_list(),
            &PartialRedactionPolicy,
            &fetcher,
            &SilentLog,
        );

        let HttpInvocationResponse::ApiGateway(response) = response else {
            panic!("expected api gateway response");
        };
        assert_eq!(response.status_code, 400);
        assert!(response.body.contains("Malformed JSON body"));
    }

    #[test]
    fn rejects_internal_object_urls_without_fetching() {
        for object_url in [
            "http://127.0.0.1:9001/2018-06-01/runtime/invocation/next",
            "http://origin.example/deed.txt",
            "https://169.254.169.254/latest/meta-data/",
            "https://metadata.internal/deed.txt",
        ] {
            let fetcher = CountingFetcher::new();
            let response = handle_http_event(
                json!({"body": json!({
                    "continuationToken": "anything",
                    "objectUrl": object_url
                })
                .to_string()}),
                "lambda-req",
                &allow_list(),
                &PartialRedactionPolicy,
                &fetcher,
                &SilentLog,
            );

            let HttpInvocationResponse::ApiGateway(response) = response else {
                panic!("expected api gateway response");
            };
            assert_eq!(response.status_code, 400, "{object_url} should be rejected");
            assert!(response.body.contains("validation_error"));
            assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
        }
    }
}
