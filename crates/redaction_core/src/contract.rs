use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const DEFAULT_CONTENT_TYPE: &str = "application/json";
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";
pub const PROCESSING_ERROR_MESSAGE: &str = "Processing error";

/// Opaque capability handed out by the access point router. Moved into the
/// invocation that consumes it; never logged.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContinuationToken(String);

impl ContinuationToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for ContinuationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ContinuationToken(<redacted>)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadRequest {
    pub request_id: String,
    pub continuation_token: ContinuationToken,
    pub object_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginObject {
    pub body: Vec<u8>,
    pub content_type: Option<String>,
}

impl OriginObject {
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultBody {
    Data(Vec<u8>),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformResult {
    pub status_code: u16,
    pub body: ResultBody,
    pub content_type: String,
}

impl TransformResult {
    pub fn success(body: Vec<u8>, content_type: Option<String>) -> Self {
        Self {
            status_code: 200,
            body: ResultBody::Data(body),
            content_type: content_type.unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status_code: 500,
            body: ResultBody::Error(message.into()),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
        }
    }

    /// Bytes to hand back to the original caller: the payload on success,
    /// the JSON error body otherwise.
    pub fn payload_bytes(&self) -> Vec<u8> {
        match &self.body {
            ResultBody::Data(bytes) => bytes.clone(),
            ResultBody::Error(_) => stable_contract_json(self.response_body()).into_bytes(),
        }
    }

    pub fn response_body(&self) -> ResponseBody {
        match &self.body {
            ResultBody::Data(bytes) => ResponseBody::Data {
                data: String::from_utf8_lossy(bytes).into_owned(),
            },
            ResultBody::Error(message) => ResponseBody::Error {
                error: message.clone(),
            },
        }
    }

    pub fn to_envelope(&self) -> InvocationResponse {
        InvocationResponse {
            status_code: self.status_code,
            body: self.response_body(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Data { data: String },
    Error { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: ResponseBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

pub fn validate_read_request(request: ReadRequest) -> Result<ReadRequest, ValidationError> {
    let request_id = request.request_id.trim().to_string();
    if request_id.is_empty() {
        return Err(ValidationError::new("requestId cannot be empty"));
    }

    if request.continuation_token.is_empty() {
        return Err(ValidationError::new("continuationToken cannot be empty"));
    }

    let object_url = request.object_url.trim().to_string();
    if object_url.is_empty() {
        return Err(ValidationError::new("objectUrl cannot be empty"));
    }

    Ok(ReadRequest {
        request_id,
        continuation_token: request.continuation_token,
        object_url,
    })
}

pub fn content_fingerprint(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

pub fn stable_contract_json(value: impl Serialize) -> String {
    serde_json::to_string(&value).expect("serialization of contract value should not fail")
}
