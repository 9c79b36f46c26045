use thiserror::Error;

use crate::contract::{INTERNAL_ERROR_MESSAGE, PROCESSING_ERROR_MESSAGE};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("origin unavailable: {0}")]
    OriginUnavailable(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("policy `{policy}` requires UTF-8 content: {detail}")]
    NonUtf8Content { policy: String, detail: String },
    #[error("policy `{policy}` failed: {detail}")]
    Rejected { policy: String, detail: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    #[error("origin unavailable: {0}")]
    OriginUnavailable(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("policy application failed: {0}")]
    PolicyApplication(#[source] PolicyError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl TransformError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::OriginUnavailable(_) => "origin_unavailable",
            Self::PermissionDenied(_) => "permission_denied",
            Self::PolicyApplication(_) => "policy_application_error",
            Self::Unexpected(_) => "unexpected_error",
        }
    }

    /// Message shown to the caller. Provider detail stays in the logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::OriginUnavailable(_) | Self::PermissionDenied(_) | Self::Unexpected(_) => {
                INTERNAL_ERROR_MESSAGE
            }
            Self::PolicyApplication(_) => PROCESSING_ERROR_MESSAGE,
        }
    }
}

impl From<FetchError> for TransformError {
    fn from(error: FetchError) -> Self {
        match error {
            FetchError::OriginUnavailable(detail) => Self::OriginUnavailable(detail),
            FetchError::PermissionDenied(detail) => Self::PermissionDenied(detail),
        }
    }
}

impl From<PolicyError> for TransformError {
    fn from(error: PolicyError) -> Self {
        Self::PolicyApplication(error)
    }
}
