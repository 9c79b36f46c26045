//! Redaction strategies applied by the transform driver.
//!
//! Policies are pure: they never perform I/O and hold no per-request state, so
//! a single instance can serve concurrent invocations.

use std::fmt;
use std::str::FromStr;

use regex::{NoExpand, Regex};
use thiserror::Error;

use crate::error::PolicyError;

pub const PARTIAL_REDACTION_MARKER: &str = "partially redacted ";
pub const SSN_PATTERN: &str = r"\b\d{3}-\d{2}-\d{4}\b";
pub const SSN_REPLACEMENT: &str = "***-**-****";

pub trait RedactionPolicy: Send + Sync {
    fn name(&self) -> &str;

    /// Declares that `apply` maps equal inputs to equal outputs and that
    /// reapplying the policy to its own output is a no-op.
    fn deterministic(&self) -> bool;

    fn apply(&self, original: &[u8]) -> Result<Vec<u8>, PolicyError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityPolicy;

impl RedactionPolicy for IdentityPolicy {
    fn name(&self) -> &str {
        "identity"
    }

    fn deterministic(&self) -> bool {
        true
    }

    fn apply(&self, original: &[u8]) -> Result<Vec<u8>, PolicyError> {
        Ok(original.to_vec())
    }
}

/// Marks content as partially redacted. Content that already carries the
/// marker is returned unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PartialRedactionPolicy;

impl RedactionPolicy for PartialRedactionPolicy {
    fn name(&self) -> &str {
        "partial"
    }

    fn deterministic(&self) -> bool {
        true
    }

    fn apply(&self, original: &[u8]) -> Result<Vec<u8>, PolicyError> {
        let marker = PARTIAL_REDACTION_MARKER.as_bytes();
        if original.starts_with(marker) {
            return Ok(original.to_vec());
        }

        let mut redacted = Vec::with_capacity(marker.len() + original.len());
        redacted.extend_from_slice(marker);
        redacted.extend_from_slice(original);
        Ok(redacted)
    }
}

/// Replaces every match of a regular expression with a fixed mask.
#[derive(Debug, Clone)]
pub struct PatternPolicy {
    name: String,
    pattern: Regex,
    replacement: String,
}

impl PatternPolicy {
    pub fn new(
        name: impl Into<String>,
        pattern: &str,
        replacement: impl Into<String>,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.into(),
            pattern: Regex::new(pattern)?,
            replacement: replacement.into(),
        })
    }

    /// Masks US social security numbers written as `xxx-xx-xxxx`.
    pub fn ssn() -> Self {
        Self::new("ssn", SSN_PATTERN, SSN_REPLACEMENT).expect("SSN pattern should compile")
    }

    pub fn redact_str(&self, content: &str) -> String {
        self.pattern
            .replace_all(content, NoExpand(&self.replacement))
            .into_owned()
    }
}

impl RedactionPolicy for PatternPolicy {
    fn name(&self) -> &str {
        &self.name
    }

    fn deterministic(&self) -> bool {
        !self.pattern.is_match(&self.replacement)
    }

    fn apply(&self, original: &[u8]) -> Result<Vec<u8>, PolicyError> {
        let content = std::str::from_utf8(original).map_err(|error| PolicyError::NonUtf8Content {
            policy: self.name.clone(),
            detail: error.to_string(),
        })?;
        Ok(self.redact_str(content).into_bytes())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    Identity,
    Partial,
    Ssn,
}

impl PolicyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Partial => "partial",
            Self::Ssn => "ssn",
        }
    }

    pub fn build(self) -> Box<dyn RedactionPolicy> {
        match self {
            Self::Identity => Box::new(IdentityPolicy),
            Self::Partial => Box::new(PartialRedactionPolicy),
            Self::Ssn => Box::new(PatternPolicy::ssn()),
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown redaction policy `{0}` (expected identity, partial or ssn)")]
pub struct UnknownPolicyError(pub String);

impl FromStr for PolicyKind {
    type Err = UnknownPolicyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "identity" | "unredacted" => Ok(Self::Identity),
            "partial" => Ok(Self::Partial),
            "ssn" => Ok(Self::Ssn),
            _ => Err(UnknownPolicyError(value.to_string())),
        }
    }
}
