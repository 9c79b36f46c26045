use std::time::Duration;

use redaction_core::policy::{PolicyKind, UnknownPolicyError};
use redaction_core::storage_keys::DEFAULT_REDACTED_PREFIX;
use thiserror::Error;

use crate::adapters::origin::OriginAllowList;

pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 3_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("TRANSFORM_POLICY is invalid: {0}")]
    InvalidPolicy(#[from] UnknownPolicyError),
    #[error("ORIGIN_FETCH_TIMEOUT_MS must be a positive integer, got `{0}`")]
    InvalidTimeout(String),
    #[error("ORIGIN_ALLOWED_HOSTS must name at least one host, got `{0}`")]
    InvalidAllowedHosts(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub policy: PolicyKind,
    pub fetch_timeout: Duration,
    pub output_bucket: Option<String>,
    pub output_prefix: String,
    pub origin_allow_list: OriginAllowList,
}

impl RuntimeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let policy = match non_blank(lookup("TRANSFORM_POLICY")) {
            Some(value) => value.parse()?,
            None => PolicyKind::Partial,
        };

        let fetch_timeout = match non_blank(lookup("ORIGIN_FETCH_TIMEOUT_MS")) {
            Some(value) => match value.trim().parse::<u64>() {
                Ok(millis) if millis > 0 => Duration::from_millis(millis),
                _ => return Err(ConfigError::InvalidTimeout(value)),
            },
            None => Duration::from_millis(DEFAULT_FETCH_TIMEOUT_MS),
        };

        let origin_allow_list = match non_blank(lookup("ORIGIN_ALLOWED_HOSTS")) {
            Some(value) => {
                let allow_list = OriginAllowList::from_csv(&value);
                if allow_list.host_suffixes().is_empty() {
                    return Err(ConfigError::InvalidAllowedHosts(value));
                }
                allow_list
            }
            None => OriginAllowList::default(),
        };

        Ok(Self {
            policy,
            fetch_timeout,
            output_bucket: non_blank(lookup("REDACTED_OUTPUT_BUCKET")),
            output_prefix: non_blank(lookup("REDACTED_OUTPUT_PREFIX"))
                .unwrap_or_else(|| DEFAULT_REDACTED_PREFIX.to_string()),
            origin_allow_list,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}
