use std::time::Duration;

use redaction_core::contract::{OriginObject, ReadRequest};
use redaction_core::error::FetchError;
use redaction_core::transform::OriginFetcher;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use reqwest::Url;

pub const DEFAULT_ALLOWED_ORIGIN_HOSTS: &str = "amazonaws.com";

/// Hosts a caller-supplied object URL may point at. A URL is accepted only
/// over https on the default port, without credentials, and when its host is
/// a DNS name equal to or under one of the listed domains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginAllowList {
    host_suffixes: Vec<String>,
}

impl OriginAllowList {
    pub fn new<I, S>(host_suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            host_suffixes: host_suffixes
                .into_iter()
                .map(|suffix| normalize_host(suffix.as_ref()))
                .filter(|suffix| !suffix.is_empty())
                .collect(),
        }
    }

    /// Parses a comma-separated list such as `amazonaws.com,internal.example`.
    pub fn from_csv(value: &str) -> Self {
        Self::new(value.split(','))
    }

    pub fn host_suffixes(&self) -> &[String] {
        &self.host_suffixes
    }

    pub fn check(&self, object_url: &str) -> Result<(), String> {
        let url = Url::parse(object_url)
            .map_err(|error| format!("objectUrl is not a valid URL: {error}"))?;

        if url.scheme() != "https" {
            return Err("objectUrl must use https".to_string());
        }
        if !url.username().is_empty() || url.password().is_some() {
            return Err("objectUrl must not carry credentials".to_string());
        }
        if url.port().is_some() {
            return Err("objectUrl must use the default https port".to_string());
        }

        // `domain` is None for IP literals.
        let Some(host) = url.domain().map(normalize_host) else {
            return Err("objectUrl host must be a DNS name".to_string());
        };
        let permitted = self
            .host_suffixes
            .iter()
            .any(|suffix| host == *suffix || host.ends_with(&format!(".{suffix}")));
        if permitted {
            Ok(())
        } else {
            Err(format!("objectUrl host `{host}` is not an allowed origin"))
        }
    }
}

impl Default for OriginAllowList {
    fn default() -> Self {
        Self::from_csv(DEFAULT_ALLOWED_ORIGIN_HOSTS)
    }
}

fn normalize_host(host: &str) -> String {
    host.trim().trim_matches('.').to_ascii_lowercase()
}

/// Fetches the original object through the presigned URL handed to the
/// transform by the access point. One attempt, bounded by `timeout`.
/// Redirects are not followed.
pub struct PresignedUrlFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl PresignedUrlFetcher {
    pub fn new(timeout: Duration) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(Policy::none())
            .build()
            .map_err(|error| format!("failed to build origin http client: {error}"))?;
        Ok(Self { client, timeout })
    }
}

impl OriginFetcher for PresignedUrlFetcher {
    fn fetch(&self, request: &ReadRequest) -> Result<OriginObject, FetchError> {
        let client = self.client.clone();
        let url = request.object_url.clone();
        let timeout = self.timeout;

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let response = client
                    .get(url)
                    .send()
                    .await
                    .map_err(|error| classify_transport_error(&error, timeout))?;

                let status = response.status().as_u16();
                if let Some(error) = classify_status(status) {
                    return Err(error);
                }

                let content_type = response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_string);
                let body = response
                    .bytes()
                    .await
                    .map_err(|error| classify_transport_error(&error, timeout))?;

                Ok::<_, FetchError>(OriginObject {
                    body: body.to_vec(),
                    content_type,
                })
            })
        })
    }
}

pub fn classify_status(status: u16) -> Option<FetchError> {
    match status {
        200..=299 => None,
        401 | 403 => Some(FetchError::PermissionDenied(format!(
            "origin responded with HTTP {status}"
        ))),
        _ => Some(FetchError::OriginUnavailable(format!(
            "origin responded with HTTP {status}"
        ))),
    }
}

fn classify_transport_error(error: &reqwest::Error, timeout: Duration) -> FetchError {
    if error.is_timeout() {
        FetchError::OriginUnavailable(format!(
            "origin fetch timed out after {}ms",
            timeout.as_millis()
        ))
    } else {
        FetchError::OriginUnavailable(format!("origin fetch failed: {error}"))
    }
}
