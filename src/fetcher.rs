// src/fetcher.rs
//
// One GET per (API, address), optionally through a proxy, wrapped in the
// retry policy. Every failure mode ends in a `FetchResult`; nothing here
// escalates to the caller.

use crate::api_spec::ApiSpec;
use crate::decompression;
use crate::metrics;
use crate::proxy_pool::WorkingProxy;
use crate::retry::RetryPolicy;
use crate::settings::Settings;
use log::{debug, warn};
use reqwest::header::{HeaderName, CONTENT_ENCODING, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Characters of an unexpected body that make it into the log.
const BODY_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid request URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP 403 Forbidden")]
    Forbidden,
    #[error("empty response body")]
    EmptyBody,
    #[error("undecodable body: {0}")]
    Decode(String),
}

impl FetchError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FetchError::Url(_))
    }

    fn reason(&self) -> &'static str {
        match self {
            FetchError::Url(_) => "url",
            FetchError::Transport(_) => "transport",
            FetchError::Forbidden => "forbidden",
            FetchError::EmptyBody => "empty_body",
            FetchError::Decode(_) => "decode",
        }
    }
}

/// Outcome of one (API, address) fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchResult {
    /// Decoded JSON body.
    Payload(Value),
    /// No data: retries exhausted, or the API answered with something other than JSON.
    Empty,
    /// The fetch task itself died.
    Failed(String),
}

impl FetchResult {
    pub fn payload(&self) -> Option<&Value> {
        match self {
            FetchResult::Payload(value) => Some(value),
            _ => None,
        }
    }

    pub fn outcome(&self) -> &'static str {
        match self {
            FetchResult::Payload(_) => "payload",
            FetchResult::Empty => "empty",
            FetchResult::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Fetcher {
    direct: Client,
    retry: RetryPolicy,
    request_timeout: Duration,
}

impl Fetcher {
    pub fn new(retry: RetryPolicy, request_timeout: Duration) -> reqwest::Result<Self> {
        Ok(Self {
            direct: Client::builder().build()?,
            retry,
            request_timeout,
        })
    }

    pub fn from_settings(settings: &Settings) -> reqwest::Result<Self> {
        Self::new(
            RetryPolicy::from_settings(settings),
            settings.fetch.request_timeout(),
        )
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Fetches the claim data of `address` from `api`.
    ///
    /// Transport errors, 403s, empty or `null` bodies and undecodable bodies
    /// are retried. Exhausting the retries yields [`FetchResult::Empty`].
    pub async fn fetch(
        &self,
        api: &ApiSpec,
        address: &str,
        proxy: Option<&WorkingProxy>,
    ) -> FetchResult {
        let client = proxy.map_or(&self.direct, |p| &p.client);
        let via = proxy.map_or_else(|| "direct".to_string(), |p| p.proxy.to_string());
        let label = api.kind.label();
        let max_attempts = self.retry.max_attempts();

        let result = self
            .retry
            .run(
                |attempt| {
                    let via = &via;
                    async move {
                        let outcome = self.attempt(client, api, address).await;
                        if let Err(e) = &outcome {
                            warn!(
                                "[FETCH] {} {} via {} attempt {}/{} failed: {}",
                                label, address, via, attempt, max_attempts, e
                            );
                            if attempt < max_attempts && e.is_retryable() {
                                metrics::increment_fetch_retry(label, e.reason());
                            }
                        }
                        outcome
                    }
                },
                FetchError::is_retryable,
            )
            .await;

        let result = match result {
            Ok(Some(value)) => FetchResult::Payload(value),
            Ok(None) => FetchResult::Empty,
            Err(e) => {
                warn!(
                    "[FETCH] {} {}: giving up ({}), recording no data",
                    label, address, e
                );
                metrics::increment_fetch_exhausted(label);
                FetchResult::Empty
            }
        };
        metrics::increment_fetch_result(label, result.outcome());
        result
    }

    /// Single HTTP attempt. `Ok(None)` is a terminal "no data" answer.
    async fn attempt(
        &self,
        client: &Client,
        api: &ApiSpec,
        address: &str,
    ) -> Result<Option<Value>, FetchError> {
        let url = api.request_url(address)?;
        let label = api.kind.label();
        metrics::increment_fetch_attempt(label);

        let started = Instant::now();
        let response = client
            .get(url)
            .headers(api.headers().clone())
            .timeout(self.request_timeout)
            .send()
            .await;
        metrics::record_fetch_latency(label, started.elapsed());
        let response = response?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            return Err(FetchError::Forbidden);
        }

        let (content_type, content_encoding) = {
            let headers = response.headers();
            let header = |name: HeaderName| {
                headers
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_owned)
            };
            (header(CONTENT_TYPE).unwrap_or_default(), header(CONTENT_ENCODING))
        };
        let body = response.bytes().await?;

        if !content_type.contains("application/json") {
            let preview = match decompression::decode(content_encoding.as_deref(), &body) {
                Ok(bytes) => String::from_utf8_lossy(&bytes[..])
                    .chars()
                    .take(BODY_PREVIEW_CHARS)
                    .collect::<String>(),
                Err(e) => format!("<{}>", e),
            };
            warn!(
                "[FETCH] {} {}: unexpected content type `{}` (status {}): {}",
                label, address, content_type, status, preview
            );
            return Ok(None);
        }

        let decoded = decompression::decode(content_encoding.as_deref(), &body)
            .map_err(|e| FetchError::Decode(e.to_string()))?;
        if decoded.iter().all(u8::is_ascii_whitespace) {
            return Err(FetchError::EmptyBody);
        }

        match serde_json::from_slice::<Value>(&decoded) {
            Ok(Value::Null) => Err(FetchError::EmptyBody),
            Ok(value) => {
                if !status.is_success() {
                    debug!(
                        "[FETCH] {} {}: status {} with JSON body, keeping it as the answer",
                        label, address, status
                    );
                }
                Ok(Some(value))
            }
            Err(e) => Err(FetchError::Decode(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_url_errors_are_terminal() {
        assert!(FetchError::Forbidden.is_retryable());
        assert!(FetchError::EmptyBody.is_retryable());
        assert!(FetchError::Decode("x".into()).is_retryable());

        let url_err = url::Url::parse("not a url").unwrap_err();
        assert!(!FetchError::from(url_err).is_retryable());
    }

    #[test]
    fn test_fetch_result_accessors() {
        let payload = FetchResult::Payload(serde_json::json!({"amount": 1}));
        assert_eq!(payload.payload().unwrap()["amount"], 1);
        assert_eq!(payload.outcome(), "payload");
        assert!(FetchResult::Empty.payload().is_none());
        assert_eq!(FetchResult::Failed("boom".into()).outcome(), "failed");
    }
}
