//! Blocking HTTP transport with bounded retry.
//!
//! Every request the client issues goes through [`HttpSession::execute`], the
//! single entry point that applies authentication headers, the retry policy
//! and the status-code taxonomy. Pagination and decoding layers above never
//! see a transient 5xx unless the retry budget is exhausted.

use std::time::Duration;

use reqwest::Method;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::{debug, warn};

use crate::error::{ClientError, Result};

/// Session-wide request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Retry behaviour for transient server failures.
///
/// Only the listed status codes are retried; everything else surfaces
/// immediately. Waits between attempts grow exponentially:
/// `backoff_factor * 2^(attempt - 1)` seconds.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    /// Base of the exponential backoff schedule, in seconds.
    pub backoff_factor: f64,
    /// Status codes considered transient.
    pub retry_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_factor: 0.3,
            retry_statuses: vec![500, 502, 504],
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            backoff_factor: 0.0,
            retry_statuses: Vec::new(),
        }
    }

    fn is_retryable(&self, status: StatusCode) -> bool {
        self.retry_statuses.contains(&status.as_u16())
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        Duration::from_secs_f64(self.backoff_factor * f64::from(1_u32 << exponent))
    }
}

/// One outgoing request, owned so pagination can rewrite it between pages.
#[derive(Debug, Clone)]
pub(crate) struct Request {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl Request {
    pub(crate) fn get(url: impl Into<String>, query: Vec<(String, String)>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            query,
            body: None,
        }
    }

    pub(crate) fn post(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    /// Replace every occurrence of `name` with a single value.
    pub(crate) fn set_param(&mut self, name: &str, value: String) {
        self.query.retain(|(n, _)| n != name);
        self.query.push((name.to_string(), value));
    }

    /// Replace every occurrence of `name` with one repeated entry per value.
    pub(crate) fn set_repeated_param<I: IntoIterator<Item = String>>(
        &mut self,
        name: &str,
        values: I,
    ) {
        self.query.retain(|(n, _)| n != name);
        self.query
            .extend(values.into_iter().map(|v| (name.to_string(), v)));
    }
}

/// Blocking HTTP session holding the connection pool and retry policy.
#[derive(Debug)]
pub(crate) struct HttpSession {
    client: Client,
    retry: RetryPolicy,
}

impl HttpSession {
    /// Build a session authenticated with the given API token.
    pub(crate) fn new(token: &str, retry: RetryPolicy) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Token {token}"))
            .map_err(|e| ClientError::Validation(format!("invalid API token: {e}")))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .user_agent(user_agent())
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()
            .map_err(ClientError::Network)?;

        Ok(Self { client, retry })
    }

    /// Issue a request and decode the body as JSON.
    ///
    /// 401 surfaces as [`ClientError::Unauthorized`] without retry; retryable
    /// 5xx codes and transport failures are re-attempted up to the policy
    /// budget; any other non-200 becomes [`ClientError::Response`].
    pub(crate) fn execute(&self, request: &Request) -> Result<serde_json::Value> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut builder = self.client.request(request.method.clone(), &request.url);
            if !request.query.is_empty() {
                builder = builder.query(&request.query);
            }
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }
            debug!(url = %request.url, attempt, "issuing request");

            let response = match builder.send() {
                Ok(response) => response,
                Err(err) => {
                    if attempt < self.retry.max_attempts {
                        let delay = self.retry.backoff_delay(attempt);
                        warn!(url = %request.url, attempt, error = %err, "transport failure, retrying");
                        std::thread::sleep(delay);
                        continue;
                    }
                    return Err(ClientError::Network(err));
                }
            };

            let status = response.status();
            if status == StatusCode::UNAUTHORIZED {
                return Err(ClientError::Unauthorized(
                    response.text().unwrap_or_default(),
                ));
            }
            if self.retry.is_retryable(status) && attempt < self.retry.max_attempts {
                let delay = self.retry.backoff_delay(attempt);
                warn!(url = %request.url, status = status.as_u16(), attempt, "transient server failure, retrying");
                std::thread::sleep(delay);
                continue;
            }
            if status != StatusCode::OK {
                let body = response.text().unwrap_or_default();
                return Err(ClientError::Response(format!(
                    "got HTTP {status} from the server: {body}"
                )));
            }

            let bytes = response.bytes().map_err(ClientError::Network)?;
            return serde_json::from_slice(&bytes).map_err(|e| {
                ClientError::Response(format!("cannot decode server response as JSON: {e}"))
            });
        }
    }
}

/// User agent reporting the client name, version and platform.
fn user_agent() -> String {
    format!(
        "p1-client-rs/{} ({} {})",
        crate::VERSION,
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}
