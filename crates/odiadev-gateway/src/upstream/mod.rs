//! HTTP clients for the services the gateway fronts.
//!
//! Every attempt (send plus body read) is bounded by `tokio::time::timeout`
//! on top of the reqwest client timeout. Transport failures, timeouts and 5xx responses are retried
//! through [`odiadev::with_retry`]; 4xx responses are returned on the first
//! attempt.

pub mod flutterwave;
pub mod tts;

use odiadev::{with_retry, RetryPolicy, Sleeper};
use std::time::{Duration, Instant};

use crate::metrics::UPSTREAM_LATENCY;

/// Maximum upstream response body size (10 MB).
pub const MAX_RESPONSE_BODY_SIZE: usize = 10 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("{service} request failed: {message}")]
    Transport {
        service: &'static str,
        message: String,
    },

    #[error("{service} timed out after {timeout_ms} ms")]
    Timeout {
        service: &'static str,
        timeout_ms: u64,
    },

    #[error("{service} returned HTTP {status}: {message}")]
    Status {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("{service} returned an invalid response: {message}")]
    InvalidResponse {
        service: &'static str,
        message: String,
    },
}

impl UpstreamError {
    pub fn is_retryable(&self) -> bool {
        match self {
            UpstreamError::Transport { .. } | UpstreamError::Timeout { .. } => true,
            UpstreamError::Status { status, .. } => *status >= 500,
            UpstreamError::InvalidResponse { .. } => false,
        }
    }
}

/// Build a reqwest client that never follows redirects.
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::none()) // Prevent SSRF via redirects
        .build()
}

/// Send the request produced by `build` and read its body, retrying per
/// `policy`.
///
/// One `timeout` covers the whole attempt, headers and body. Error statuses
/// are turned into [`UpstreamError::Status`] with the upstream `message`
/// field when the body is JSON.
pub(crate) async fn send_with_retry<B>(
    service: &'static str,
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    timeout: Duration,
    build: B,
) -> Result<bytes::Bytes, UpstreamError>
where
    B: Fn() -> reqwest::RequestBuilder,
{
    let started = Instant::now();
    let result = with_retry(policy, sleeper, UpstreamError::is_retryable, |attempt| {
        let request = build();
        async move {
            tracing::debug!(service, attempt, "calling upstream");
            let attempt_started = Instant::now();
            match tokio::time::timeout(timeout, exchange(service, request)).await {
                Err(_) => Err(timed_out(service, timeout)),
                // reqwest's own deadline can fire first, on send or mid-body.
                Ok(Err(AttemptError::Reqwest(e)))
                    if e.is_timeout() || attempt_started.elapsed() >= timeout =>
                {
                    Err(timed_out(service, timeout))
                }
                Ok(Err(AttemptError::Reqwest(e))) => Err(UpstreamError::Transport {
                    service,
                    message: e.without_url().to_string(),
                }),
                Ok(Err(AttemptError::Upstream(e))) => Err(e),
                Ok(Ok(body)) => Ok(body),
            }
        }
    })
    .await;

    UPSTREAM_LATENCY
        .with_label_values(&[service])
        .observe(started.elapsed().as_secs_f64());
    result
}

fn timed_out(service: &'static str, timeout: Duration) -> UpstreamError {
    UpstreamError::Timeout {
        service,
        timeout_ms: timeout.as_millis() as u64,
    }
}

enum AttemptError {
    Reqwest(reqwest::Error),
    Upstream(UpstreamError),
}

impl From<reqwest::Error> for AttemptError {
    fn from(e: reqwest::Error) -> Self {
        AttemptError::Reqwest(e)
    }
}

impl From<UpstreamError> for AttemptError {
    fn from(e: UpstreamError) -> Self {
        AttemptError::Upstream(e)
    }
}

/// One request/response exchange: send, check status, read the capped body.
async fn exchange(
    service: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<bytes::Bytes, AttemptError> {
    let response = request.send().await?;
    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        let body = read_capped(service, response).await.unwrap_or_default();
        let body = String::from_utf8_lossy(&body);
        return Err(UpstreamError::Status {
            service,
            status: status.as_u16(),
            message: upstream_message(&body)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string()),
        }
        .into());
    }
    read_capped(service, response).await
}

/// Read a response body, aborting once it exceeds [`MAX_RESPONSE_BODY_SIZE`].
async fn read_capped(
    service: &'static str,
    mut response: reqwest::Response,
) -> Result<bytes::Bytes, AttemptError> {
    if let Some(cl) = response.content_length() {
        if cl > MAX_RESPONSE_BODY_SIZE as u64 {
            return Err(UpstreamError::InvalidResponse {
                service,
                message: format!("response too large: {cl} bytes"),
            }
            .into());
        }
    }

    let mut buf = Vec::with_capacity(
        response
            .content_length()
            .map(|cl| cl as usize)
            .unwrap_or(8192)
            .min(MAX_RESPONSE_BODY_SIZE),
    );
    while let Some(chunk) = response.chunk().await? {
        if buf.len() + chunk.len() > MAX_RESPONSE_BODY_SIZE {
            return Err(UpstreamError::InvalidResponse {
                service,
                message: format!("response exceeds {MAX_RESPONSE_BODY_SIZE} bytes"),
            }
            .into());
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(bytes::Bytes::from(buf))
}

fn upstream_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .or_else(|| value.get("error"))
        .and_then(|m| m.as_str())
        .map(String::from)
}
