//! Per-request admission checks: rate limiting and API-key authentication.
//!
//! Handlers call these in a fixed order: rate limit, then API key, then body
//! validation.

use actix_web::HttpRequest;
use odiadev::security::{mask_client_id, matches_any_key};
use odiadev::RateDecision;
use std::time::{Duration, Instant};

use crate::config::{AuthMode, GatewayConfig};
use crate::error::GatewayError;
use crate::metrics::record_security_event;
use crate::state::AppState;

/// Failed authentication never answers faster than this.
pub const AUTH_FAILURE_FLOOR: Duration = Duration::from_millis(10);

/// Client identifier for rate limiting: first `x-forwarded-for` entry, then
/// `x-real-ip`, then `"unknown"`. Client-supplied and spoofable.
pub fn client_key(req: &HttpRequest) -> String {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    header("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| header("x-real-ip"))
        .unwrap_or("unknown")
        .to_string()
}

pub fn check_rate_limit(req: &HttpRequest, state: &AppState) -> Result<(), GatewayError> {
    let key = client_key(req);
    match state.limiter.check(
        &key,
        state.config.rate_limit_max,
        state.config.rate_limit_window,
    ) {
        RateDecision::Allowed { .. } => Ok(()),
        RateDecision::Limited { retry_after } => {
            record_security_event("rate_limited");
            tracing::warn!(
                client = %mask_client_id(&key),
                path = %req.path(),
                retry_after,
                "rate limit exceeded"
            );
            Err(GatewayError::RateLimited { retry_after })
        }
    }
}

/// API key from the `x-api-key` header, else the `api_key` query parameter.
fn presented_key(req: &HttpRequest) -> Option<String> {
    if let Some(key) = req
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
    {
        return Some(key.to_string());
    }
    url::form_urlencoded::parse(req.query_string().as_bytes())
        .find(|(name, _)| name == "api_key")
        .map(|(_, value)| value.into_owned())
        .filter(|v| !v.is_empty())
}

pub async fn require_api_key(
    req: &HttpRequest,
    config: &GatewayConfig,
) -> Result<(), GatewayError> {
    if config.auth_mode() == AuthMode::Open {
        return Ok(());
    }

    let started = Instant::now();
    let authorized = presented_key(req)
        .map(|key| matches_any_key(&key, &config.api_keys))
        .unwrap_or(false);
    if authorized {
        return Ok(());
    }

    if let Some(remaining) = AUTH_FAILURE_FLOOR.checked_sub(started.elapsed()) {
        tokio::time::sleep(remaining).await;
    }
    record_security_event("auth_failed");
    tracing::warn!(
        client = %mask_client_id(&client_key(req)),
        path = %req.path(),
        "API key authentication failed"
    );
    Err(GatewayError::Unauthorized)
}
