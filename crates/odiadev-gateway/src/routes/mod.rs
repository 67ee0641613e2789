pub mod health;
pub mod payments;
pub mod tts;
pub mod webhook;

use actix_web::web;
use odiadev::{parse_json_body, read_body, sanitize_value, SanitizeLimits};

use crate::error::GatewayError;

/// Read a size-capped JSON body and sanitize it.
pub(crate) async fn read_sanitized_json(
    payload: web::Payload,
    max_bytes: usize,
) -> Result<serde_json::Value, GatewayError> {
    let raw = read_body(payload, max_bytes).await?;
    let value = parse_json_body(&raw)?;
    Ok(sanitize_value(&value, &SanitizeLimits::default()))
}

/// Fallback for a known path hit with an unsupported method.
pub async fn method_not_allowed() -> Result<web::Json<()>, GatewayError> {
    Err(GatewayError::MethodNotAllowed)
}

/// Register every gateway route.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.configure(health::configure)
        .configure(payments::configure)
        .configure(tts::configure)
        .configure(webhook::configure);
}
