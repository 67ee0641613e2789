use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use odiadev::{redact_secrets, BodyError, OdiadevError};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::upstream::UpstreamError;

const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred";

static EXPOSE_INTERNAL_DETAILS: AtomicBool = AtomicBool::new(false);

/// Return `Internal` error detail to callers. Set once at startup, only
/// outside production.
pub fn expose_internal_details(enabled: bool) {
    EXPOSE_INTERNAL_DETAILS.store(enabled, Ordering::Relaxed);
}

fn internal_message(detail: &str, expose: bool) -> String {
    if expose {
        redact_secrets(detail)
    } else {
        INTERNAL_ERROR_MESSAGE.to_string()
    }
}

#[derive(Debug)]
pub enum GatewayError {
    /// A request field failed validation
    Validation { field: String, message: String },
    /// Body is not valid JSON
    InvalidJson(String),
    /// Body exceeds the configured size cap
    PayloadTooLarge { limit: usize },
    /// Missing or unknown API key
    Unauthorized,
    /// Webhook signature mismatch
    InvalidSignature,
    /// Client exceeded its rate limit
    RateLimited { retry_after: u64 },
    /// Upstream answered with an error or garbage
    Upstream {
        service: &'static str,
        status: Option<u16>,
        message: String,
    },
    /// Upstream did not answer in time
    Timeout { service: &'static str },
    /// Server is missing required configuration
    Configuration(String),
    MethodNotAllowed,
    /// Internal error
    Internal(String),
}

impl GatewayError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        GatewayError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Machine-readable `error` code used in response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::Validation { .. } => "validation_error",
            GatewayError::InvalidJson(_) => "invalid_json",
            GatewayError::PayloadTooLarge { .. } => "payload_too_large",
            GatewayError::Unauthorized => "unauthorized",
            GatewayError::InvalidSignature => "invalid_signature",
            GatewayError::RateLimited { .. } => "rate_limited",
            GatewayError::Upstream { .. } => "upstream_error",
            GatewayError::Timeout { .. } => "timeout",
            GatewayError::Configuration(_) => "configuration_error",
            GatewayError::MethodNotAllowed => "method_not_allowed",
            GatewayError::Internal(_) => "internal_error",
        }
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::Validation { field, message } => write!(f, "{}: {}", field, message),
            GatewayError::InvalidJson(msg) => write!(f, "invalid JSON body: {}", msg),
            GatewayError::PayloadTooLarge { limit } => {
                write!(f, "request body exceeds {} bytes", limit)
            }
            GatewayError::Unauthorized => write!(f, "invalid or missing API key"),
            GatewayError::InvalidSignature => write!(f, "invalid webhook signature"),
            GatewayError::RateLimited { retry_after } => {
                write!(f, "rate limit exceeded, retry after {}s", retry_after)
            }
            GatewayError::Upstream {
                service, message, ..
            } => write!(f, "{} error: {}", service, message),
            GatewayError::Timeout { service } => write!(f, "{} request timed out", service),
            GatewayError::Configuration(what) => write!(f, "{} not configured", what),
            GatewayError::MethodNotAllowed => write!(f, "method not allowed"),
            GatewayError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for GatewayError {}

impl From<BodyError> for GatewayError {
    fn from(e: BodyError) -> Self {
        match e {
            BodyError::TooLarge { limit } => GatewayError::PayloadTooLarge { limit },
            BodyError::InvalidJson(msg) => GatewayError::InvalidJson(msg),
            BodyError::Read(msg) => GatewayError::Internal(format!("body read failed: {msg}")),
        }
    }
}

impl From<OdiadevError> for GatewayError {
    fn from(e: OdiadevError) -> Self {
        match e {
            OdiadevError::Validation { field, message, .. } => {
                GatewayError::Validation { field, message }
            }
            OdiadevError::InvalidSignature => GatewayError::InvalidSignature,
        }
    }
}

impl From<UpstreamError> for GatewayError {
    fn from(e: UpstreamError) -> Self {
        match e {
            UpstreamError::Timeout { service, .. } => GatewayError::Timeout { service },
            UpstreamError::Status {
                service,
                status,
                message,
            } => GatewayError::Upstream {
                service,
                status: Some(status),
                message,
            },
            UpstreamError::Transport { service, message }
            | UpstreamError::InvalidResponse { service, message } => GatewayError::Upstream {
                service,
                status: None,
                message,
            },
        }
    }
}

impl ResponseError for GatewayError {
    fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Validation { .. } | GatewayError::InvalidJson(_) => {
                StatusCode::BAD_REQUEST
            }
            GatewayError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            GatewayError::Unauthorized | GatewayError::InvalidSignature => {
                StatusCode::UNAUTHORIZED
            }
            GatewayError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::Timeout { .. } => StatusCode::REQUEST_TIMEOUT,
            GatewayError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::Configuration(_) | GatewayError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut body = serde_json::json!({
            "error": self.code(),
            "message": redact_secrets(&self.to_string()),
        });

        match self {
            GatewayError::Validation { field, .. } => {
                body["field"] = serde_json::json!(field);
            }
            GatewayError::RateLimited { retry_after } => {
                body["retry_after"] = serde_json::json!(retry_after);
            }
            GatewayError::Upstream {
                service, status, ..
            } => {
                tracing::error!(service, status, error = %redact_secrets(&self.to_string()), "upstream error");
                body["service"] = serde_json::json!(service);
                if let Some(status) = status {
                    body["upstream_status"] = serde_json::json!(status);
                }
            }
            GatewayError::Timeout { service } => {
                tracing::warn!(service, "upstream timed out");
                body["service"] = serde_json::json!(service);
            }
            GatewayError::Configuration(what) => {
                tracing::error!("configuration error: {} not configured", what);
                body["message"] = serde_json::json!("Server configuration error");
            }
            GatewayError::Internal(msg) => {
                tracing::error!("Internal error: {}", redact_secrets(msg));
                body["message"] = serde_json::json!(internal_message(
                    msg,
                    EXPOSE_INTERNAL_DETAILS.load(Ordering::Relaxed)
                ));
            }
            _ => {}
        }

        let mut builder = HttpResponse::build(self.status_code());
        if let GatewayError::RateLimited { retry_after } = self {
            builder.insert_header(("Retry-After", retry_after.to_string()));
        }
        builder.json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    async fn body_json(err: GatewayError) -> (u16, serde_json::Value) {
        let resp = err.error_response();
        let status = resp.status().as_u16();
        let bytes = to_bytes(resp.into_body()).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[actix_rt::test]
    async fn test_status_and_codes() {
        let cases = [
            (GatewayError::validation("amount", "too small"), 400, "validation_error"),
            (GatewayError::InvalidJson("eof".into()), 400, "invalid_json"),
            (GatewayError::PayloadTooLarge { limit: 10 }, 413, "payload_too_large"),
            (GatewayError::Unauthorized, 401, "unauthorized"),
            (GatewayError::InvalidSignature, 401, "invalid_signature"),
            (GatewayError::RateLimited { retry_after: 5 }, 429, "rate_limited"),
            (
                GatewayError::Upstream {
                    service: "tts",
                    status: Some(503),
                    message: "down".into(),
                },
                502,
                "upstream_error",
            ),
            (GatewayError::Timeout { service: "tts" }, 408, "timeout"),
            (
                GatewayError::Configuration("FLW_SECRET_KEY".into()),
                500,
                "configuration_error",
            ),
            (GatewayError::MethodNotAllowed, 405, "method_not_allowed"),
            (GatewayError::Internal("boom".into()), 500, "internal_error"),
        ];
        for (err, status, code) in cases {
            let (got_status, body) = body_json(err).await;
            assert_eq!(got_status, status);
            assert_eq!(body["error"], code);
        }
    }

    #[actix_rt::test]
    async fn test_rate_limited_sets_retry_after() {
        let resp = GatewayError::RateLimited { retry_after: 42 }.error_response();
        assert_eq!(resp.headers().get("Retry-After").unwrap(), "42");
        let (_, body) = body_json(GatewayError::RateLimited { retry_after: 42 }).await;
        assert_eq!(body["retry_after"], 42);
    }

    #[actix_rt::test]
    async fn test_internal_details_are_hidden() {
        let (_, body) = body_json(GatewayError::Internal("db password=hunter2".into())).await;
        assert_eq!(body["message"], "An internal error occurred");
    }

    #[test]
    fn test_internal_message_in_development() {
        assert_eq!(
            internal_message("pool exhausted", true),
            "pool exhausted"
        );
        assert_eq!(
            internal_message("token sk_live_abc", true),
            "token [REDACTED]"
        );
        assert_eq!(internal_message("pool exhausted", false), INTERNAL_ERROR_MESSAGE);
    }

    #[actix_rt::test]
    async fn test_messages_are_redacted() {
        let (_, body) = body_json(GatewayError::Upstream {
            service: "flutterwave",
            status: Some(401),
            message: "bad key FLWSECK_TEST-abc123".into(),
        })
        .await;
        let message = body["message"].as_str().unwrap();
        assert!(!message.contains("abc123"));
        assert!(message.contains("[REDACTED]"));
        assert_eq!(body["upstream_status"], 401);
    }

    #[actix_rt::test]
    async fn test_validation_carries_field() {
        let (_, body) =
            body_json(GatewayError::validation("customer.email", "invalid email format")).await;
        assert_eq!(body["field"], "customer.email");
    }

    #[test]
    fn test_utility_errors_convert() {
        let err: GatewayError = OdiadevError::Validation {
            field: "amount".into(),
            code: "too_small",
            message: "must be at least 100".into(),
        }
        .into();
        assert!(matches!(err, GatewayError::Validation { ref field, .. } if field == "amount"));

        let err: GatewayError = OdiadevError::InvalidSignature.into();
        assert!(matches!(err, GatewayError::InvalidSignature));

        let err: GatewayError = BodyError::TooLarge { limit: 64 }.into();
        assert!(matches!(err, GatewayError::PayloadTooLarge { limit: 64 }));
    }
}
