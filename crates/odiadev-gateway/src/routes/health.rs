use actix_web::{web, HttpRequest, HttpResponse, ResponseError};
use odiadev::constant_time_compare;

use crate::error::GatewayError;
use crate::metrics::REGISTRY;
use crate::routes::method_not_allowed;
use crate::state::AppState;

pub const SERVICE_NAME: &str = "ODIADEV MCP Server";

/// GET / - Welcome payload
pub async fn index() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "message": "Welcome to ODIADEV - Nigeria AI Infrastructure",
        "company": "ODIADEV",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "operational",
    }))
}

/// GET /healthcheck - Service identity and subsystem configuration flags
pub async fn healthcheck(state: web::Data<AppState>) -> HttpResponse {
    let config = &state.config;
    HttpResponse::Ok().json(serde_json::json!({
        "ok": true,
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "environment": config.environment.as_str(),
        "time": chrono::Utc::now().to_rfc3339(),
        "auth_mode": config.auth_mode().as_str(),
        "env": {
            "payment_configured": config.is_payment_configured(),
            "tts_configured": config.is_tts_configured(),
            "api_keys_configured": config.are_api_keys_configured(),
        },
        "mcp": {
            "protocol": "2024-11-05",
            "capabilities": ["tools", "resources"],
            "tools": ["payment_initiate", "text_to_speech", "health_check"],
        },
    }))
}

/// GET /metrics - Prometheus metrics, bearer-token gated.
/// Disabled (403) when no METRICS_TOKEN is configured.
pub async fn metrics(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    let Some(ref expected_token) = state.config.metrics_token else {
        return HttpResponse::Forbidden().json(serde_json::json!({
            "error": "forbidden",
            "message": "Metrics endpoint is disabled"
        }));
    };

    let authorized = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|token| constant_time_compare(token, expected_token))
        .unwrap_or(false);

    if !authorized {
        return HttpResponse::Unauthorized().json(serde_json::json!({
            "error": "unauthorized",
            "message": "Valid Bearer token required for /metrics"
        }));
    }

    use prometheus::Encoder;

    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return GatewayError::Internal("failed to encode metrics".to_string()).error_response();
    }

    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(buffer)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/")
            .route(web::get().to(index))
            .default_service(web::to(method_not_allowed)),
    )
    .service(
        web::resource("/healthcheck")
            .route(web::get().to(healthcheck))
            .default_service(web::to(method_not_allowed)),
    )
    .service(
        web::resource("/metrics")
            .route(web::get().to(metrics))
            .default_service(web::to(method_not_allowed)),
    );
}
