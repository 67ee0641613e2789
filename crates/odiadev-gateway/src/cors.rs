//! CORS and security headers for every gateway response.
//!
//! Applied as a `from_fn` middleware around the whole app so error responses
//! produced by handlers carry the same headers as successful ones. OPTIONS
//! requests are answered here with 204 and never reach a handler.

use actix_web::body::{BoxBody, MessageBody};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::http::header::{self, HeaderMap, HeaderValue};
use actix_web::http::Method;
use actix_web::middleware::Next;
use actix_web::{web, HttpResponse};

use crate::state::AppState;

pub const ALLOW_METHODS: &str = "GET, POST, OPTIONS";
pub const ALLOW_HEADERS: &str =
    "Content-Type, x-api-key, Authorization, verif-hash, flutterwave-signature";
pub const MAX_AGE_SECS: &str = "86400";

/// Write CORS and security headers. With no configured origin the
/// `Access-Control-Allow-Origin` header is omitted, which browsers treat as
/// deny.
pub fn apply_cors_headers(headers: &mut HeaderMap, allow_origin: Option<&str>) {
    if let Some(value) = allow_origin.and_then(|o| HeaderValue::from_str(o).ok()) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
    }
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static(MAX_AGE_SECS),
    );
    headers.insert(header::VARY, HeaderValue::from_static("Origin"));

    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("no-referrer"),
    );
}

/// Short-circuit preflight requests. Returns `Some(204)` for OPTIONS.
pub fn handle_preflight(method: &Method, allow_origin: Option<&str>) -> Option<HttpResponse> {
    if *method != Method::OPTIONS {
        return None;
    }
    let mut res = HttpResponse::NoContent().finish();
    apply_cors_headers(res.headers_mut(), allow_origin);
    Some(res)
}

pub async fn cors_middleware(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<BoxBody>, actix_web::Error> {
    let allow_origin = req
        .app_data::<web::Data<AppState>>()
        .and_then(|state| state.config.cors_allow_origin.clone());

    if let Some(preflight) = handle_preflight(req.method(), allow_origin.as_deref()) {
        return Ok(req.into_response(preflight));
    }

    let mut res = next.call(req).await?.map_into_boxed_body();
    apply_cors_headers(res.headers_mut(), allow_origin.as_deref());
    Ok(res)
}
