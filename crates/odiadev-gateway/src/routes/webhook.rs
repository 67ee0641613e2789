use actix_web::{web, HttpRequest, HttpResponse};
use odiadev::hmac::verify_webhook;
use odiadev::{parse_json_body, read_body, sanitize_value, SanitizeLimits};
use serde_json::{json, Value};

use crate::error::GatewayError;
use crate::guard::check_rate_limit;
use crate::metrics::{record_security_event, WEBHOOK_EVENTS_TOTAL};
use crate::routes::method_not_allowed;
use crate::state::AppState;

/// Flutterwave webhook event types the gateway knows about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    ChargeCompleted,
    TransferCompleted,
    SubscriptionCancelled,
    /// Acknowledged and logged, nothing else.
    Unhandled(String),
}

impl WebhookEvent {
    pub fn parse(name: &str) -> Self {
        match name {
            "charge.completed" => WebhookEvent::ChargeCompleted,
            "transfer.completed" => WebhookEvent::TransferCompleted,
            "subscription.cancelled" => WebhookEvent::SubscriptionCancelled,
            other => WebhookEvent::Unhandled(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            WebhookEvent::ChargeCompleted => "charge.completed",
            WebhookEvent::TransferCompleted => "transfer.completed",
            WebhookEvent::SubscriptionCancelled => "subscription.cancelled",
            WebhookEvent::Unhandled(name) => name,
        }
    }

    /// Bounded label for metrics.
    fn metric_label(&self) -> &'static str {
        match self {
            WebhookEvent::ChargeCompleted => "charge.completed",
            WebhookEvent::TransferCompleted => "transfer.completed",
            WebhookEvent::SubscriptionCancelled => "subscription.cancelled",
            WebhookEvent::Unhandled(_) => "unhandled",
        }
    }
}

/// Result of re-checking a charge against the transactions API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Verified,
    Failed,
    Skipped,
}

impl Verification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verification::Verified => "verified",
            Verification::Failed => "failed",
            Verification::Skipped => "skipped",
        }
    }
}

fn id_string(id: &Value) -> Option<String> {
    match id {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

async fn verify_charge(state: &AppState, data: &Value) -> Verification {
    if !state.config.verify_webhook_transactions || !state.webhook_verifier.has_secret_key() {
        return Verification::Skipped;
    }
    let Some(id) = data.get("id").and_then(id_string) else {
        return Verification::Skipped;
    };

    // Single attempt, bounded by FLW_WEBHOOK_VERIFY_TIMEOUT_MS.
    match state.webhook_verifier.verify_transaction(&id).await {
        Ok(tx) => {
            let reference = data.get("tx_ref").and_then(Value::as_str);
            let reference_matches = match (reference, tx.tx_ref.as_deref()) {
                (Some(expected), Some(actual)) => expected == actual,
                _ => true,
            };
            if tx.is_successful() && reference_matches {
                Verification::Verified
            } else {
                tracing::warn!(
                    transaction_id = %id,
                    status = %tx.status,
                    reference_matches,
                    "webhook charge did not verify"
                );
                Verification::Failed
            }
        }
        Err(e) => {
            tracing::warn!(transaction_id = %id, error = %e, "transaction verification failed");
            Verification::Failed
        }
    }
}

/// POST /webhook/flutterwave - Receive payment gateway callbacks
///
/// Authenticated by the `verif-hash` header (and `flutterwave-signature` when
/// sent) rather than an API key. Accepted events are always acknowledged with
/// 200 so Flutterwave does not retry; verification outcome is reported in the
/// body.
pub async fn flutterwave(
    req: HttpRequest,
    payload: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse, GatewayError> {
    check_rate_limit(&req, &state)?;

    let secret_hash = &state.config.flw_webhook_hash;
    if secret_hash.is_empty() {
        return Err(GatewayError::Configuration(
            "FLW_WEBHOOK_SECRET_HASH".to_string(),
        ));
    }

    let raw = read_body(payload, state.config.max_request_size).await?;
    let header = |name: &str| req.headers().get(name).and_then(|v| v.to_str().ok());
    if let Err(e) = verify_webhook(
        secret_hash,
        header("verif-hash"),
        header("flutterwave-signature"),
        &raw,
    ) {
        record_security_event("invalid_webhook_signature");
        tracing::warn!(path = %req.path(), "rejected webhook with invalid signature");
        return Err(e.into());
    }

    let body = sanitize_value(&parse_json_body(&raw)?, &SanitizeLimits::default());
    let event = WebhookEvent::parse(body.get("event").and_then(Value::as_str).unwrap_or(""));
    let data = body.get("data").cloned().unwrap_or(Value::Null);
    let transaction_id = data.get("id").cloned().unwrap_or(Value::Null);
    let reference = data.get("tx_ref").cloned().unwrap_or(Value::Null);

    WEBHOOK_EVENTS_TOTAL
        .with_label_values(&[event.metric_label()])
        .inc();

    let verification = match event {
        WebhookEvent::ChargeCompleted => verify_charge(&state, &data).await,
        WebhookEvent::TransferCompleted | WebhookEvent::SubscriptionCancelled => {
            Verification::Skipped
        }
        WebhookEvent::Unhandled(ref name) => {
            tracing::info!(event = %name, "unhandled webhook event acknowledged");
            Verification::Skipped
        }
    };

    tracing::info!(
        event = event.as_str(),
        transaction_id = %transaction_id,
        reference = %reference,
        status = data.get("status").and_then(serde_json::Value::as_str).unwrap_or("unknown"),
        verification = verification.as_str(),
        "webhook processed"
    );

    Ok(HttpResponse::Ok().json(json!({
        "received": true,
        "event": event.as_str(),
        "transaction_id": transaction_id,
        "reference": reference,
        "verification": verification.as_str(),
        "processed_at": chrono::Utc::now().to_rfc3339(),
    })))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/webhook/flutterwave")
            .route(web::post().to(flutterwave))
            .default_service(web::to(method_not_allowed)),
    );
}
