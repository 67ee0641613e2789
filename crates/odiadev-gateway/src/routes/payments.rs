use actix_web::{web, HttpRequest, HttpResponse};
use odiadev::validation::{validate_currency, validate_input};
use odiadev::{AmountBounds, InputKind};
use serde_json::{json, Map, Number, Value};

use crate::error::GatewayError;
use crate::guard::{check_rate_limit, require_api_key};
use crate::metrics::PAYMENTS_TOTAL;
use crate::routes::{method_not_allowed, read_sanitized_json};
use crate::state::AppState;

const DEFAULT_CURRENCY: &str = "NGN";
const DEFAULT_TITLE: &str = "ODIADEV Payment";
const DEFAULT_DESCRIPTION: &str = "Payment via ODIADEV";
const PAYMENT_SOURCE: &str = "mcp_server";

#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
}

/// Validated body of `POST /payments/initiate`.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequest {
    /// Kept as the caller's JSON number so integers are forwarded as integers.
    pub amount: Number,
    pub currency: String,
    pub tx_ref: String,
    pub customer: Customer,
    pub redirect_url: Option<String>,
    pub title: String,
    pub description: String,
    pub meta: Map<String, Value>,
}

impl PaymentRequest {
    pub fn from_json(body: &Value) -> Result<Self, GatewayError> {
        let currency = match body.get("currency") {
            None | Some(Value::Null) => DEFAULT_CURRENCY.to_string(),
            Some(Value::String(c)) => c.trim().to_ascii_uppercase(),
            Some(_) => return Err(GatewayError::validation("currency", "must be a string")),
        };
        validate_currency(&currency).into_result("currency")?;

        let amount_value = body.get("amount").unwrap_or(&Value::Null);
        validate_input(
            amount_value,
            InputKind::Amount {
                currency: &currency,
                bounds: AmountBounds::default(),
            },
        )
        .into_result("amount")?;
        let amount = match amount_value {
            Value::Number(n) => n.clone(),
            _ => return Err(GatewayError::validation("amount", "amount must be a number")),
        };

        let tx_ref_value = body.get("tx_ref").unwrap_or(&Value::Null);
        validate_input(
            tx_ref_value,
            InputKind::Text {
                min_len: 6,
                max_len: 50,
            },
        )
        .into_result("tx_ref")?;

        let customer = body
            .get("customer")
            .and_then(Value::as_object)
            .ok_or_else(|| GatewayError::validation("customer", "customer object is required"))?;
        let email = customer.get("email").unwrap_or(&Value::Null);
        validate_input(email, InputKind::Email).into_result("customer.email")?;
        let name = customer.get("name").unwrap_or(&Value::Null);
        validate_input(
            name,
            InputKind::Text {
                min_len: 2,
                max_len: 100,
            },
        )
        .into_result("customer.name")?;
        let phone = match customer.get("phone") {
            None | Some(Value::Null) => None,
            Some(p) => {
                validate_input(p, InputKind::Phone).into_result("customer.phone")?;
                p.as_str().map(String::from)
            }
        };

        let redirect_url = match body.get("redirect_url") {
            None | Some(Value::Null) => None,
            Some(Value::String(u)) if is_http_url(u) => Some(u.clone()),
            Some(_) => {
                return Err(GatewayError::validation(
                    "redirect_url",
                    "must be an http(s) URL",
                ))
            }
        };

        let meta = match body.get("meta") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(m)) => m.clone(),
            Some(_) => return Err(GatewayError::validation("meta", "must be an object")),
        };

        Ok(Self {
            amount,
            currency,
            tx_ref: tx_ref_value.as_str().unwrap_or_default().to_string(),
            customer: Customer {
                email: email.as_str().unwrap_or_default().to_string(),
                name: name.as_str().unwrap_or_default().to_string(),
                phone,
            },
            redirect_url,
            title: optional_text(body, "title").unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            description: optional_text(body, "description")
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
            meta,
        })
    }

    /// Body for Flutterwave `POST /v3/payments`.
    pub fn to_flutterwave_payload(&self, now: chrono::DateTime<chrono::Utc>) -> Value {
        let mut meta = self.meta.clone();
        meta.insert("source".to_string(), json!(PAYMENT_SOURCE));
        meta.insert("timestamp".to_string(), json!(now.to_rfc3339()));

        let mut customer = json!({
            "email": self.customer.email,
            "name": self.customer.name,
        });
        if let Some(ref phone) = self.customer.phone {
            customer["phonenumber"] = json!(phone);
        }

        let mut payload = json!({
            "amount": self.amount,
            "currency": self.currency,
            "tx_ref": self.tx_ref,
            "customer": customer,
            "customizations": {
                "title": self.title,
                "description": self.description,
            },
            "meta": meta,
        });
        if let Some(ref url) = self.redirect_url {
            payload["redirect_url"] = json!(url);
        }
        payload
    }
}

fn is_http_url(raw: &str) -> bool {
    url::Url::parse(raw)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}

fn optional_text(body: &Value, field: &str) -> Option<String> {
    body.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// POST /payments/initiate - Create a Flutterwave hosted payment link
pub async fn initiate(
    req: HttpRequest,
    payload: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse, GatewayError> {
    check_rate_limit(&req, &state)?;
    require_api_key(&req, &state.config).await?;

    if !state.flutterwave.has_secret_key() {
        return Err(GatewayError::Configuration("FLW_SECRET_KEY".to_string()));
    }

    let body = read_sanitized_json(payload, state.config.max_request_size).await?;
    let request = PaymentRequest::from_json(&body)?;
    let upstream_body = request.to_flutterwave_payload(chrono::Utc::now());

    let link = match state.flutterwave.create_payment(&upstream_body).await {
        Ok(link) => link,
        Err(e) => {
            PAYMENTS_TOTAL.with_label_values(&["failed"]).inc();
            tracing::warn!(tx_ref = %request.tx_ref, error = %e, "payment initiation failed");
            return Err(e.into());
        }
    };

    PAYMENTS_TOTAL.with_label_values(&["initiated"]).inc();
    tracing::info!(
        tx_ref = %request.tx_ref,
        currency = %request.currency,
        "payment link created"
    );

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "payment_link": link.link,
        "transaction_id": link.id,
        "reference": request.tx_ref,
        "amount": request.amount,
        "currency": request.currency,
        "status": "pending",
    })))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/payments/initiate")
            .route(web::post().to(initiate))
            .default_service(web::to(method_not_allowed)),
    );
}
