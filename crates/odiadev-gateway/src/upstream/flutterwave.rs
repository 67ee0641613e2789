use odiadev::{RetryPolicy, Sleeper};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::{send_with_retry, UpstreamError};

const SERVICE: &str = "flutterwave";

/// Flutterwave v3 envelope: `{status, message, data}`.
#[derive(Debug, Clone, Deserialize)]
pub struct FlwResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Value,
}

/// Outcome of `POST /v3/payments`.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentLink {
    pub link: String,
    /// Flutterwave does not always return an id at link creation time.
    pub id: Option<Value>,
    pub status: String,
}

/// Outcome of `GET /v3/transactions/{id}/verify`.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedTransaction {
    pub id: Value,
    pub tx_ref: Option<String>,
    /// Transaction status as reported by Flutterwave, e.g. `successful`.
    pub status: String,
    pub amount: Option<f64>,
    pub currency: Option<String>,
}

impl VerifiedTransaction {
    pub fn is_successful(&self) -> bool {
        self.status == "successful"
    }
}

#[derive(Clone)]
pub struct FlutterwaveClient {
    http: reqwest::Client,
    base_url: String,
    secret_key: String,
    timeout: Duration,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl std::fmt::Debug for FlutterwaveClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlutterwaveClient")
            .field("base_url", &self.base_url)
            .field("secret_key", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

impl FlutterwaveClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        secret_key: impl Into<String>,
        timeout: Duration,
        retry: RetryPolicy,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
            timeout,
            retry,
            sleeper,
        }
    }

    pub fn has_secret_key(&self) -> bool {
        !self.secret_key.is_empty()
    }

    /// Create a hosted payment link. `payload` is the full `/v3/payments` body.
    pub async fn create_payment(&self, payload: &Value) -> Result<PaymentLink, UpstreamError> {
        let url = format!("{}/v3/payments", self.base_url);
        let envelope = self
            .call(|| self.http.post(&url).bearer_auth(&self.secret_key).json(payload))
            .await?;

        let link = envelope
            .data
            .get("link")
            .and_then(Value::as_str)
            .filter(|l| !l.is_empty())
            .ok_or_else(|| UpstreamError::InvalidResponse {
                service: SERVICE,
                message: envelope
                    .message
                    .clone()
                    .unwrap_or_else(|| "no payment link in response".to_string()),
            })?;

        Ok(PaymentLink {
            link: link.to_string(),
            id: envelope.data.get("id").filter(|v| !v.is_null()).cloned(),
            status: envelope.status.clone(),
        })
    }

    /// Look a transaction up by its Flutterwave id.
    pub async fn verify_transaction(
        &self,
        id: &str,
    ) -> Result<VerifiedTransaction, UpstreamError> {
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(UpstreamError::InvalidResponse {
                service: SERVICE,
                message: "transaction id must be alphanumeric".to_string(),
            });
        }
        let url = format!("{}/v3/transactions/{}/verify", self.base_url, id);
        let envelope = self
            .call(|| self.http.get(&url).bearer_auth(&self.secret_key))
            .await?;

        let data = &envelope.data;
        Ok(VerifiedTransaction {
            id: data.get("id").cloned().unwrap_or_else(|| Value::from(id)),
            tx_ref: data.get("tx_ref").and_then(Value::as_str).map(String::from),
            status: data
                .get("status")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
            amount: data.get("amount").and_then(Value::as_f64),
            currency: data.get("currency").and_then(Value::as_str).map(String::from),
        })
    }

    async fn call<B>(&self, build: B) -> Result<FlwResponse, UpstreamError>
    where
        B: Fn() -> reqwest::RequestBuilder,
    {
        let body = send_with_retry(
            SERVICE,
            &self.retry,
            self.sleeper.as_ref(),
            self.timeout,
            build,
        )
        .await?;
        let envelope: FlwResponse =
            serde_json::from_slice(&body).map_err(|e| UpstreamError::InvalidResponse {
                service: SERVICE,
                message: e.to_string(),
            })?;

        if envelope.status != "success" {
            return Err(UpstreamError::InvalidResponse {
                service: SERVICE,
                message: envelope
                    .message
                    .unwrap_or_else(|| format!("status {}", envelope.status)),
            });
        }
        Ok(envelope)
    }
}
