use odiadev::constants::MIN_API_KEY_LEN;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::upstream::tts::Voice;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_FLW_API_BASE_URL: &str = "https://api.flutterwave.com";
const DEFAULT_TTS_BASE_URL: &str = "https://odiadev-tts-plug-n-play.onrender.com/speak";
const DEFAULT_TTS_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_TTS_MAX_TEXT_LENGTH: usize = 500;
const DEFAULT_RATE_LIMIT_MAX: u32 = 100;
const DEFAULT_RATE_LIMIT_WINDOW_MS: u64 = 60_000;
const DEFAULT_MAX_REQUEST_SIZE: usize = 50 * 1024;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_WEBHOOK_VERIFY_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_LOG_LEVEL: &str = "info";
const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Minimum length of the webhook secret hash for payments to count as configured.
const MIN_WEBHOOK_HASH_LEN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

/// What to do when [`GatewayConfig::check`] reports errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupPolicy {
    /// Log the problems and start anyway.
    Warn,
    /// Refuse to start.
    FailFast,
}

/// Whether API keys are checked at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// No keys configured: every request is let through.
    Open,
    Enforced,
}

impl AuthMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMode::Open => "open",
            AuthMode::Enforced => "enforced",
        }
    }
}

#[derive(Clone)]
pub struct GatewayConfig {
    /// Server port
    pub port: u16,
    pub environment: Environment,
    /// Single allowed CORS origin (None = no Allow-Origin header, browsers deny)
    pub cors_allow_origin: Option<String>,
    /// API key allow-list, each at least 8 characters
    pub api_keys: Vec<String>,
    pub flw_secret_key: String,
    pub flw_public_key: String,
    pub flw_encryption_key: String,
    /// Shared secret Flutterwave echoes in the `verif-hash` header
    pub flw_webhook_hash: String,
    pub flw_api_base_url: String,
    /// Re-verify `charge.completed` events against the transactions API
    pub verify_webhook_transactions: bool,
    /// Single-attempt bound on that re-verification
    pub webhook_verify_timeout: Duration,
    pub tts_base_url: String,
    pub tts_default_voice: Voice,
    pub tts_timeout: Duration,
    /// Maximum TTS text length in characters
    pub tts_max_text_length: usize,
    pub rate_limit_max: u32,
    pub rate_limit_window: Duration,
    /// Maximum accepted request body size in bytes
    pub max_request_size: usize,
    /// Timeout for each payment gateway call
    pub request_timeout: Duration,
    pub retry_max_attempts: u32,
    pub log_level: String,
    pub startup_policy: StartupPolicy,
    /// Bearer token required for /metrics (None = /metrics disabled)
    pub metrics_token: Option<String>,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |s: &str| if s.is_empty() { "" } else { "[REDACTED]" };
        f.debug_struct("GatewayConfig")
            .field("port", &self.port)
            .field("environment", &self.environment)
            .field("cors_allow_origin", &self.cors_allow_origin)
            .field("api_keys", &format!("[{} keys]", self.api_keys.len()))
            .field("flw_secret_key", &redact(&self.flw_secret_key))
            .field("flw_public_key", &redact(&self.flw_public_key))
            .field("flw_encryption_key", &redact(&self.flw_encryption_key))
            .field("flw_webhook_hash", &redact(&self.flw_webhook_hash))
            .field("flw_api_base_url", &self.flw_api_base_url)
            .field(
                "verify_webhook_transactions",
                &self.verify_webhook_transactions,
            )
            .field("webhook_verify_timeout", &self.webhook_verify_timeout)
            .field("tts_base_url", &self.tts_base_url)
            .field("tts_default_voice", &self.tts_default_voice)
            .field("tts_timeout", &self.tts_timeout)
            .field("tts_max_text_length", &self.tts_max_text_length)
            .field("rate_limit_max", &self.rate_limit_max)
            .field("rate_limit_window", &self.rate_limit_window)
            .field("max_request_size", &self.max_request_size)
            .field("request_timeout", &self.request_timeout)
            .field("retry_max_attempts", &self.retry_max_attempts)
            .field("log_level", &self.log_level)
            .field("startup_policy", &self.startup_policy)
            .field(
                "metrics_token",
                &self.metrics_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Problems found by [`GatewayConfig::check`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ConfigReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary variable source. Never fails:
    /// missing values take defaults, unparseable numbers fall back with a
    /// warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let get_either = |primary: &str, fallback: &str| {
            get(primary).or_else(|| get(fallback)).unwrap_or_default()
        };

        let environment = match get("APP_ENV").or_else(|| get("NODE_ENV")).as_deref() {
            Some("production") => Environment::Production,
            _ => Environment::Development,
        };

        let api_keys = get("VALID_API_KEYS")
            .map(|raw| parse_api_keys(&raw))
            .unwrap_or_default();

        let tts_default_voice = match get("ODIA_TTS_DEFAULT_VOICE") {
            Some(raw) => Voice::from_str(&raw).unwrap_or_else(|_| {
                tracing::warn!(
                    value = %raw,
                    "ODIA_TTS_DEFAULT_VOICE is not a known voice, using {}",
                    Voice::default().as_str()
                );
                Voice::default()
            }),
            None => Voice::default(),
        };

        let startup_policy = match get("STARTUP_POLICY").as_deref() {
            Some("fail-fast") => StartupPolicy::FailFast,
            Some("warn") => StartupPolicy::Warn,
            other => {
                if let Some(v) = other {
                    tracing::warn!(value = %v, "unknown STARTUP_POLICY, using environment default");
                }
                match environment {
                    Environment::Production => StartupPolicy::FailFast,
                    Environment::Development => StartupPolicy::Warn,
                }
            }
        };

        let verify_webhook_transactions = get("FLW_VERIFY_WEBHOOK_TRANSACTIONS")
            .map(|v| !matches!(v.to_ascii_lowercase().as_str(), "false" | "0" | "no"))
            .unwrap_or(true);

        let log_level = match get("LOG_LEVEL").map(|v| v.to_ascii_lowercase()) {
            Some(level) if LOG_LEVELS.contains(&level.as_str()) => level,
            Some(other) => {
                tracing::warn!(value = %other, "unknown LOG_LEVEL, using {DEFAULT_LOG_LEVEL}");
                DEFAULT_LOG_LEVEL.to_string()
            }
            None => DEFAULT_LOG_LEVEL.to_string(),
        };

        Self {
            port: parse_or(&get, "PORT", DEFAULT_PORT),
            environment,
            cors_allow_origin: get("CORS_ALLOW_ORIGIN"),
            api_keys,
            flw_secret_key: get_either("FLW_SECRET_KEY", "FLUTTERWAVE_SECRET_KEY"),
            flw_public_key: get_either("FLW_PUBLIC_KEY", "FLUTTERWAVE_PUBLIC_KEY"),
            flw_encryption_key: get_either("FLW_ENCRYPTION_KEY", "FLUTTERWAVE_ENCRYPTION_KEY"),
            flw_webhook_hash: get_either("FLW_WEBHOOK_SECRET_HASH", "FLUTTERWAVE_WEBHOOK_SECRET"),
            flw_api_base_url: get("FLW_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_FLW_API_BASE_URL.to_string()),
            verify_webhook_transactions,
            webhook_verify_timeout: Duration::from_millis(parse_or(
                &get,
                "FLW_WEBHOOK_VERIFY_TIMEOUT_MS",
                DEFAULT_WEBHOOK_VERIFY_TIMEOUT_MS,
            )),
            tts_base_url: get("ODIA_TTS_BASE_URL")
                .unwrap_or_else(|| DEFAULT_TTS_BASE_URL.to_string()),
            tts_default_voice,
            tts_timeout: Duration::from_millis(parse_or(
                &get,
                "ODIA_TTS_TIMEOUT_MS",
                DEFAULT_TTS_TIMEOUT_MS,
            )),
            tts_max_text_length: parse_or(&get, "ODIA_TTS_MAX_TEXT_LENGTH", DEFAULT_TTS_MAX_TEXT_LENGTH),
            rate_limit_max: parse_or(&get, "RATE_LIMIT_MAX", DEFAULT_RATE_LIMIT_MAX),
            rate_limit_window: Duration::from_millis(parse_or(
                &get,
                "RATE_LIMIT_WINDOW",
                DEFAULT_RATE_LIMIT_WINDOW_MS,
            )),
            max_request_size: parse_or(&get, "MAX_REQUEST_SIZE", DEFAULT_MAX_REQUEST_SIZE),
            request_timeout: Duration::from_millis(parse_or(
                &get,
                "REQUEST_TIMEOUT",
                DEFAULT_REQUEST_TIMEOUT_MS,
            )),
            retry_max_attempts: parse_or(&get, "RETRY_MAX_ATTEMPTS", DEFAULT_RETRY_MAX_ATTEMPTS),
            log_level,
            startup_policy,
            metrics_token: get("METRICS_TOKEN"),
        }
    }

    /// Secret key looks like a Flutterwave secret and the webhook hash is set.
    pub fn is_payment_configured(&self) -> bool {
        self.flw_secret_key.starts_with("FLWSECK")
            && self.flw_webhook_hash.len() >= MIN_WEBHOOK_HASH_LEN
    }

    pub fn is_tts_configured(&self) -> bool {
        Url::parse(&self.tts_base_url)
            .map(|u| u.scheme() == "https" && u.host_str().is_some())
            .unwrap_or(false)
    }

    pub fn are_api_keys_configured(&self) -> bool {
        !self.api_keys.is_empty() && self.api_keys.iter().all(|k| k.len() >= MIN_API_KEY_LEN)
    }

    pub fn auth_mode(&self) -> AuthMode {
        if self.api_keys.is_empty() {
            AuthMode::Open
        } else {
            AuthMode::Enforced
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Collect configuration problems. Missing credentials are errors in
    /// production and warnings everywhere else. An unset CORS origin is
    /// always a warning.
    pub fn check(&self) -> ConfigReport {
        let mut report = ConfigReport::default();
        let mut problem = |msg: String| {
            if self.is_production() {
                report.errors.push(msg);
            } else {
                report.warnings.push(msg);
            }
        };

        if !self.is_payment_configured() {
            problem(
                "payment gateway not configured: FLW_SECRET_KEY must start with FLWSECK \
                 and FLW_WEBHOOK_SECRET_HASH must be at least 10 characters"
                    .to_string(),
            );
        }
        if self.auth_mode() == AuthMode::Open {
            problem("VALID_API_KEYS is empty: API key authentication is disabled".to_string());
        }

        if self.cors_allow_origin.is_none() {
            report
                .warnings
                .push("CORS_ALLOW_ORIGIN not set: browsers will reject cross-origin calls".to_string());
        }
        if !self.flw_secret_key.is_empty() {
            report.warnings.extend(self.key_set_warnings());
        }
        if !self.is_tts_configured() {
            report
                .warnings
                .push(format!("ODIA_TTS_BASE_URL is not an https URL: {}", self.tts_base_url));
        }
        if Url::parse(&self.flw_api_base_url).is_err() {
            report
                .errors
                .push(format!("FLW_API_BASE_URL is not a valid URL: {}", self.flw_api_base_url));
        }
        if self.metrics_token.is_none() {
            report
                .warnings
                .push("METRICS_TOKEN not set: /metrics is disabled".to_string());
        }

        report
    }

    /// Public and encryption keys belong next to the secret key and must be
    /// from the same (test or live) key set.
    fn key_set_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.flw_public_key.is_empty() {
            warnings.push("FLW_PUBLIC_KEY not set".to_string());
        } else if !self.flw_public_key.starts_with("FLWPUBK") {
            warnings.push("FLW_PUBLIC_KEY does not start with FLWPUBK".to_string());
        } else if self.flw_public_key.contains("_TEST") != self.flw_secret_key.contains("_TEST") {
            warnings.push(
                "FLW_PUBLIC_KEY and FLW_SECRET_KEY mix test and live keys".to_string(),
            );
        }
        if self.flw_encryption_key.is_empty() {
            warnings.push("FLW_ENCRYPTION_KEY not set".to_string());
        } else if self.flw_encryption_key.starts_with("FLWSECK") {
            warnings.push("FLW_ENCRYPTION_KEY holds a secret key".to_string());
        }
        warnings
    }

    /// Log the [`check`](Self::check) report and apply the startup policy.
    pub fn enforce_startup_policy(&self) -> Result<ConfigReport, ConfigError> {
        let report = self.check();
        for warning in &report.warnings {
            tracing::warn!("{warning}");
        }
        for error in &report.errors {
            tracing::error!("{error}");
        }

        if !report.is_ok() && self.startup_policy == StartupPolicy::FailFast {
            return Err(ConfigError::StartupRefused(report.errors.join("; ")));
        }
        Ok(report)
    }
}

/// Split a comma-separated key list, dropping keys shorter than the minimum.
pub fn parse_api_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .filter(|k| {
            let ok = k.len() >= MIN_API_KEY_LEN;
            if !ok {
                tracing::warn!(
                    "ignoring API key shorter than {MIN_API_KEY_LEN} characters"
                );
            }
            ok
        })
        .map(String::from)
        .collect()
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(value = %raw, "invalid {key}, using default {default}");
            default
        }),
        None => default,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("startup refused: {0}")]
    StartupRefused(String),
}
