use odiadev::{RetryPolicy, SlidingWindowLimiter, Sleeper, TokioSleeper};
use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::upstream::flutterwave::FlutterwaveClient;
use crate::upstream::tts::TtsClient;
use crate::upstream::build_http_client;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub limiter: Arc<SlidingWindowLimiter>,
    pub flutterwave: FlutterwaveClient,
    /// Single-attempt client with a short timeout for webhook re-verification
    pub webhook_verifier: FlutterwaveClient,
    pub tts: TtsClient,
}

impl AppState {
    pub fn new(config: GatewayConfig) -> Result<Self, reqwest::Error> {
        Self::with_sleeper(config, Arc::new(TokioSleeper))
    }

    /// Build state with a custom retry sleeper (tests record delays instead
    /// of waiting).
    pub fn with_sleeper(
        config: GatewayConfig,
        sleeper: Arc<dyn Sleeper>,
    ) -> Result<Self, reqwest::Error> {
        let retry = RetryPolicy::new(config.retry_max_attempts);

        let flutterwave = FlutterwaveClient::new(
            build_http_client(config.request_timeout)?,
            config.flw_api_base_url.clone(),
            config.flw_secret_key.clone(),
            config.request_timeout,
            retry.clone(),
            Arc::clone(&sleeper),
        );
        let webhook_verifier = FlutterwaveClient::new(
            build_http_client(config.webhook_verify_timeout)?,
            config.flw_api_base_url.clone(),
            config.flw_secret_key.clone(),
            config.webhook_verify_timeout,
            RetryPolicy::none(),
            Arc::clone(&sleeper),
        );
        let tts = TtsClient::new(
            build_http_client(config.tts_timeout)?,
            config.tts_base_url.clone(),
            config.tts_timeout,
            retry,
            sleeper,
        );

        Ok(Self {
            config: Arc::new(config),
            limiter: Arc::new(SlidingWindowLimiter::new()),
            flutterwave,
            webhook_verifier,
            tts,
        })
    }
}
