//! ODIADEV gateway: Flutterwave payments, Nigerian-voice TTS and payment
//! webhooks behind one hardened HTTP surface.
//!
//! Request validation, rate limiting and retry primitives live in the core
//! [`odiadev`] crate; this crate provides the HTTP server, upstream clients
//! and configuration.
//!
//! # Modules
//!
//! - [`routes`] - HTTP endpoints (index, healthcheck, metrics, payments, tts, webhook)
//! - [`config`] - Environment-driven [`GatewayConfig`](config::GatewayConfig) and startup checks
//! - [`cors`] / [`guard`] - CORS headers, rate limiting and API-key auth
//! - [`upstream`] - Flutterwave and TTS clients with bounded retry
//! - [`metrics`] - Prometheus counters and upstream latency
//! - [`logging`] - tracing setup with secret redaction on every line

pub mod config;
pub mod cors;
pub mod error;
pub mod guard;
pub mod logging;
pub mod metrics;
pub mod routes;
pub mod state;
pub mod upstream;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use state::AppState;
