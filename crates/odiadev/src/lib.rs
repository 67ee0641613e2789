//! Request-handling utilities for the ODIADEV gateway.
//!
//! Everything here is transport-agnostic: the gateway crate wires these
//! pieces into actix-web handlers, but none of them know about HTTP servers.
//!
//! # Layers
//!
//! - **Input** ([`body`], [`sanitize`]): size-capped body reads, JSON
//!   parsing, recursive sanitization of untrusted payloads
//! - **Validation** ([`validation`]): email, Nigerian phone numbers and
//!   amounts, generic bounds checks, all returning [`Validation`]
//! - **Abuse prevention** ([`rate_limit`], [`security`]): sliding-window
//!   limiter, constant-time comparison, secret redaction
//! - **Upstream resilience** ([`retry`]): bounded retry with a fixed backoff
//!   schedule and an injectable sleeper
//!
//! # Quick example
//!
//! ```
//! use odiadev::validation::{validate_nigerian_amount, validate_nigerian_phone};
//!
//! assert!(validate_nigerian_phone("+2348012345678").is_valid());
//! assert!(!validate_nigerian_amount(50.0, "NGN").is_valid());
//! ```

pub mod body;
pub mod constants;
pub mod error;
pub mod hmac;
pub mod rate_limit;
pub mod retry;
pub mod sanitize;
pub mod security;
pub mod validation;

pub use body::{parse_json_body, read_body, read_json_body, BodyError};
pub use error::OdiadevError;
pub use rate_limit::{RateDecision, SlidingWindowLimiter};
pub use retry::{with_retry, RecordingSleeper, RetryPolicy, Sleeper, TokioSleeper};
pub use sanitize::{sanitize_key, sanitize_string, sanitize_value, SanitizeLimits};
pub use security::{constant_time_compare, redact_secrets};
pub use validation::{AmountBounds, InputKind, Validation};
