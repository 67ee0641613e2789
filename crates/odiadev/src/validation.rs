//! Domain validators.
//!
//! Every validator returns a [`Validation`] and never panics. Handlers turn a
//! failure into a field-scoped error with [`Validation::into_result`].

use crate::constants::{LOCAL_CURRENCY, NGN_MAX_AMOUNT, NGN_MIN_AMOUNT, SUPPORTED_CURRENCIES};
use crate::error::OdiadevError;

/// Outcome of a validation check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Valid,
    Invalid {
        /// Machine-readable reason, e.g. `"below_minimum"`.
        code: &'static str,
        message: String,
    },
}

impl Validation {
    fn invalid(code: &'static str, message: impl Into<String>) -> Self {
        Validation::Invalid {
            code,
            message: message.into(),
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid)
    }

    /// Attach the offending field name and convert into a `Result`.
    pub fn into_result(self, field: &str) -> Result<(), OdiadevError> {
        match self {
            Validation::Valid => Ok(()),
            Validation::Invalid { code, message } => Err(OdiadevError::Validation {
                field: field.to_string(),
                code,
                message,
            }),
        }
    }
}

/// Inclusive bounds for amounts in the local currency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmountBounds {
    pub min: f64,
    pub max: f64,
}

impl Default for AmountBounds {
    fn default() -> Self {
        Self {
            min: NGN_MIN_AMOUNT,
            max: NGN_MAX_AMOUNT,
        }
    }
}

/// Kinds accepted by [`validate_input`].
#[derive(Debug, Clone)]
pub enum InputKind<'a> {
    Text { min_len: usize, max_len: usize },
    Number { min: f64, max: f64 },
    Email,
    Phone,
    Amount { currency: &'a str, bounds: AmountBounds },
}

pub fn validate_email(email: &str) -> Validation {
    if email.is_empty() {
        return Validation::invalid("required", "email is required");
    }
    if email.len() > 254 || email.chars().any(char::is_whitespace) {
        return Validation::invalid("invalid_format", "invalid email format");
    }
    let Some((local, domain)) = email.split_once('@') else {
        return Validation::invalid("invalid_format", "invalid email format");
    };
    let domain_ok = !domain.contains('@')
        && domain
            .split('.')
            .all(|label| !label.is_empty())
        && domain.contains('.');
    if local.is_empty() || !domain_ok {
        return Validation::invalid("invalid_format", "invalid email format");
    }
    Validation::Valid
}

/// Nigerian mobile numbers: `+234`, `234` or `0` followed by a 10-digit
/// subscriber number starting with 7, 8 or 9 then 0 or 1.
/// Spaces and dashes are ignored.
pub fn validate_nigerian_phone(phone: &str) -> Validation {
    let compact: String = phone.chars().filter(|c| !matches!(c, ' ' | '-')).collect();

    let national = compact
        .strip_prefix("+234")
        .or_else(|| compact.strip_prefix("234"))
        .or_else(|| compact.strip_prefix('0'));

    let valid = match national {
        Some(n) => {
            let b = n.as_bytes();
            b.len() == 10
                && b.iter().all(u8::is_ascii_digit)
                && matches!(b[0], b'7' | b'8' | b'9')
                && matches!(b[1], b'0' | b'1')
        }
        None => false,
    };

    if valid {
        Validation::Valid
    } else {
        Validation::invalid(
            "invalid_phone",
            "phone must be a Nigerian mobile number (+234, 234 or 0 prefix)",
        )
    }
}

pub fn validate_currency(currency: &str) -> Validation {
    if SUPPORTED_CURRENCIES.contains(&currency) {
        Validation::Valid
    } else {
        Validation::invalid(
            "unsupported_currency",
            format!(
                "currency must be one of {}",
                SUPPORTED_CURRENCIES.join(", ")
            ),
        )
    }
}

/// Amounts must be finite and positive; in the local currency they must also
/// fall inside `bounds`.
pub fn validate_amount(amount: f64, currency: &str, bounds: &AmountBounds) -> Validation {
    if !amount.is_finite() {
        return Validation::invalid("not_a_number", "amount must be a finite number");
    }
    if amount <= 0.0 {
        return Validation::invalid("not_positive", "amount must be positive");
    }
    if currency.eq_ignore_ascii_case(LOCAL_CURRENCY) {
        if amount < bounds.min {
            return Validation::invalid(
                "below_minimum",
                format!("amount must be at least {} {LOCAL_CURRENCY}", bounds.min),
            );
        }
        if amount > bounds.max {
            return Validation::invalid(
                "above_maximum",
                format!("amount must be at most {} {LOCAL_CURRENCY}", bounds.max),
            );
        }
    }
    Validation::Valid
}

pub fn validate_nigerian_amount(amount: f64, currency: &str) -> Validation {
    validate_amount(amount, currency, &AmountBounds::default())
}

/// Generic dispatcher over [`InputKind`].
pub fn validate_input(value: &serde_json::Value, kind: InputKind<'_>) -> Validation {
    match kind {
        InputKind::Text { min_len, max_len } => match value.as_str() {
            Some(s) => {
                let len = s.chars().count();
                if len < min_len {
                    Validation::invalid(
                        "too_short",
                        format!("must be at least {min_len} characters"),
                    )
                } else if len > max_len {
                    Validation::invalid(
                        "too_long",
                        format!("must be at most {max_len} characters"),
                    )
                } else {
                    Validation::Valid
                }
            }
            None => Validation::invalid("not_a_string", "must be a string"),
        },
        InputKind::Number { min, max } => match value.as_f64() {
            Some(n) if !n.is_finite() => {
                Validation::invalid("not_a_number", "must be a finite number")
            }
            Some(n) if n < min || n > max => {
                Validation::invalid("out_of_range", format!("must be between {min} and {max}"))
            }
            Some(_) => Validation::Valid,
            None => Validation::invalid("not_a_number", "must be a number"),
        },
        InputKind::Email => match value.as_str() {
            Some(s) => validate_email(s),
            None => Validation::invalid("not_a_string", "must be a string"),
        },
        InputKind::Phone => match value.as_str() {
            Some(s) => validate_nigerian_phone(s),
            None => Validation::invalid("not_a_string", "must be a string"),
        },
        InputKind::Amount { currency, bounds } => match value.as_f64() {
            Some(n) => validate_amount(n, currency, &bounds),
            None => Validation::invalid("not_a_number", "amount must be a number"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nigerian_amount_bounds() {
        assert!(!validate_nigerian_amount(50.0, "NGN").is_valid());
        assert!(validate_nigerian_amount(1000.0, "NGN").is_valid());
        assert!(!validate_nigerian_amount(60_000_000.0, "NGN").is_valid());
        assert!(validate_nigerian_amount(100.0, "NGN").is_valid());
        assert!(validate_nigerian_amount(50_000_000.0, "NGN").is_valid());
    }

    #[test]
    fn test_amount_bounds_only_apply_to_local_currency() {
        assert!(validate_nigerian_amount(50.0, "USD").is_valid());
        assert!(!validate_nigerian_amount(-1.0, "USD").is_valid());
        assert!(!validate_nigerian_amount(f64::NAN, "USD").is_valid());
        assert!(!validate_nigerian_amount(f64::INFINITY, "NGN").is_valid());
    }

    #[test]
    fn test_amount_error_codes() {
        assert_eq!(
            validate_nigerian_amount(50.0, "NGN"),
            Validation::Invalid {
                code: "below_minimum",
                message: "amount must be at least 100 NGN".to_string()
            }
        );
        assert!(matches!(
            validate_nigerian_amount(60_000_000.0, "NGN"),
            Validation::Invalid { code: "above_maximum", .. }
        ));
    }

    #[test]
    fn test_nigerian_phone() {
        assert!(validate_nigerian_phone("+2348012345678").is_valid());
        assert!(validate_nigerian_phone("08012345678").is_valid());
        assert!(validate_nigerian_phone("2349012345678").is_valid());
        assert!(validate_nigerian_phone("0701 234 5678").is_valid());
        assert!(!validate_nigerian_phone("1234567890").is_valid());
        assert!(!validate_nigerian_phone("08212345678").is_valid());
        assert!(!validate_nigerian_phone("0801234567").is_valid());
        assert!(!validate_nigerian_phone("+44801234567").is_valid());
        assert!(!validate_nigerian_phone("").is_valid());
    }

    #[test]
    fn test_email() {
        assert!(validate_email("ada@odia.dev").is_valid());
        assert!(validate_email("first.last+tag@mail.example.ng").is_valid());
        assert!(!validate_email("").is_valid());
        assert!(!validate_email("no-at-sign").is_valid());
        assert!(!validate_email("@odia.dev").is_valid());
        assert!(!validate_email("ada@localhost").is_valid());
        assert!(!validate_email("ada@odia..dev").is_valid());
        assert!(!validate_email("a b@odia.dev").is_valid());
        assert!(!validate_email("a@b@odia.dev").is_valid());
    }

    #[test]
    fn test_currency() {
        assert!(validate_currency("NGN").is_valid());
        assert!(validate_currency("USD").is_valid());
        assert!(!validate_currency("BTC").is_valid());
        assert!(!validate_currency("ngn").is_valid());
    }

    #[test]
    fn test_validate_input_dispatch() {
        let text = InputKind::Text {
            min_len: 6,
            max_len: 50,
        };
        assert!(validate_input(&json!("tx-123456"), text.clone()).is_valid());
        assert!(!validate_input(&json!("tx-1"), text.clone()).is_valid());
        assert!(!validate_input(&json!(123456), text).is_valid());

        let speed = InputKind::Number { min: 0.5, max: 2.0 };
        assert!(validate_input(&json!(1.0), speed.clone()).is_valid());
        assert!(!validate_input(&json!(2.5), speed.clone()).is_valid());
        assert!(!validate_input(&json!("fast"), speed).is_valid());

        assert!(validate_input(&json!("ada@odia.dev"), InputKind::Email).is_valid());
        assert!(validate_input(&json!("08012345678"), InputKind::Phone).is_valid());
        assert!(!validate_input(&json!(8012345678u64), InputKind::Phone).is_valid());

        let amount = InputKind::Amount {
            currency: "NGN",
            bounds: AmountBounds::default(),
        };
        assert!(validate_input(&json!(5000), amount.clone()).is_valid());
        assert!(!validate_input(&json!(10), amount).is_valid());
    }

    #[test]
    fn test_into_result_carries_field() {
        let err = validate_email("nope").into_result("customer.email").unwrap_err();
        match err {
            OdiadevError::Validation { field, code, .. } => {
                assert_eq!(field, "customer.email");
                assert_eq!(code, "invalid_format");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(validate_email("a@b.co").into_result("email").is_ok());
    }
}
