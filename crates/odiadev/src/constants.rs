/// Local currency code; amount bounds only apply to this currency.
pub const LOCAL_CURRENCY: &str = "NGN";

/// Smallest accepted NGN amount.
pub const NGN_MIN_AMOUNT: f64 = 100.0;

/// Largest accepted NGN amount.
pub const NGN_MAX_AMOUNT: f64 = 50_000_000.0;

/// Currencies accepted by the payment endpoint.
pub const SUPPORTED_CURRENCIES: &[&str] = &["NGN", "USD", "GHS", "KES", "ZAR", "GBP", "EUR"];

/// Keys that are never allowed through object sanitization.
pub const DANGEROUS_KEYS: &[&str] = &["__proto__", "constructor", "prototype"];

/// Token prefixes that mark secret material in log lines and error messages.
/// Longer prefixes come first so `FLWSECK_TEST-` wins over `FLWSECK`.
pub const SECRET_PREFIXES: &[&str] = &[
    "FLWSECK_TEST-",
    "FLWSECK-",
    "FLWPUBK_TEST-",
    "FLWPUBK-",
    "FLWENCK",
    "sk_live_",
    "sk_test_",
    "Bearer ",
];

/// Replacement text for redacted secrets.
pub const REDACTED: &str = "[REDACTED]";

/// Minimum length for an accepted API key.
pub const MIN_API_KEY_LEN: usize = 8;
