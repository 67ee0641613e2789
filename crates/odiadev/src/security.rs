//! Constant-time comparison and secret redaction.
//!
//! Comparisons go through `subtle::ConstantTimeEq`. For slices of unequal
//! length `subtle` returns false without touching the bytes; length alone
//! does not leak key material, so no hashing step is needed to hide it.

use subtle::ConstantTimeEq;

use crate::constants::{REDACTED, SECRET_PREFIXES};

/// Compare two strings without a timing difference that depends on the
/// position of the first mismatching byte.
///
/// Unequal lengths return `false` immediately. Equal lengths are compared by
/// XOR-accumulating every byte pair.
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Check `candidate` against every key in `keys`.
///
/// Every key is compared even after a match so the number of comparisons
/// does not depend on which key matched.
pub fn matches_any_key(candidate: &str, keys: &[String]) -> bool {
    keys.iter().fold(false, |found, key| {
        constant_time_compare(candidate, key) | found
    })
}

/// Replace every token that starts with a known secret prefix by `[REDACTED]`.
///
/// A token runs from the prefix to the next whitespace, quote, comma or
/// closing bracket. The prefix itself is redacted too.
pub fn redact_secrets(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while !rest.is_empty() {
        let next = SECRET_PREFIXES
            .iter()
            .filter_map(|p| rest.find(p).map(|idx| (idx, *p)))
            .min_by_key(|(idx, p)| (*idx, usize::MAX - p.len()));

        match next {
            Some((idx, prefix)) => {
                out.push_str(&rest[..idx]);
                let after = &rest[idx + prefix.len()..];
                let end = after
                    .find(|c: char| c.is_whitespace() || matches!(c, '"' | '\'' | ',' | '}' | ']' | ')'))
                    .unwrap_or(after.len());
                out.push_str(REDACTED);
                rest = &after[end..];
            }
            None => {
                out.push_str(rest);
                break;
            }
        }
    }

    out
}

/// Mask the last octet/group of an IP-ish client identifier for logging.
pub fn mask_client_id(id: &str) -> String {
    match id.rfind(['.', ':']) {
        Some(idx) => format!("{}xxx", &id[..=idx]),
        None => "xxx".to_string(),
    }
}
