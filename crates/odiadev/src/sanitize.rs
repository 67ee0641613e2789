//! Recursive sanitization of untrusted JSON payloads.
//!
//! Sanitization is lossy on purpose: anything that does not fit the limits is
//! truncated or dropped rather than rejected, so handlers see a bounded value
//! and validation decides what is actually required.

use serde_json::{Map, Number, Value};

use crate::constants::DANGEROUS_KEYS;

/// Bounds applied by [`sanitize_value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SanitizeLimits {
    /// Maximum number of nested container levels. Containers that would sit
    /// deeper are replaced by empty ones.
    pub max_depth: usize,
    pub max_keys: usize,
    pub max_array_len: usize,
    /// Maximum string length in characters.
    pub max_string_len: usize,
    pub max_key_len: usize,
}

impl Default for SanitizeLimits {
    fn default() -> Self {
        Self {
            max_depth: 5,
            max_keys: 50,
            max_array_len: 100,
            max_string_len: 1000,
            max_key_len: 100,
        }
    }
}

/// Sanitize a JSON value against `limits`.
pub fn sanitize_value(value: &Value, limits: &SanitizeLimits) -> Value {
    sanitize_at(value, limits, 0)
}

fn sanitize_at(value: &Value, limits: &SanitizeLimits, depth: usize) -> Value {
    match value {
        Value::String(s) => Value::String(sanitize_string(s, limits.max_string_len)),
        Value::Number(n) => sanitize_number(n),
        Value::Array(items) => {
            if depth + 1 >= limits.max_depth {
                return Value::Array(Vec::new());
            }
            Value::Array(
                items
                    .iter()
                    .take(limits.max_array_len)
                    .map(|v| sanitize_at(v, limits, depth + 1))
                    .collect(),
            )
        }
        Value::Object(map) => {
            if depth + 1 >= limits.max_depth {
                return Value::Object(Map::new());
            }
            let mut out = Map::new();
            for (key, v) in map {
                if out.len() >= limits.max_keys {
                    break;
                }
                let Some(key) = sanitize_key_with(key, limits.max_key_len) else {
                    continue;
                };
                out.insert(key, sanitize_at(v, limits, depth + 1));
            }
            Value::Object(out)
        }
        Value::Bool(_) | Value::Null => value.clone(),
    }
}

fn sanitize_number(n: &Number) -> Value {
    match n.as_f64() {
        Some(f) if !f.is_finite() => Value::from(0),
        _ => Value::Number(n.clone()),
    }
}

/// Validate an object key. Returns `None` for dangerous names, empty keys,
/// over-long keys, or keys outside `[A-Za-z0-9_.-]`.
pub fn sanitize_key(key: &str) -> Option<String> {
    sanitize_key_with(key, SanitizeLimits::default().max_key_len)
}

fn sanitize_key_with(key: &str, max_len: usize) -> Option<String> {
    if key.is_empty() || key.len() > max_len || DANGEROUS_KEYS.contains(&key) {
        return None;
    }
    key.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        .then(|| key.to_string())
}

/// Strip markup and control characters from a string and cap its length.
///
/// `<script>` blocks are removed with their content, other tags are removed
/// and their text kept, `javascript:` schemes and inline `on*=` handlers are
/// dropped. Stripping repeats until nothing changes, so removing one
/// fragment cannot splice a new one together.
pub fn sanitize_string(input: &str, max_len: usize) -> String {
    strip_markup(input)
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\t'))
        .collect::<String>()
        .trim()
        .chars()
        .take(max_len)
        .collect()
}

fn strip_markup(input: &str) -> String {
    let mut current = input.to_string();
    loop {
        let without_scripts = strip_script_blocks(&current);
        let without_tags = strip_tags(&without_scripts);
        let next = strip_event_handlers(&remove_ascii_ci(&without_tags, "javascript:"));
        // Every step only removes, so this terminates.
        if next.len() == current.len() {
            return next;
        }
        current = next;
    }
}

fn find_ascii_ci(haystack: &str, needle: &str) -> Option<usize> {
    haystack.to_ascii_lowercase().find(needle)
}

fn remove_ascii_ci(input: &str, needle: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(idx) = find_ascii_ci(rest, needle) {
        out.push_str(&rest[..idx]);
        rest = &rest[idx + needle.len()..];
    }
    out.push_str(rest);
    out
}

fn strip_script_blocks(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = find_ascii_ci(rest, "<script") {
        out.push_str(&rest[..start]);
        let after = &rest[start..];
        rest = match find_ascii_ci(after, "</script>") {
            Some(end) => &after[end + "</script>".len()..],
            None => "",
        };
    }
    out.push_str(rest);
    out
}

fn strip_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for c in input.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            '>' => {}
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

/// Remove `onxxx=` attribute-style handlers (e.g. `onerror=`).
fn strip_event_handlers(input: &str) -> String {
    let lower = input.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;

    while i < input.len() {
        let at_word_start = i == 0 || !bytes[i - 1].is_ascii_alphanumeric();
        if at_word_start && lower[i..].starts_with("on") {
            let name_end = lower[i + 2..]
                .find(|c: char| !c.is_ascii_alphabetic())
                .map(|n| i + 2 + n)
                .unwrap_or(input.len());
            let after_name = lower[name_end..].trim_start();
            if name_end > i + 2 && after_name.starts_with('=') {
                i = input.len() - after_name.len() + 1;
                continue;
            }
        }
        let c = input[i..].chars().next().unwrap_or_default();
        out.push(c);
        i += c.len_utf8().max(1);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn depth(value: &Value) -> usize {
        match value {
            Value::Array(items) => 1 + items.iter().map(depth).max().unwrap_or(0),
            Value::Object(map) => 1 + map.values().map(depth).max().unwrap_or(0),
            _ => 0,
        }
    }

    fn has_dangerous_key(value: &Value) -> bool {
        match value {
            Value::Array(items) => items.iter().any(has_dangerous_key),
            Value::Object(map) => map
                .iter()
                .any(|(k, v)| DANGEROUS_KEYS.contains(&k.as_str()) || has_dangerous_key(v)),
            _ => false,
        }
    }

    #[test]
    fn drops_dangerous_keys_at_every_level() {
        let input = json!({
            "__proto__": {"admin": true},
            "constructor": 1,
            "customer": {"prototype": "x", "email": "a@b.co"},
            "items": [{"__proto__": 1, "ok": 2}]
        });
        let out = sanitize_value(&input, &SanitizeLimits::default());
        assert!(!has_dangerous_key(&out));
        assert_eq!(out["customer"]["email"], "a@b.co");
        assert_eq!(out["items"][0]["ok"], 2);
    }

    #[test]
    fn truncates_deep_nesting() {
        let mut deep = json!("leaf");
        for _ in 0..20 {
            deep = json!({ "n": deep });
        }
        let limits = SanitizeLimits {
            max_depth: 3,
            ..Default::default()
        };
        let out = sanitize_value(&deep, &limits);
        assert!(depth(&out) <= limits.max_depth);
    }

    #[test]
    fn nesting_bound_holds_for_arrays() {
        let deep = json!([[[[[[["x"]]]]]]]);
        for max_depth in 0..6 {
            let limits = SanitizeLimits {
                max_depth,
                ..Default::default()
            };
            let out = sanitize_value(&deep, &limits);
            assert!(depth(&out) <= max_depth.max(1), "depth {max_depth}");
        }
    }

    #[test]
    fn caps_keys_and_arrays() {
        let mut map = Map::new();
        for i in 0..80 {
            map.insert(format!("k{i}"), json!(i));
        }
        let input = json!({ "obj": Value::Object(map), "arr": (0..500).collect::<Vec<_>>() });
        let out = sanitize_value(&input, &SanitizeLimits::default());
        assert_eq!(out["obj"].as_object().unwrap().len(), 50);
        assert_eq!(out["arr"].as_array().unwrap().len(), 100);
    }

    #[test]
    fn rejects_keys_outside_allowed_charset() {
        assert_eq!(sanitize_key("tx_ref"), Some("tx_ref".to_string()));
        assert_eq!(sanitize_key("meta.source"), Some("meta.source".to_string()));
        assert_eq!(sanitize_key("bad key"), None);
        assert_eq!(sanitize_key("$where"), None);
        assert_eq!(sanitize_key(""), None);
        assert_eq!(sanitize_key(&"k".repeat(101)), None);
        assert_eq!(sanitize_key("__proto__"), None);
    }

    #[test]
    fn strips_script_blocks_and_tags() {
        assert_eq!(
            sanitize_string("Hello <script>alert(1)</script><b>world</b>", 100),
            "Hello world"
        );
        assert_eq!(sanitize_string("<SCRIPT src=x>bad</ScRiPt>ok", 100), "ok");
        assert_eq!(sanitize_string("<script>never closed", 100), "");
    }

    #[test]
    fn strips_javascript_scheme_and_handlers() {
        assert_eq!(sanitize_string("JavaScript:alert(1)", 100), "alert(1)");
        assert_eq!(sanitize_string("x onerror=alert(1)", 100), "x alert(1)");
        assert_eq!(sanitize_string("online payment", 100), "online payment");
    }

    #[test]
    fn removal_cannot_reassemble_fragments() {
        let out = sanitize_string("javajavascript:script:alert(1)", 100);
        assert!(!out.to_ascii_lowercase().contains("javascript:"), "{out}");
        assert_eq!(out, "alert(1)");

        let out = sanitize_string("<scr<script>x</script>ipt>alert(1)</script>", 100);
        assert!(!out.to_ascii_lowercase().contains("<script"), "{out}");
    }

    #[test]
    fn caps_string_length_in_chars() {
        assert_eq!(sanitize_string("ẹ̀kọ́ ẹ̀kọ́", 3).chars().count(), 3);
        assert_eq!(sanitize_string("  padded  ", 100), "padded");
    }

    #[test]
    fn drops_control_characters() {
        assert_eq!(sanitize_string("a\u{0}b\u{7}c", 100), "abc");
    }

    #[test]
    fn keeps_scalars() {
        let input = json!({"amount": 1000, "ok": true, "none": null, "rate": 1.5});
        let out = sanitize_value(&input, &SanitizeLimits::default());
        assert_eq!(out, input);
    }
}
