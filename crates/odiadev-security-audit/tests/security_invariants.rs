//! Security invariant tests for the ODIADEV gateway.
//!
//! These tests scan the workspace sources and fail when a change weakens a
//! security property: redirect-following HTTP clients, non-constant-time
//! secret comparison, unredacted secrets in Debug output or logs, and error
//! bodies that echo internal detail.

use regex::Regex;
use std::path::Path;
use walkdir::WalkDir;

/// Read all .rs source files from production crates (excluding tests and this crate).
fn production_source_files() -> Vec<(String, String)> {
    let root = Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap();

    let crates_dir = root.join("crates");
    let mut files = Vec::new();

    for entry in WalkDir::new(&crates_dir).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();

        if path.extension().and_then(|e| e.to_str()) != Some("rs") {
            continue;
        }

        let path_str = path.to_str().unwrap_or("");
        if path_str.contains("security-audit") {
            continue;
        }
        if path_str.contains("tests/") || path_str.contains("\\tests\\") {
            continue;
        }

        if let Ok(content) = std::fs::read_to_string(path) {
            files.push((path_str.to_string(), content));
        }
    }

    files
}

/// Drop everything from the first `#[cfg(test)]` / `mod tests` onwards.
fn production_lines(content: &str) -> String {
    let mut result = Vec::new();
    let mut in_test_module = false;

    for line in content.lines() {
        if line.contains("#[cfg(test)]") || line.trim().starts_with("mod tests") {
            in_test_module = true;
        }
        if !in_test_module {
            result.push(line);
        }
    }

    result.join("\n")
}

/// Body of `fn name` up to the next top-level item.
fn function_body<'a>(content: &'a str, name: &str) -> Option<&'a str> {
    let start = content.find(&format!("fn {name}"))?;
    let rest = &content[start..];
    let end = rest[1..]
        .find("\n}")
        .map(|i| i + 3)
        .unwrap_or(rest.len());
    Some(&rest[..end])
}

#[test]
fn sources_are_scanned() {
    let files = production_source_files();
    assert!(
        files.iter().any(|(p, _)| p.ends_with("hmac.rs")),
        "security audit found no production sources to scan"
    );
}

#[test]
fn no_hardcoded_flutterwave_secrets() {
    let secret_re = Regex::new(r"FLW(SECK|PUBK)(_TEST)?-[A-Za-z0-9]{12,}").unwrap();

    for (path, content) in &production_source_files() {
        let prod_content = production_lines(content);
        if let Some(mat) = secret_re.find(&prod_content) {
            let line_num = prod_content[..mat.start()].lines().count() + 1;
            panic!(
                "Potential hardcoded Flutterwave key at {}:{}. Keys must come from the environment.",
                path, line_num
            );
        }
    }
}

#[test]
fn webhook_verification_has_no_early_returns() {
    for (path, content) in &production_source_files() {
        if !path.ends_with("hmac.rs") {
            continue;
        }

        for func in ["verify_signature", "verify_webhook"] {
            let body = function_body(content, func)
                .unwrap_or_else(|| panic!("{} missing from {}", func, path));
            assert!(
                !body.contains("return "),
                "{} at {} returns early. Every check must run before the verdict so \
                 timing does not reveal which part failed.",
                func,
                path
            );
            assert!(
                !body.contains("&&"),
                "{} at {} short-circuits between checks; combine results with `&`.",
                func,
                path
            );
        }
    }
}

#[test]
fn http_clients_disable_redirects() {
    let builder_re = Regex::new(r"reqwest::Client::builder\(\)").unwrap();
    let redirect_re = Regex::new(r"redirect\s*\(\s*.*Policy::none\(\)").unwrap();
    let bare_client_re = Regex::new(r"reqwest::Client::new\(\)").unwrap();

    for (path, content) in &production_source_files() {
        let prod_content = production_lines(content);

        for mat in builder_re.find_iter(&prod_content) {
            let search_end = (mat.end() + 500).min(prod_content.len());
            let builder_chain = &prod_content[mat.start()..search_end];
            assert!(
                redirect_re.is_match(builder_chain),
                "reqwest::Client::builder() at {} does not set redirect(Policy::none()). \
                 Upstream clients must not follow redirects.",
                path
            );
        }

        assert!(
            !bare_client_re.is_match(&prod_content),
            "reqwest::Client::new() at {} follows redirects by default; use build_http_client.",
            path
        );
    }
}

#[test]
fn constant_time_uses_subtle_crate() {
    for (path, content) in &production_source_files() {
        let prod_content = production_lines(content);

        if prod_content.contains("fn constant_time_compare") {
            assert!(
                prod_content.contains("use subtle") || prod_content.contains("subtle::"),
                "File {} defines constant_time_compare without the subtle crate.",
                path
            );
        }
    }
}

#[test]
fn api_keys_are_never_compared_with_eq() {
    let eq_re = Regex::new(r"api_keys\s*\.\s*contains\s*\(|==\s*\*?key\b|key\s*==").unwrap();

    for (path, content) in &production_source_files() {
        if !path.ends_with("guard.rs") {
            continue;
        }
        let prod_content = production_lines(content);
        assert!(
            prod_content.contains("matches_any_key"),
            "API key check at {} must go through matches_any_key.",
            path
        );
        assert!(
            !eq_re.is_match(&prod_content),
            "API key at {} compared with ==; use the constant-time helpers.",
            path
        );
    }
}

#[test]
fn secret_holding_types_redact_debug() {
    let secret_field_re = Regex::new(r"\b(secret_key|flw_secret_key|flw_webhook_hash)\s*:\s*String").unwrap();

    for (path, content) in &production_source_files() {
        let prod_content = production_lines(content);
        if !secret_field_re.is_match(&prod_content) {
            continue;
        }

        assert!(
            prod_content.contains("impl std::fmt::Debug for")
                || prod_content.contains("impl fmt::Debug for"),
            "{} holds secrets but has no hand-written Debug impl.",
            path
        );
        assert!(
            prod_content.contains("[REDACTED]"),
            "Debug impl in {} must print [REDACTED] for secret fields.",
            path
        );
    }
}

#[test]
fn logs_are_written_through_redaction() {
    for (path, content) in &production_source_files() {
        if !path.ends_with("logging.rs") {
            continue;
        }
        let prod_content = production_lines(content);
        let init = function_body(&prod_content, "init")
            .unwrap_or_else(|| panic!("no init() in {}", path));
        assert!(
            init.contains("with_writer(RedactingMakeWriter"),
            "tracing fmt layer at {} must write through RedactingMakeWriter.",
            path
        );
    }
}

#[test]
fn no_print_macros_in_production_code() {
    let print_re = Regex::new(r"\b(println!|eprintln!|print!|dbg!)").unwrap();

    for (path, content) in &production_source_files() {
        let prod_content = production_lines(content);
        if let Some(mat) = print_re.find(&prod_content) {
            let line_num = prod_content[..mat.start()].lines().count() + 1;
            panic!(
                "{} at {}:{} bypasses tracing and secret redaction.",
                mat.as_str(),
                path,
                line_num
            );
        }
    }
}

#[test]
fn error_responses_do_not_leak_internals() {
    let dangerous_patterns = ["stack trace", "RUST_BACKTRACE", "panicked at", "{:?}"];

    for (path, content) in &production_source_files() {
        if !content.contains("HttpResponse::") {
            continue;
        }

        let prod_content = production_lines(content);
        for (i, line) in prod_content.lines().enumerate() {
            for pattern in &dangerous_patterns {
                if line.contains(pattern) && line.contains("json") {
                    panic!(
                        "Potentially sensitive error detail '{}' found in HTTP response at {}:{}. \
                         Internal details should be logged server-side only.",
                        pattern,
                        path,
                        i + 1
                    );
                }
            }
        }

        if path.ends_with("error.rs") && prod_content.contains("fn error_response") {
            assert!(
                prod_content.contains("An internal error occurred")
                    && prod_content.contains("Server configuration error"),
                "{} must replace internal and configuration error detail with a generic message.",
                path
            );
            assert!(
                prod_content.contains("redact_secrets"),
                "{} must redact secrets from error messages.",
                path
            );
        }
    }
}
