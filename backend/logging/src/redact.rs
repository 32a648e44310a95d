//! Log Redaction Layer
//!
//! Scrubs e-mail addresses, bearer tokens and session cookies from strings
//! prior to logging.

use regex::Regex;
use std::sync::LazyLock;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap());
static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(Bearer\s+[a-zA-Z0-9\-\._~+/]+=*)|((?i)[a-z_]*(session|token)[a-z_]*=[^;&\s]+)")
        .unwrap()
});

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let redacted = EMAIL_RE.replace_all(input, "[REDACTED_EMAIL]");
    TOKEN_RE.replace_all(&redacted, "[REDACTED_TOKEN]").to_string()
}
