//! Redaction of credential-looking values in diagnostic text.
//!
//! Provider URIs, settings and credential headers routinely end up in debug
//! messages. Everything passed to a log sink is run through
//! [`redact_sensitive`] first so bearer tokens and `key=value` secrets never
//! leave the process in clear text.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

const SENSITIVE_KEYWORDS: &[&str] = &[
    "ACCESS_KEY",
    "API_KEY",
    "API_TOKEN",
    "AUTH_TOKEN",
    "CLIENT_SECRET",
    "PASSWORD",
    "PRIVATE_KEY",
    "REFRESH_TOKEN",
    "SECRET",
    "SESSION_TOKEN",
    "TOKEN",
];

const SENSITIVE_HEADERS: &[&str] = &["authorization", "proxy-authorization", "cookie", "x-api-key", "x-auth-token"];

/// Redacts values that look like secrets, replacing them with `[REDACTED]`.
///
/// Key names and header names are kept so the message stays useful.
pub fn redact_sensitive(input: &str) -> String {
    redact_sensitive_with(input, "[REDACTED]")
}

/// Same as [`redact_sensitive`] with a custom replacement token.
pub fn redact_sensitive_with(input: &str, replacement: &str) -> String {
    let mut redacted = input.to_string();
    for pattern in redact_patterns().iter() {
        redacted = pattern
            .replace_all(&redacted, |captures: &Captures| {
                let prefix = captures.get(1).map(|m| m.as_str()).unwrap_or("");
                let suffix = captures.get(3).map(|m| m.as_str()).unwrap_or("");
                if captures.get(2).is_some() {
                    format!("{prefix}{replacement}{suffix}")
                } else {
                    replacement.to_string()
                }
            })
            .into_owned();
    }
    redacted
}

/// Redact every string inside a JSON value. Object keys whose name is a
/// sensitive header or keyword have their whole value replaced.
pub fn redact_json(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(redact_sensitive(s)),
        Value::Array(items) => Value::Array(items.iter().map(redact_json).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, val)| {
                    let redacted = if is_sensitive_header(key) || is_sensitive_key(key) {
                        Value::String("[REDACTED]".to_string())
                    } else {
                        redact_json(val)
                    };
                    (key.clone(), redacted)
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Whether an HTTP header carries credentials and must never be logged.
pub fn is_sensitive_header(name: &str) -> bool {
    let lowered = name.trim().to_ascii_lowercase();
    SENSITIVE_HEADERS.contains(&lowered.as_str())
}

fn is_sensitive_key(key: &str) -> bool {
    let normalized = key.to_ascii_uppercase().replace('-', "_");
    SENSITIVE_KEYWORDS.iter().any(|keyword| normalized.ends_with(keyword))
}

fn redact_patterns() -> &'static Vec<Regex> {
    static PATTERNS: Lazy<Vec<Regex>> = Lazy::new(build_redact_patterns);
    &PATTERNS
}

fn build_redact_patterns() -> Vec<Regex> {
    let keywords = SENSITIVE_KEYWORDS
        .iter()
        .map(|keyword| keyword.split('_').map(regex::escape).collect::<Vec<_>>().join("[_\\-]?"))
        .collect::<Vec<_>>()
        .join("|");

    let sources = [
        r"(?i)(authorization:\s*)([^\s,]+(?:\s+[^\s,]+)?)".to_string(),
        r"(?i)((?:^|\b)Bearer\s+)([A-Za-z0-9\-._~+/_]+=*)".to_string(),
        r"(?i)((?:^|\b)Basic\s+)([A-Za-z0-9+/]+=*)".to_string(),
        format!(r"(?i)([A-Za-z0-9_]*?(?:{keywords})[A-Za-z0-9_]*\s*=\s*)([^\s&,;]+)"),
        format!("(?i)(\"[A-Za-z0-9_.-]*?(?:{keywords})[A-Za-z0-9_.-]*\"\\s*:\\s*\")([^\"]+)(\")"),
        r"(eyJ[A-Za-z0-9\-_]+\.[A-Za-z0-9\-_]+\.[A-Za-z0-9\-_]*)".to_string(),
        r"(?i)((?:gh[oprsu]|github_pat)_[A-Za-z0-9_]{22,})".to_string(),
        r"(?i)(sk_(?:live|test)_[A-Za-z0-9]{16,})".to_string(),
    ];

    sources.iter().filter_map(|source| Regex::new(source).ok()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn redacts_authorization_headers_and_bearer_tokens() {
        assert_eq!(redact_sensitive("Authorization: Bearer abc.def"), "Authorization: [REDACTED]");
        assert_eq!(
            redact_sensitive("calling provider with Bearer tok_123"),
            "calling provider with Bearer [REDACTED]"
        );
    }

    #[test]
    fn redacts_key_value_assignments() {
        let redacted = redact_sensitive("https://p.example/?api_key=xyz&q=1 GITHUB_TOKEN=ghp");
        assert_eq!(redacted, "https://p.example/?api_key=[REDACTED]&q=1 GITHUB_TOKEN=[REDACTED]");
    }

    #[test]
    fn redacts_json_style_secret_fields() {
        let redacted = redact_sensitive(r#"{"clientSecret": "hunter2", "title": "ok"}"#);
        assert_eq!(redacted, r#"{"clientSecret": "[REDACTED]", "title": "ok"}"#);
    }

    #[test]
    fn leaves_ordinary_text_alone() {
        let message = "provider https://p.example/items returned 3 items";
        assert_eq!(redact_sensitive(message), message);
    }

    #[test]
    fn json_redaction_masks_sensitive_keys() {
        let value = json!({ "Authorization": "Bearer x", "nested": { "apiToken": "t", "count": 2 } });
        let redacted = redact_json(&value);
        assert_eq!(redacted["Authorization"], "[REDACTED]");
        assert_eq!(redacted["nested"]["apiToken"], "[REDACTED]");
        assert_eq!(redacted["nested"]["count"], 2);
    }

    #[test]
    fn header_names_are_case_insensitive() {
        assert!(is_sensitive_header("AUTHORIZATION"));
        assert!(is_sensitive_header("X-Api-Key"));
        assert!(!is_sensitive_header("Accept"));
    }
}
