//! Redaction applied to every diagnostic message before it reaches a sink.

use openctx_util::redact_sensitive_with;

/// Rewrites messages so credential-looking values are masked.
#[derive(Debug, Clone)]
pub struct LogFormatter {
    replacement: String,
}

impl LogFormatter {
    pub fn new() -> Self {
        Self::with_replacement("[REDACTED]")
    }

    pub fn with_replacement(replacement: impl Into<String>) -> Self {
        Self {
            replacement: replacement.into(),
        }
    }

    pub fn format(&self, message: &str) -> String {
        redact_sensitive_with(message, &self.replacement)
    }
}

impl Default for LogFormatter {
    fn default() -> Self {
        Self::new()
    }
}
