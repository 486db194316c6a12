//! `${env:NAME}` and `${secret:NAME}` placeholder expansion for credential templates.

use regex::{Captures, Regex};
use thiserror::Error;
use tracing::debug;

static SERVICE: &str = "openctx";
/// Environment variable used to select the secret resolution backend.
pub const SECRETS_BACKEND_ENV_VAR: &str = "OPENCTX_SECRETS_BACKEND";

/// Where `${secret:NAME}` placeholders are looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretsBackend {
    /// OS keychain entry `NAME` under the `openctx` service.
    Keychain,
    /// Process environment variable `NAME`.
    Environment,
}

impl SecretsBackend {
    fn from_env_var(raw: Option<String>) -> Self {
        match raw.unwrap_or_default().trim().to_ascii_lowercase().as_str() {
            "env" | "environment" => Self::Environment,
            _ => Self::Keychain,
        }
    }
}

/// Determine the currently configured secrets backend.
pub fn secrets_backend() -> SecretsBackend {
    SecretsBackend::from_env_var(std::env::var(SECRETS_BACKEND_ENV_VAR).ok())
}

/// Replace every placeholder in `value`.
///
/// The first placeholder that cannot be resolved aborts the whole expansion;
/// a partially expanded value is never returned.
pub fn interpolate_string(value: &str) -> Result<String, InterpolationError> {
    let placeholder = Regex::new(r"\$\{(env|secret):([\w+_-]*)}")?;
    if !placeholder.is_match(value) {
        return Ok(value.to_string());
    }

    let mut failure = None;
    let expanded = placeholder.replace_all(value, |caps: &Captures| {
        if failure.is_some() {
            return String::new();
        }
        let name = &caps[2];
        let resolved = match &caps[1] {
            "env" => std::env::var(name).map_err(|_| InterpolationError::MissingEnvVar { name: name.to_string() }),
            _ => resolve_secret(name),
        };
        match resolved {
            Ok(resolved) => {
                debug!("interpolated {}:{} -> [REDACTED]", &caps[1], name);
                resolved
            }
            Err(error) => {
                failure = Some(error);
                String::new()
            }
        }
    });

    match failure {
        Some(error) => Err(error),
        None => Ok(expanded.into_owned()),
    }
}

/// Resolve a secret using the configured secrets backend.
pub fn resolve_secret(name: &str) -> Result<String, InterpolationError> {
    match secrets_backend() {
        SecretsBackend::Environment => std::env::var(name).map_err(|error| InterpolationError::MissingSecret {
            name: name.to_string(),
            error: error.to_string(),
        }),
        SecretsBackend::Keychain => {
            let entry = keyring::Entry::new(SERVICE, name).map_err(|e| InterpolationError::KeyringError {
                name: name.to_string(),
                error: e.to_string(),
            })?;
            entry.get_password().map_err(|e| InterpolationError::MissingSecret {
                name: name.to_string(),
                error: e.to_string(),
            })
        }
    }
}

#[derive(Debug, Error, Clone)]
pub enum InterpolationError {
    #[error("Missing environment variable: {name}")]
    MissingEnvVar { name: String },

    #[error("Missing secret: {name} - {error}")]
    MissingSecret { name: String, error: String },

    #[error("Keyring error for {name}: {error}")]
    KeyringError { name: String, error: String },

    #[error("Regex compilation error: {0}")]
    Regex(#[from] regex::Error),
}
