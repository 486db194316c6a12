//! Validation of configuration files before they are handed to the client.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::debug;
use url::Url;

use super::ConfigFile;

static HEADER_NAME_REGEX: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[!#$%&'*+.^_`|~0-9A-Za-z-]+$").ok());

/// Validate provider URIs and credential header names.
pub fn validate_config(file: &ConfigFile) -> Result<(), ValidationError> {
    for uri in file.configuration.providers.keys() {
        validate_provider_uri(uri)?;
        debug!("Validated provider entry: {}", uri);
    }
    for (uri, headers) in &file.credentials {
        validate_provider_uri(uri)?;
        for name in headers.keys() {
            validate_header_name(uri, name)?;
        }
    }
    Ok(())
}

/// A provider URI must be non-empty, free of whitespace, and, for remote
/// providers, a well-formed URL.
pub fn validate_provider_uri(uri: &str) -> Result<(), ValidationError> {
    if uri.trim().is_empty() {
        return Err(ValidationError::InvalidProviderUri {
            uri: uri.to_string(),
            reason: "Provider URI cannot be empty".to_string(),
        });
    }
    if uri.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidProviderUri {
            uri: uri.to_string(),
            reason: "Provider URI cannot contain whitespace".to_string(),
        });
    }

    let lowered = uri.to_ascii_lowercase();
    if lowered.starts_with("http://") || lowered.starts_with("https://") {
        let url = Url::parse(uri).map_err(|error| ValidationError::InvalidProviderUri {
            uri: uri.to_string(),
            reason: error.to_string(),
        })?;
        if url.host_str().is_none() {
            return Err(ValidationError::InvalidProviderUri {
                uri: uri.to_string(),
                reason: "Remote provider URI must include a host".to_string(),
            });
        }
    }
    Ok(())
}

fn validate_header_name(uri: &str, name: &str) -> Result<(), ValidationError> {
    let valid = HEADER_NAME_REGEX.as_ref().is_some_and(|regex| regex.is_match(name));
    if !valid {
        return Err(ValidationError::InvalidHeaderName {
            uri: uri.to_string(),
            name: name.to_string(),
            reason: "Header names must be non-empty HTTP tokens".to_string(),
        });
    }
    Ok(())
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid provider URI '{uri}': {reason}")]
    InvalidProviderUri { uri: String, reason: String },

    #[error("Invalid header name '{name}' for provider '{uri}': {reason}")]
    InvalidHeaderName { uri: String, name: String, reason: String },
}
