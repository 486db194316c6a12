//! Error types for provider calls, credentials and the client facade.

use openctx_types::{ProviderErrorBody, ProviderMethod};
use openctx_util::InterpolationError;
use serde_json::Value;
use thiserror::Error;

/// Failure of a single provider call.
///
/// Remote and in-process providers report failures in the same shape so code
/// above the transport cannot tell the delivery mechanism apart.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Transport error calling {provider_uri}: {message}")]
    Transport { provider_uri: String, message: String },

    #[error("Provider {provider_uri} returned error {code}: {message}")]
    Provider {
        provider_uri: String,
        code: i64,
        message: String,
        data: Option<Value>,
    },

    #[error("Malformed {method} payload from {provider_uri}: {source}")]
    Decode {
        provider_uri: String,
        method: ProviderMethod,
        #[source]
        source: serde_json::Error,
    },

    #[error("Provider module {provider_uri} is unavailable: {reason}")]
    ModuleUnavailable { provider_uri: String, reason: String },
}

impl ProviderError {
    pub fn transport(provider_uri: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            provider_uri: provider_uri.into(),
            message: message.into(),
        }
    }

    pub fn module_unavailable(provider_uri: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ModuleUnavailable {
            provider_uri: provider_uri.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn from_body(provider_uri: &str, body: ProviderErrorBody) -> Self {
        Self::Provider {
            provider_uri: provider_uri.to_string(),
            code: body.code,
            message: body.message,
            data: body.data,
        }
    }

    pub(crate) fn from_call(provider_uri: &str, error: ProviderCallError) -> Self {
        Self::Provider {
            provider_uri: provider_uri.to_string(),
            code: error.code,
            message: error.message,
            data: error.data,
        }
    }

    /// URI of the provider that failed.
    pub fn provider_uri(&self) -> &str {
        match self {
            Self::Transport { provider_uri, .. }
            | Self::Provider { provider_uri, .. }
            | Self::Decode { provider_uri, .. }
            | Self::ModuleUnavailable { provider_uri, .. } => provider_uri,
        }
    }
}

/// Error raised by an in-process provider module.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{message} (code {code})")]
pub struct ProviderCallError {
    pub code: i64,
    pub message: String,
    pub data: Option<Value>,
}

impl ProviderCallError {
    /// Generic provider failure, using the JSON-RPC server error code.
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_code(-32000, message)
    }

    pub fn with_code(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("Failed to interpolate credentials for {provider_uri}: {source}")]
    Interpolation {
        provider_uri: String,
        #[source]
        source: InterpolationError,
    },

    #[error("Credentials for {provider_uri} are unavailable: {reason}")]
    Unavailable { provider_uri: String, reason: String },
}

/// Errors surfaced directly by the [`crate::Client`] facade.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Credentials(#[from] CredentialsError),

    #[error("Failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Client has been disposed")]
    Disposed,

    #[error("Client must be created inside a Tokio runtime")]
    NoRuntime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn remote_and_module_errors_share_a_shape() {
        let remote = ProviderError::from_body(
            "https://p.example",
            ProviderErrorBody {
                code: 7,
                message: "nope".to_string(),
                data: Some(json!(1)),
            },
        );
        let module = ProviderError::from_call("file:///p", ProviderCallError::with_code(7, "nope").with_data(json!(1)));

        match (remote, module) {
            (
                ProviderError::Provider { code: a, message: m1, data: d1, .. },
                ProviderError::Provider { code: b, message: m2, data: d2, .. },
            ) => {
                assert_eq!((a, m1, d1), (b, m2, d2));
            }
            other => panic!("unexpected variants: {other:?}"),
        }
    }
}
