use async_trait::async_trait;
use openctx_types::{Credentials, ProviderMethod, ProviderRequest, ProviderResponse, ProviderSettings};
use openctx_util::{is_sensitive_header, redact_json, redact_sensitive};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::ProviderChannel;
use crate::errors::ProviderError;

/// Calls a remote provider with one JSON POST per method invocation.
#[derive(Debug, Clone)]
pub struct HttpChannel {
    http: Client,
    provider_uri: String,
    credentials: Option<Credentials>,
}

impl HttpChannel {
    pub fn new(http: Client, provider_uri: impl Into<String>, credentials: Option<Credentials>) -> Self {
        Self {
            http,
            provider_uri: provider_uri.into(),
            credentials,
        }
    }

    /// Header names with credential-bearing values masked, for diagnostics.
    fn header_summary(&self) -> Vec<String> {
        self.credentials
            .iter()
            .flat_map(Credentials::headers)
            .map(|(name, value)| {
                if is_sensitive_header(name) {
                    format!("{name}: [REDACTED]")
                } else {
                    format!("{name}: {}", redact_sensitive(value))
                }
            })
            .collect()
    }
}

#[async_trait]
impl ProviderChannel for HttpChannel {
    async fn call(&self, method: ProviderMethod, params: Value, settings: &ProviderSettings) -> Result<Value, ProviderError> {
        let body = ProviderRequest {
            method,
            params,
            settings: Some(settings.clone()),
        };

        let redacted_settings = redact_json(&Value::Object(settings.clone()));
        debug!(
            provider = %self.provider_uri,
            %method,
            headers = ?self.header_summary(),
            settings = %redacted_settings,
            "Calling remote provider"
        );

        let mut request = self.http.post(&self.provider_uri).json(&body);
        if let Some(credentials) = &self.credentials {
            for (name, value) in credentials.headers() {
                request = request.header(name, value);
            }
        }

        let response = request
            .send()
            .await
            .map_err(|error| ProviderError::transport(&self.provider_uri, error.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::transport(&self.provider_uri, format!("HTTP {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|error| ProviderError::transport(&self.provider_uri, error.to_string()))?;
        let envelope: ProviderResponse = serde_json::from_slice(&bytes).map_err(|source| ProviderError::Decode {
            provider_uri: self.provider_uri.clone(),
            method,
            source,
        })?;

        envelope
            .into_result()
            .map_err(|body| ProviderError::from_body(&self.provider_uri, body))
    }
}
