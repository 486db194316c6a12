//! Per-provider credential lookup.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use indexmap::IndexMap;
use openctx_types::Credentials;
use openctx_util::interpolate_string;

use crate::errors::CredentialsError;

/// Host hook resolving the credentials a provider is called with.
///
/// Failures are isolated by the client: a provider whose credentials cannot be
/// resolved is left out of that request cycle only.
#[async_trait]
pub trait CredentialsResolver: Send + Sync {
    async fn resolve(&self, provider_uri: &str) -> Result<Option<Credentials>, CredentialsError>;
}

/// Never supplies credentials.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCredentials;

#[async_trait]
impl CredentialsResolver for NoCredentials {
    async fn resolve(&self, _provider_uri: &str) -> Result<Option<Credentials>, CredentialsError> {
        Ok(None)
    }
}

/// Header templates per provider, expanded on every resolution.
///
/// Template values may reference `${env:NAME}` and `${secret:NAME}`.
/// Clones share one template table, so [`replace`](Self::replace) is seen by
/// every holder.
#[derive(Debug, Clone, Default)]
pub struct HeaderTemplateCredentials {
    templates: Arc<RwLock<HeaderTemplates>>,
}

type HeaderTemplates = IndexMap<String, IndexMap<String, String>>;

impl HeaderTemplateCredentials {
    pub fn new(templates: HeaderTemplates) -> Self {
        Self {
            templates: Arc::new(RwLock::new(templates)),
        }
    }

    pub fn with_header(self, provider_uri: impl Into<String>, name: impl Into<String>, template: impl Into<String>) -> Self {
        self.templates
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(provider_uri.into())
            .or_default()
            .insert(name.into(), template.into());
        self
    }

    /// Swap in a new template table. Later resolutions use it.
    pub fn replace(&self, templates: HeaderTemplates) {
        *self.templates.write().unwrap_or_else(PoisonError::into_inner) = templates;
    }
}

#[async_trait]
impl CredentialsResolver for HeaderTemplateCredentials {
    async fn resolve(&self, provider_uri: &str) -> Result<Option<Credentials>, CredentialsError> {
        let headers = self
            .templates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(provider_uri)
            .cloned();
        let Some(headers) = headers else {
            return Ok(None);
        };
        let mut credentials = Credentials::new();
        for (name, template) in &headers {
            let value = interpolate_string(template).map_err(|source| CredentialsError::Interpolation {
                provider_uri: provider_uri.to_string(),
                source,
            })?;
            credentials.insert(name.clone(), value);
        }
        Ok(Some(credentials))
    }
}
