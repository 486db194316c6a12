//! Provider transport: one call interface over remote and in-process delivery.
//!
//! - `http`: JSON POST to a remote provider
//! - `module`: direct calls into a module loaded by the host
//!
//! [`ProviderTransport`] picks the channel from the provider URI scheme, turns
//! raw payloads into typed results and caches capability discovery briefly.

mod http;
mod module;

pub use http::HttpChannel;
pub use module::ModuleChannel;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use openctx_types::{
    Annotation, AnnotationsParams, Capabilities, CapabilitiesParams, Item, ItemsParams, ProviderIdentity, ProviderMethod,
    ProviderSettings,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::Instant;

use crate::errors::ProviderError;
use crate::module::{ModuleLoader, ModuleSourceFetcher};

/// How long a successful capabilities result is reused.
pub const CAPABILITIES_CACHE_TTL: Duration = Duration::from_secs(10);

/// Delivery mechanism for provider calls.
///
/// Implementations return the raw result payload (`Null` when the provider
/// returned nothing) or a [`ProviderError`].
#[async_trait]
pub trait ProviderChannel: Send + Sync {
    async fn call(&self, method: ProviderMethod, params: Value, settings: &ProviderSettings) -> Result<Value, ProviderError>;
}

/// Hooks and shared resources a transport is built from.
#[derive(Clone)]
pub struct TransportHooks {
    pub http: reqwest::Client,
    pub module_loader: Option<Arc<dyn ModuleLoader>>,
    pub module_source: Option<Arc<dyn ModuleSourceFetcher>>,
}

impl TransportHooks {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            module_loader: None,
            module_source: None,
        }
    }
}

/// Whether a provider URI is served over HTTP.
pub fn is_remote(provider_uri: &str) -> bool {
    let lowered = provider_uri.trim_start().to_ascii_lowercase();
    lowered.starts_with("http://") || lowered.starts_with("https://")
}

pub struct ProviderTransport {
    provider_uri: String,
    channel: Arc<dyn ProviderChannel>,
    capabilities_ttl: Duration,
    capabilities: Mutex<Option<(Instant, Capabilities)>>,
}

impl ProviderTransport {
    /// Select a channel from the identity's URI scheme. Performs no I/O.
    pub fn for_identity(identity: &ProviderIdentity, hooks: &TransportHooks) -> Self {
        let uri = identity.provider_uri.as_str();
        let channel: Arc<dyn ProviderChannel> = if is_remote(uri) {
            Arc::new(HttpChannel::new(hooks.http.clone(), uri, identity.credentials.clone()))
        } else {
            Arc::new(ModuleChannel::new(uri, hooks.module_loader.clone(), hooks.module_source.clone()))
        };
        Self::from_channel(uri, channel)
    }

    pub fn from_channel(provider_uri: impl Into<String>, channel: Arc<dyn ProviderChannel>) -> Self {
        Self {
            provider_uri: provider_uri.into(),
            channel,
            capabilities_ttl: CAPABILITIES_CACHE_TTL,
            capabilities: Mutex::new(None),
        }
    }

    pub fn with_capabilities_ttl(mut self, ttl: Duration) -> Self {
        self.capabilities_ttl = ttl;
        self
    }

    pub fn provider_uri(&self) -> &str {
        &self.provider_uri
    }

    /// Capability discovery. Successful results are reused for all resources
    /// until the cache entry expires; failures are never cached.
    pub async fn capabilities(
        &self,
        params: &CapabilitiesParams,
        settings: &ProviderSettings,
    ) -> Result<Capabilities, ProviderError> {
        if let Some(cached) = self.cached_capabilities() {
            return Ok(cached);
        }
        let raw = self.call(ProviderMethod::Capabilities, params, settings).await?;
        let capabilities: Capabilities = self.decode_or_default(ProviderMethod::Capabilities, raw)?;
        *self.capabilities.lock().unwrap_or_else(PoisonError::into_inner) = Some((Instant::now(), capabilities.clone()));
        Ok(capabilities)
    }

    pub async fn items(&self, params: &ItemsParams, settings: &ProviderSettings) -> Result<Vec<Item>, ProviderError> {
        let raw = self.call(ProviderMethod::Items, params, settings).await?;
        self.decode_or_default(ProviderMethod::Items, raw)
    }

    pub async fn annotations(
        &self,
        params: &AnnotationsParams,
        settings: &ProviderSettings,
    ) -> Result<Vec<Annotation>, ProviderError> {
        let raw = self.call(ProviderMethod::Annotations, params, settings).await?;
        self.decode_or_default(ProviderMethod::Annotations, raw)
    }

    fn cached_capabilities(&self) -> Option<Capabilities> {
        let cache = self.capabilities.lock().unwrap_or_else(PoisonError::into_inner);
        cache
            .as_ref()
            .filter(|(stored, _)| stored.elapsed() < self.capabilities_ttl)
            .map(|(_, capabilities)| capabilities.clone())
    }

    async fn call<P: Serialize>(
        &self,
        method: ProviderMethod,
        params: &P,
        settings: &ProviderSettings,
    ) -> Result<Value, ProviderError> {
        let params = serde_json::to_value(params).map_err(|source| ProviderError::Decode {
            provider_uri: self.provider_uri.clone(),
            method,
            source,
        })?;
        self.channel.call(method, params, settings).await
    }

    /// `null` means "nothing": an empty list, or capabilities that apply everywhere.
    fn decode_or_default<T: DeserializeOwned + Default>(&self, method: ProviderMethod, raw: Value) -> Result<T, ProviderError> {
        if raw.is_null() {
            return Ok(T::default());
        }
        serde_json::from_value(raw).map_err(|source| ProviderError::Decode {
            provider_uri: self.provider_uri.clone(),
            method,
            source,
        })
    }
}

impl std::fmt::Debug for ProviderTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderTransport")
            .field("provider_uri", &self.provider_uri)
            .field("capabilities_ttl", &self.capabilities_ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Channel that replays scripted responses and counts calls per method.
    #[derive(Default)]
    pub struct ScriptedChannel {
        responses: Mutex<VecDeque<(ProviderMethod, Result<Value, String>)>>,
        pub capabilities_calls: AtomicUsize,
        pub items_calls: AtomicUsize,
        pub annotations_calls: AtomicUsize,
    }

    impl ScriptedChannel {
        pub fn respond(self, method: ProviderMethod, response: Result<Value, String>) -> Self {
            self.responses.lock().unwrap().push_back((method, response));
            self
        }

        pub fn calls(&self, method: ProviderMethod) -> usize {
            match method {
                ProviderMethod::Capabilities => self.capabilities_calls.load(Ordering::SeqCst),
                ProviderMethod::Items => self.items_calls.load(Ordering::SeqCst),
                ProviderMethod::Annotations => self.annotations_calls.load(Ordering::SeqCst),
            }
        }
    }

    #[async_trait]
    impl ProviderChannel for ScriptedChannel {
        async fn call(
            &self,
            method: ProviderMethod,
            _params: Value,
            _settings: &ProviderSettings,
        ) -> Result<Value, ProviderError> {
            let counter = match method {
                ProviderMethod::Capabilities => &self.capabilities_calls,
                ProviderMethod::Items => &self.items_calls,
                ProviderMethod::Annotations => &self.annotations_calls,
            };
            counter.fetch_add(1, Ordering::SeqCst);

            let mut responses = self.responses.lock().unwrap();
            let position = responses.iter().position(|(m, _)| *m == method);
            match position.and_then(|index| responses.remove(index)) {
                Some((_, Ok(value))) => Ok(value),
                Some((_, Err(message))) => Err(ProviderError::transport("stub:", message)),
                None => Ok(Value::Null),
            }
        }
    }
}
