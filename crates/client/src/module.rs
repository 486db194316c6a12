//! In-process provider modules and the hooks that load them.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use openctx_types::{Annotation, AnnotationsParams, Capabilities, CapabilitiesParams, Item, ItemsParams, ProviderSettings};

use crate::errors::{ProviderCallError, ProviderError};

/// A provider implemented in the host process.
///
/// Every method is optional: the defaults report "applies everywhere" and
/// return empty lists, so a module only overrides what it provides.
#[async_trait]
pub trait ProviderModule: Send + Sync {
    async fn capabilities(
        &self,
        _params: &CapabilitiesParams,
        _settings: &ProviderSettings,
    ) -> Result<Capabilities, ProviderCallError> {
        Ok(Capabilities::everywhere())
    }

    async fn items(&self, _params: &ItemsParams, _settings: &ProviderSettings) -> Result<Vec<Item>, ProviderCallError> {
        Ok(Vec::new())
    }

    async fn annotations(
        &self,
        _params: &AnnotationsParams,
        _settings: &ProviderSettings,
    ) -> Result<Vec<Annotation>, ProviderCallError> {
        Ok(Vec::new())
    }
}

/// What the loader is asked to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleSource {
    /// Resolve the module from its URI.
    Uri(String),
    /// Evaluate source text fetched for `uri`.
    Source { uri: String, source: String },
}

impl ModuleSource {
    pub fn uri(&self) -> &str {
        match self {
            ModuleSource::Uri(uri) | ModuleSource::Source { uri, .. } => uri,
        }
    }
}

/// Host hook turning a [`ModuleSource`] into a callable module.
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    async fn load(&self, source: ModuleSource) -> Result<Arc<dyn ProviderModule>, ProviderError>;
}

/// Optional host hook that fetches module source text for a URI. Returning
/// `Ok(None)` defers to the loader's own URI resolution.
#[async_trait]
pub trait ModuleSourceFetcher: Send + Sync {
    async fn fetch(&self, uri: &str) -> Result<Option<String>, ProviderError>;
}

/// Loader backed by modules compiled into the host and registered by URI.
///
/// Source text cannot be evaluated in-process, so a [`ModuleSource::Source`]
/// request is served by the module registered under its URI.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: RwLock<HashMap<String, Arc<dyn ProviderModule>>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the module served for `uri`.
    pub fn register(&self, uri: impl Into<String>, module: Arc<dyn ProviderModule>) {
        self.modules
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(uri.into(), module);
    }

    pub fn with_module(self, uri: impl Into<String>, module: Arc<dyn ProviderModule>) -> Self {
        self.register(uri, module);
        self
    }

    pub fn unregister(&self, uri: &str) -> bool {
        self.modules
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(uri)
            .is_some()
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.modules.read().unwrap_or_else(PoisonError::into_inner).contains_key(uri)
    }
}

#[async_trait]
impl ModuleLoader for ModuleRegistry {
    async fn load(&self, source: ModuleSource) -> Result<Arc<dyn ProviderModule>, ProviderError> {
        let uri = source.uri();
        self.modules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(uri)
            .cloned()
            .ok_or_else(|| ProviderError::module_unavailable(uri, "no module registered for this URI"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Empty;

    impl ProviderModule for Empty {}

    #[tokio::test]
    async fn default_methods_are_permissive_and_empty() {
        let module = Empty;
        let settings = ProviderSettings::new();
        assert_eq!(
            module.capabilities(&CapabilitiesParams::default(), &settings).await.unwrap(),
            Capabilities::everywhere()
        );
        assert!(module.items(&ItemsParams::default(), &settings).await.unwrap().is_empty());
        assert!(
            module
                .annotations(&AnnotationsParams::new("file:///a", ""), &settings)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn registry_resolves_registered_uris_only() {
        let registry = ModuleRegistry::new().with_module("builtin:empty", Arc::new(Empty));
        assert!(registry.load(ModuleSource::Uri("builtin:empty".into())).await.is_ok());
        assert!(
            registry
                .load(ModuleSource::Source {
                    uri: "builtin:empty".into(),
                    source: "ignored".into(),
                })
                .await
                .is_ok()
        );

        let missing = registry.load(ModuleSource::Uri("builtin:other".into())).await;
        assert!(matches!(missing, Err(ProviderError::ModuleUnavailable { .. })));
        assert!(registry.unregister("builtin:empty"));
        assert!(!registry.contains("builtin:empty"));
    }
}
