use std::sync::Arc;

use async_trait::async_trait;
use openctx_types::{ProviderMethod, ProviderSettings};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::OnceCell;

use super::ProviderChannel;
use crate::errors::ProviderError;
use crate::module::{ModuleLoader, ModuleSource, ModuleSourceFetcher, ProviderModule};

/// Calls a provider module loaded into the host process.
///
/// The module is loaded on the first call and reused afterwards. A failed load
/// is not remembered, so the next call tries again.
pub struct ModuleChannel {
    provider_uri: String,
    loader: Option<Arc<dyn ModuleLoader>>,
    fetcher: Option<Arc<dyn ModuleSourceFetcher>>,
    module: OnceCell<Arc<dyn ProviderModule>>,
}

impl ModuleChannel {
    pub fn new(
        provider_uri: impl Into<String>,
        loader: Option<Arc<dyn ModuleLoader>>,
        fetcher: Option<Arc<dyn ModuleSourceFetcher>>,
    ) -> Self {
        Self {
            provider_uri: provider_uri.into(),
            loader,
            fetcher,
            module: OnceCell::new(),
        }
    }

    async fn module(&self) -> Result<&Arc<dyn ProviderModule>, ProviderError> {
        self.module.get_or_try_init(|| self.load()).await
    }

    async fn load(&self) -> Result<Arc<dyn ProviderModule>, ProviderError> {
        let Some(loader) = &self.loader else {
            return Err(ProviderError::module_unavailable(
                &self.provider_uri,
                "no module loader is configured",
            ));
        };
        let source = match &self.fetcher {
            Some(fetcher) => fetcher.fetch(&self.provider_uri).await?,
            None => None,
        };
        let request = match source {
            Some(source) => ModuleSource::Source {
                uri: self.provider_uri.clone(),
                source,
            },
            None => ModuleSource::Uri(self.provider_uri.clone()),
        };
        loader.load(request).await
    }

    fn decode<T: DeserializeOwned>(&self, method: ProviderMethod, params: Value) -> Result<T, ProviderError> {
        serde_json::from_value(params).map_err(|source| ProviderError::Decode {
            provider_uri: self.provider_uri.clone(),
            method,
            source,
        })
    }

    fn encode<T: Serialize>(&self, method: ProviderMethod, result: T) -> Result<Value, ProviderError> {
        serde_json::to_value(result).map_err(|source| ProviderError::Decode {
            provider_uri: self.provider_uri.clone(),
            method,
            source,
        })
    }
}

#[async_trait]
impl ProviderChannel for ModuleChannel {
    async fn call(&self, method: ProviderMethod, params: Value, settings: &ProviderSettings) -> Result<Value, ProviderError> {
        let module = self.module().await?;
        let uri = self.provider_uri.as_str();
        match method {
            ProviderMethod::Capabilities => {
                let params = self.decode(method, params)?;
                let result = module
                    .capabilities(&params, settings)
                    .await
                    .map_err(|error| ProviderError::from_call(uri, error))?;
                self.encode(method, result)
            }
            ProviderMethod::Items => {
                let params = self.decode(method, params)?;
                let result = module
                    .items(&params, settings)
                    .await
                    .map_err(|error| ProviderError::from_call(uri, error))?;
                self.encode(method, result)
            }
            ProviderMethod::Annotations => {
                let params = self.decode(method, params)?;
                let result = module
                    .annotations(&params, settings)
                    .await
                    .map_err(|error| ProviderError::from_call(uri, error))?;
                self.encode(method, result)
            }
        }
    }
}
