//! The client facade hosts embed.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{BoxFuture, join_all};
use futures_util::stream::{BoxStream, Stream, StreamExt};
use futures_util::FutureExt;
use openctx_types::{Annotation, AnnotationsParams, Capabilities, Item, ItemsParams, ProviderIdentity};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::aggregate::{Combined, ObserveOptions, ProviderBinding, ProviderOutcome, ResultStream, aggregate};
use crate::config::{Configuration, ConfigurationSource, RawConfiguration};
use crate::credentials::{CredentialsResolver, NoCredentials};
use crate::errors::ClientError;
use crate::logging::{LogSink, Logger, TracingSink};
use crate::module::{ModuleLoader, ModuleSourceFetcher};
use crate::pool::{DEFAULT_POOL_TTL, ProviderPool};
use crate::provider::ProviderEnv;
use crate::transport::TransportHooks;

/// Host hooks and tunables a [`Client`] is built from.
pub struct ClientEnv {
    pub configuration: Arc<dyn ConfigurationSource>,
    pub credentials: Arc<dyn CredentialsResolver>,
    pub module_loader: Option<Arc<dyn ModuleLoader>>,
    pub module_source: Option<Arc<dyn ModuleSourceFetcher>>,
    pub log_sink: Arc<dyn LogSink>,
    pub pool_ttl: Duration,
}

impl ClientEnv {
    pub fn new(configuration: Arc<dyn ConfigurationSource>) -> Self {
        Self {
            configuration,
            credentials: Arc::new(NoCredentials),
            module_loader: None,
            module_source: None,
            log_sink: Arc::new(TracingSink),
            pool_ttl: DEFAULT_POOL_TTL,
        }
    }

    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialsResolver>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_module_loader(mut self, loader: Arc<dyn ModuleLoader>) -> Self {
        self.module_loader = Some(loader);
        self
    }

    pub fn with_module_source(mut self, fetcher: Arc<dyn ModuleSourceFetcher>) -> Self {
        self.module_source = Some(fetcher);
        self
    }

    pub fn with_log_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.log_sink = sink;
        self
    }

    pub fn with_pool_ttl(mut self, ttl: Duration) -> Self {
        self.pool_ttl = ttl;
        self
    }
}

/// Entry point for hosts: pull and push access to items and annotations from
/// every configured provider.
///
/// Must be created inside a tokio runtime, otherwise [`Client::new`] fails
/// with [`ClientError::NoRuntime`]. All background work started by the
/// client or by the streams it returns stops on [`Client::dispose`] (or when
/// the client is dropped).
pub struct Client {
    configuration: Arc<dyn ConfigurationSource>,
    credentials: Arc<dyn CredentialsResolver>,
    pool: Arc<ProviderPool>,
    provider_env: ProviderEnv,
    logger: Logger,
    cancellation_token: CancellationToken,
}

impl Client {
    pub fn new(env: ClientEnv) -> Result<Self, ClientError> {
        let runtime = Handle::try_current().map_err(|_| ClientError::NoRuntime)?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("openctx/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let logger = Logger::new(env.log_sink);
        let cancellation_token = CancellationToken::new();

        spawn_debug_watcher(
            &runtime,
            env.configuration.configuration(None),
            logger.clone(),
            cancellation_token.child_token(),
        );

        let provider_env = ProviderEnv {
            logger: logger.clone(),
            hooks: TransportHooks {
                http,
                module_loader: env.module_loader,
                module_source: env.module_source,
            },
        };

        Ok(Self {
            configuration: env.configuration,
            credentials: env.credentials,
            pool: Arc::new(ProviderPool::new(env.pool_ttl)),
            provider_env,
            logger,
            cancellation_token,
        })
    }

    /// Items from every provider, once each has answered.
    pub async fn items(&self, params: ItemsParams) -> Combined<Item> {
        self.items_changes(params, ObserveOptions { emit_partial: false }).first().await
    }

    /// Continuously updated items, following configuration changes.
    pub fn items_changes(&self, params: ItemsParams, options: ObserveOptions) -> ResultStream<Item> {
        let call = move |binding: &ProviderBinding| -> BoxFuture<'static, ProviderOutcome<Item>> {
            let client = Arc::clone(&binding.client);
            let settings = binding.settings.clone();
            let params = params.clone();
            async move { client.items(&params, &settings).await.map(Some) }.boxed()
        };
        aggregate(
            self.provider_bindings(None),
            call,
            options,
            self.logger.clone(),
            self.cancellation_token.clone(),
        )
    }

    /// Annotations for one resource from every applicable provider, once each
    /// has answered.
    pub async fn annotations(&self, params: AnnotationsParams) -> Combined<Annotation> {
        self.annotations_changes(params, ObserveOptions { emit_partial: false })
            .first()
            .await
    }

    /// Continuously updated annotations for one resource. Configuration is
    /// read in the scope of the resource URI.
    pub fn annotations_changes(&self, params: AnnotationsParams, options: ObserveOptions) -> ResultStream<Annotation> {
        let providers = self.provider_bindings(Some(&params.uri));
        let call = move |binding: &ProviderBinding| -> BoxFuture<'static, ProviderOutcome<Annotation>> {
            let client = Arc::clone(&binding.client);
            let settings = binding.settings.clone();
            let params = params.clone();
            async move { client.annotations(&params, &settings).await }.boxed()
        };
        aggregate(
            providers,
            call,
            options,
            self.logger.clone(),
            self.cancellation_token.clone(),
        )
    }

    /// Capability discovery for a single provider. Failures are returned,
    /// not isolated.
    pub async fn capabilities(&self, provider_uri: &str) -> Result<Capabilities, ClientError> {
        if self.is_disposed() {
            return Err(ClientError::Disposed);
        }
        let raw = self
            .configuration
            .configuration(None)
            .next()
            .await
            .unwrap_or_default();
        let configuration = Configuration::resolve(raw);
        let settings = configuration.settings_for(provider_uri).cloned().unwrap_or_default();
        let credentials = self.credentials.resolve(provider_uri).await?;
        let client = self
            .pool
            .get_or_create(&ProviderIdentity::new(provider_uri, credentials), &self.provider_env);
        Ok(client.capabilities(&settings).await?)
    }

    /// Cancel every background task and in-flight call started by this client
    /// and silence its logger. Idempotent.
    pub fn dispose(&self) {
        self.cancellation_token.cancel();
        self.logger.close();
    }

    pub fn is_disposed(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    pub fn pool(&self) -> &ProviderPool {
        &self.pool
    }

    /// Provider list for a configuration scope, re-resolved on every
    /// configuration change.
    fn provider_bindings(&self, scope: Option<&str>) -> impl Stream<Item = Vec<ProviderBinding>> + Send + 'static {
        let credentials = Arc::clone(&self.credentials);
        let pool = Arc::clone(&self.pool);
        let env = self.provider_env.clone();
        let logger = self.logger.clone();
        let scoped = scope.is_some();
        self.configuration.configuration(scope).then(move |raw| {
            let credentials = Arc::clone(&credentials);
            let pool = Arc::clone(&pool);
            let env = env.clone();
            let logger = logger.clone();
            async move { resolve_bindings(raw, scoped, credentials.as_ref(), &pool, &env, &logger).await }
        })
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.dispose();
    }
}

async fn resolve_bindings(
    raw: RawConfiguration,
    scoped: bool,
    credentials: &dyn CredentialsResolver,
    pool: &ProviderPool,
    env: &ProviderEnv,
    logger: &Logger,
) -> Vec<ProviderBinding> {
    let configuration = Configuration::resolve(raw);
    // The logger is shared by every subscription.
    if !scoped {
        logger.set_debug(configuration.debug);
    }
    if !configuration.enabled {
        logger.log("disabled by configuration, no providers will be called");
        return Vec::new();
    }

    let lookups = configuration
        .providers
        .iter()
        .map(|(provider_uri, _)| credentials.resolve(provider_uri));
    let resolved = join_all(lookups).await;

    configuration
        .providers
        .into_iter()
        .zip(resolved)
        .filter_map(|((provider_uri, settings), credentials)| match credentials {
            Ok(credentials) => {
                let identity = ProviderIdentity::new(provider_uri, credentials);
                Some(ProviderBinding::new(pool.get_or_create(&identity, env), settings))
            }
            Err(error) => {
                logger.log(format_args!("{provider_uri}: skipping, credentials unavailable: {error}"));
                None
            }
        })
        .collect()
}

/// The shared debug flag follows the unscoped configuration only.
fn spawn_debug_watcher(
    runtime: &Handle,
    mut configuration: BoxStream<'static, RawConfiguration>,
    logger: Logger,
    cancellation_token: CancellationToken,
) {
    runtime.spawn(async move {
        loop {
            tokio::select! {
                biased;
                _ = cancellation_token.cancelled() => break,
                next = configuration.next() => match next {
                    Some(raw) => logger.set_debug(raw.debug.unwrap_or(false)),
                    None => break,
                },
            }
        }
    });
}
