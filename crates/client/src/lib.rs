//! OpenCtx client.
//!
//! Fans requests for items and annotations out to every configured provider,
//! gates annotation requests by each provider's declared selectors, pools
//! provider clients per identity and merges results into continuously updated
//! streams. A provider that fails contributes nothing; it never fails the
//! combined result.
//!
//! Hosts construct a [`Client`] from a [`ClientEnv`] carrying a configuration
//! source, a credentials resolver and optional module loading hooks.

pub mod aggregate;
pub mod client;
pub mod config;
pub mod credentials;
pub mod errors;
pub mod logging;
pub mod module;
pub mod pool;
pub mod provider;
pub mod selector;
pub mod transport;

pub use aggregate::{Combined, ObserveOptions, ProviderBinding, ResultStream};
pub use client::{Client, ClientEnv};
pub use config::{ConfigurationSource, RawConfiguration, StaticConfiguration, WatchConfiguration};
pub use credentials::{CredentialsResolver, HeaderTemplateCredentials, NoCredentials};
pub use errors::{ClientError, CredentialsError, ProviderCallError, ProviderError};
pub use logging::{LogEntry, LogSink, Logger, MemorySink, TracingSink};
pub use module::{ModuleLoader, ModuleRegistry, ModuleSource, ModuleSourceFetcher, ProviderModule};
pub use pool::ProviderPool;
pub use provider::ProviderClient;
