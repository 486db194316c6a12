//! Configuration: the host-facing input shape, its resolved form, the sources
//! that deliver it over time, and the on-disk file format used by hosts.

mod io;
mod model;
mod source;
mod validation;

pub use io::{CONFIG_PATH_ENV_VAR, ConfigError, ConfigFile, default_config_path, load_config, load_config_from_path};
pub use model::{Configuration, ProviderEntry, RawConfiguration};
pub use source::{ConfigurationSource, StaticConfiguration, WatchConfiguration};
pub use validation::{ValidationError, validate_config, validate_provider_uri};
