//! Configuration file IO for hosts that keep their settings on disk.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use openctx_util::config_path;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::{RawConfiguration, ValidationError, validate_config};

/// Environment variable overriding the configuration file location.
pub const CONFIG_PATH_ENV_VAR: &str = "OPENCTX_CONFIG_PATH";

/// On-disk configuration: the host-facing configuration plus optional
/// per-provider credential header templates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    #[serde(flatten)]
    pub configuration: RawConfiguration,
    /// Provider URI → header name → template (`${env:NAME}` / `${secret:NAME}`).
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub credentials: IndexMap<String, IndexMap<String, String>>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Returns the default path for the configuration file.
pub fn default_config_path() -> PathBuf {
    config_path(CONFIG_PATH_ENV_VAR, "openctx", "config.json")
}

/// Load the configuration from the default path.
pub fn load_config() -> Result<ConfigFile, ConfigError> {
    load_config_from_path(&default_config_path())
}

/// Load and validate a configuration file. A missing file is the default
/// configuration.
pub fn load_config_from_path(path: &Path) -> Result<ConfigFile, ConfigError> {
    if !path.exists() {
        debug!("No configuration at {}, using defaults", path.display());
        return Ok(ConfigFile::default());
    }

    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if content.trim().is_empty() {
        return Ok(ConfigFile::default());
    }
    let file: ConfigFile = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    validate_config(&file)?;
    debug!(
        "Loaded configuration from {} with {} provider(s)",
        path.display(),
        file.configuration.providers.len()
    );
    Ok(file)
}
