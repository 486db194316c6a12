//! Host-facing configuration input and its resolved form.

use indexmap::IndexMap;
use openctx_types::ProviderSettings;
use serde::{Deserialize, Deserializer, Serialize};

/// Raw configuration as supplied by the host:
/// `{enable?, debug?, providers?: {[uri]: settings | true | false}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,
    /// Provider URI → settings. Key order is fan-out order.
    #[serde(default, deserialize_with = "deserialize_provider_entries")]
    pub providers: IndexMap<String, ProviderEntry>,
}

impl RawConfiguration {
    pub fn with_provider(mut self, uri: impl Into<String>, settings: ProviderSettings) -> Self {
        self.providers.insert(uri.into(), ProviderEntry::Settings(settings));
        self
    }

    pub fn with_enable(mut self, enable: bool) -> Self {
        self.enable = Some(enable);
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = Some(debug);
        self
    }
}

/// One provider entry. `true` enables the provider with empty settings,
/// `false` (or `null`) excludes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderEntry {
    Enabled(bool),
    Settings(ProviderSettings),
}

impl ProviderEntry {
    fn into_settings(self) -> Option<ProviderSettings> {
        match self {
            ProviderEntry::Enabled(true) => Some(ProviderSettings::new()),
            ProviderEntry::Enabled(false) => None,
            ProviderEntry::Settings(settings) => Some(settings),
        }
    }
}

fn deserialize_provider_entries<'de, D>(deserializer: D) -> Result<IndexMap<String, ProviderEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    let maybe_entries = Option::<IndexMap<String, Option<ProviderEntry>>>::deserialize(deserializer)?;
    Ok(maybe_entries
        .unwrap_or_default()
        .into_iter()
        .map(|(uri, entry)| (uri, entry.unwrap_or(ProviderEntry::Enabled(false))))
        .collect())
}

/// Typed configuration the client acts on.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    pub enabled: bool,
    pub debug: bool,
    /// Enabled providers in configuration order.
    pub providers: Vec<(String, ProviderSettings)>,
}

impl Configuration {
    pub fn resolve(raw: RawConfiguration) -> Self {
        Self {
            enabled: raw.enable.unwrap_or(true),
            debug: raw.debug.unwrap_or(false),
            providers: raw
                .providers
                .into_iter()
                .filter_map(|(uri, entry)| entry.into_settings().map(|settings| (uri, settings)))
                .collect(),
        }
    }

    /// Settings for one provider, if it is configured and enabled.
    pub fn settings_for(&self, provider_uri: &str) -> Option<&ProviderSettings> {
        self.providers
            .iter()
            .find(|(uri, _)| uri == provider_uri)
            .map(|(_, settings)| settings)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::resolve(RawConfiguration::default())
    }
}

impl From<RawConfiguration> for Configuration {
    fn from(raw: RawConfiguration) -> Self {
        Self::resolve(raw)
    }
}
