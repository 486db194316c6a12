use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque, provider-specific settings supplied by the host alongside each
/// provider URI. Passed through untouched to every provider call.
pub type ProviderSettings = serde_json::Map<String, Value>;

/// Headers or tokens the host supplies for a single provider.
///
/// Stored in a sorted map so that two credential sets with the same entries
/// compare and hash equal regardless of the order they were built in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credentials {
    headers: BTreeMap<String, String>,
}

impl Credentials {
    /// Create an empty credential set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert of a single header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Insert or replace a header.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name.into(), value.into());
    }

    /// Iterate over `(name, value)` header pairs in name order.
    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Credentials {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            headers: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Cache key identifying one provider connection: the provider URI plus the
/// credentials it is called with.
///
/// Equality is structural; two identities built independently from the same
/// URI and credentials are the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProviderIdentity {
    /// Provider URI as written in configuration.
    pub provider_uri: String,
    /// Credentials resolved for this provider, if any.
    pub credentials: Option<Credentials>,
}

impl ProviderIdentity {
    pub fn new(provider_uri: impl Into<String>, credentials: Option<Credentials>) -> Self {
        Self {
            provider_uri: provider_uri.into(),
            credentials,
        }
    }
}
