//! Records exchanged with providers.

use serde::{Deserialize, Serialize};

/// Predicate over a resource that gates whether a provider is called.
///
/// Every condition that is present must hold for the selector to match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selector {
    /// Glob tested against the resource URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Literal substring that must appear in the resource content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_contains: Option<String>,
}

impl Selector {
    pub fn path(pattern: impl Into<String>) -> Self {
        Self {
            path: Some(pattern.into()),
            content_contains: None,
        }
    }

    pub fn content_contains(needle: impl Into<String>) -> Self {
        Self {
            path: None,
            content_contains: Some(needle.into()),
        }
    }
}

/// Result of capability discovery.
///
/// `selector: None` means the provider applies to every resource and
/// `selector: Some(vec![])` means it applies to none. The two must never be
/// conflated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<Vec<Selector>>,
}

impl Capabilities {
    /// Capabilities of a provider that applies to every resource.
    pub fn everywhere() -> Self {
        Self { selector: None }
    }

    /// Capabilities of a provider that applies to no resource.
    pub fn nowhere() -> Self {
        Self { selector: Some(Vec::new()) }
    }

    pub fn with_selectors(selectors: Vec<Selector>) -> Self {
        Self { selector: Some(selectors) }
    }
}

/// Parameters of the `capabilities` method. Carries no resource data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitiesParams {}

/// Parameters of the `items` method.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemsParams {
    /// Free-text search query, when the host has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

impl ItemsParams {
    pub fn query(query: impl Into<String>) -> Self {
        Self { query: Some(query.into()) }
    }
}

/// Parameters of the `annotations` method: the resource being annotated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationsParams {
    pub uri: String,
    pub content: String,
}

impl AnnotationsParams {
    pub fn new(uri: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            content: content.into(),
        }
    }
}

/// The subject being annotated or searched.
///
/// `content` is absent when only the URI is known, for example during
/// capability-only checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceDescriptor<'a> {
    pub uri: &'a str,
    pub content: Option<&'a str>,
}

impl<'a> ResourceDescriptor<'a> {
    pub fn new(uri: &'a str, content: Option<&'a str>) -> Self {
        Self { uri, content }
    }
}

impl<'a> From<&'a AnnotationsParams> for ResourceDescriptor<'a> {
    fn from(params: &'a AnnotationsParams) -> Self {
        Self {
            uri: &params.uri,
            content: Some(&params.content),
        }
    }
}

/// Host-facing content record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub title: String,
    /// External URL the host may link to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Human-facing presentation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui: Option<ItemUi>,
    /// Machine-facing payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai: Option<ItemAi>,
}

impl Item {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemUi {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hover: Option<HoverContent>,
}

/// Hover text shown to a human; markdown is preferred when both are present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoverContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAi {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Zero-based line/character position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

/// An [`Item`] attached to a resource, optionally to a range within it.
/// An absent range applies to the whole resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<Range>,
    pub item: Item,
}

/// A result record tagged with the provider that produced it.
///
/// Serializes as the record's own fields plus `providerUri`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EachWithProviderUri<T> {
    #[serde(flatten)]
    pub value: T,
    pub provider_uri: String,
}

impl<T> EachWithProviderUri<T> {
    pub fn new(value: T, provider_uri: impl Into<String>) -> Self {
        Self {
            value,
            provider_uri: provider_uri.into(),
        }
    }
}
