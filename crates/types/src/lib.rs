//! Shared OpenCtx protocol types.
//!
//! Providers, the client core, and hosts all speak in terms of the records
//! defined here:
//! - `protocol`: capabilities, selectors, items, annotations and method params
//! - `identity`: provider identity, credentials and opaque settings
//! - `wire`: the JSON request/response envelopes used by remote providers

mod identity;
mod protocol;
mod wire;

pub use identity::{Credentials, ProviderIdentity, ProviderSettings};
pub use protocol::{
    Annotation, AnnotationsParams, Capabilities, CapabilitiesParams, EachWithProviderUri, HoverContent, Item, ItemAi,
    ItemUi, ItemsParams, Position, Range, ResourceDescriptor, Selector,
};
pub use wire::{ProviderErrorBody, ProviderMethod, ProviderRequest, ProviderResponse};
