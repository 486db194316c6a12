//! Per-provider client: a transport plus selector gating for annotations.

use openctx_types::{
    Annotation, AnnotationsParams, Capabilities, CapabilitiesParams, Item, ItemsParams, ProviderIdentity, ProviderSettings,
    ResourceDescriptor,
};

use crate::errors::ProviderError;
use crate::logging::Logger;
use crate::selector;
use crate::transport::{ProviderTransport, TransportHooks};

/// Everything needed to construct a [`ProviderClient`] without I/O.
#[derive(Clone)]
pub struct ProviderEnv {
    pub logger: Logger,
    pub hooks: TransportHooks,
}

/// Stateless facade over one provider.
///
/// Never mutated after construction; safe to share between concurrent
/// requests. The only state it carries is the transport's capabilities cache.
#[derive(Debug)]
pub struct ProviderClient {
    identity: ProviderIdentity,
    transport: ProviderTransport,
    logger: Logger,
}

impl ProviderClient {
    pub fn new(identity: ProviderIdentity, env: &ProviderEnv) -> Self {
        let transport = ProviderTransport::for_identity(&identity, &env.hooks);
        Self::with_transport(identity, transport, env.logger.clone())
    }

    pub fn with_transport(identity: ProviderIdentity, transport: ProviderTransport, logger: Logger) -> Self {
        Self {
            identity,
            transport,
            logger,
        }
    }

    pub fn identity(&self) -> &ProviderIdentity {
        &self.identity
    }

    pub fn provider_uri(&self) -> &str {
        &self.identity.provider_uri
    }

    pub async fn capabilities(&self, settings: &ProviderSettings) -> Result<Capabilities, ProviderError> {
        self.transport.capabilities(&CapabilitiesParams::default(), settings).await
    }

    /// Item search. Not gated by the provider's selectors.
    pub async fn items(&self, params: &ItemsParams, settings: &ProviderSettings) -> Result<Vec<Item>, ProviderError> {
        self.transport.items(params, settings).await
    }

    /// Annotations for one resource.
    ///
    /// Returns `Ok(None)` when the provider's selectors reject the resource,
    /// which is different from the provider returning no annotations. A failed
    /// capability lookup is returned as an error, never treated as "not
    /// applicable".
    pub async fn annotations(
        &self,
        params: &AnnotationsParams,
        settings: &ProviderSettings,
    ) -> Result<Option<Vec<Annotation>>, ProviderError> {
        let uri = self.provider_uri();
        self.logger.log(format_args!("{uri}: fetching capabilities"));
        let capabilities = match self.capabilities(settings).await {
            Ok(capabilities) => capabilities,
            Err(error) => {
                self.logger.log(format_args!("{uri}: capabilities failed: {error}"));
                return Err(error);
            }
        };
        self.logger
            .log(format_args!("{uri}: capabilities selector {:?}", capabilities.selector));

        let resource = ResourceDescriptor::from(params);
        if !selector::matches(capabilities.selector.as_deref(), &resource) {
            self.logger
                .log(format_args!("{uri}: selector does not match {}, skipping annotations", params.uri));
            return Ok(None);
        }

        match self.transport.annotations(params, settings).await {
            Ok(annotations) => {
                self.logger
                    .log(format_args!("{uri}: {} annotation(s) for {}", annotations.len(), params.uri));
                Ok(Some(annotations))
            }
            Err(error) => {
                self.logger.log(format_args!("{uri}: annotations failed: {error}"));
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use openctx_types::{Credentials, ProviderMethod};
    use serde_json::json;

    use super::*;
    use crate::logging::MemorySink;
    use crate::transport::testing::ScriptedChannel;

    fn client(channel: Arc<ScriptedChannel>) -> ProviderClient {
        ProviderClient::with_transport(
            ProviderIdentity::new("stub:", None),
            ProviderTransport::from_channel("stub:", channel),
            Logger::disabled(),
        )
    }

    fn go_file() -> AnnotationsParams {
        AnnotationsParams::new("file:///src/main.go", "package main")
    }

    #[tokio::test]
    async fn empty_selector_never_reaches_annotations() {
        let channel = Arc::new(ScriptedChannel::default().respond(ProviderMethod::Capabilities, Ok(json!({ "selector": [] }))));
        let client = client(channel.clone());

        for uri in ["file:///src/main.go", "file:///src/main.ts"] {
            let params = AnnotationsParams::new(uri, "package main");
            assert_eq!(client.annotations(&params, &ProviderSettings::new()).await.unwrap(), None);
        }
        assert_eq!(channel.calls(ProviderMethod::Annotations), 0);
    }

    #[tokio::test]
    async fn matching_selector_calls_through() {
        let channel = Arc::new(
            ScriptedChannel::default()
                .respond(ProviderMethod::Capabilities, Ok(json!({ "selector": [{ "path": "**/*.go" }] })))
                .respond(
                    ProviderMethod::Annotations,
                    Ok(json!([{ "uri": "file:///src/main.go", "item": { "title": "docs" } }])),
                ),
        );
        let client = client(channel.clone());

        let annotations = client.annotations(&go_file(), &ProviderSettings::new()).await.unwrap().unwrap();
        assert_eq!(annotations.len(), 1);
        assert_eq!(annotations[0].item.title, "docs");
        assert_eq!(channel.calls(ProviderMethod::Annotations), 1);
    }

    #[tokio::test]
    async fn zero_annotations_is_not_the_same_as_not_applicable() {
        let channel = Arc::new(ScriptedChannel::default().respond(ProviderMethod::Annotations, Ok(json!([]))));
        let client = client(channel);
        assert_eq!(
            client.annotations(&go_file(), &ProviderSettings::new()).await.unwrap(),
            Some(Vec::new())
        );
    }

    #[tokio::test]
    async fn capability_failures_propagate() {
        let channel = Arc::new(ScriptedChannel::default().respond(ProviderMethod::Capabilities, Err("boom".to_string())));
        let client = client(channel.clone());

        assert!(client.annotations(&go_file(), &ProviderSettings::new()).await.is_err());
        assert_eq!(channel.calls(ProviderMethod::Annotations), 0);
    }

    #[tokio::test]
    async fn items_are_never_gated() {
        let channel = Arc::new(
            ScriptedChannel::default()
                .respond(ProviderMethod::Capabilities, Ok(json!({ "selector": [] })))
                .respond(ProviderMethod::Items, Ok(json!([{ "title": "a" }]))),
        );
        let client = client(channel.clone());

        let items = client.items(&ItemsParams::default(), &ProviderSettings::new()).await.unwrap();
        assert_eq!(items[0].title, "a");
        assert_eq!(channel.calls(ProviderMethod::Capabilities), 0);
    }

    #[tokio::test]
    async fn gating_decisions_are_logged() {
        let sink = Arc::new(MemorySink::new(32));
        let logger = Logger::new(sink.clone());
        logger.set_debug(true);
        let channel = Arc::new(ScriptedChannel::default().respond(ProviderMethod::Capabilities, Ok(json!({ "selector": [] }))));
        let client = ProviderClient::with_transport(
            ProviderIdentity::new("stub:", Some(Credentials::new().with_header("Authorization", "Bearer x"))),
            ProviderTransport::from_channel("stub:", channel),
            logger,
        );

        client.annotations(&go_file(), &ProviderSettings::new()).await.unwrap();
        assert!(sink.messages().iter().any(|message| message.contains("skipping annotations")));
    }
}
