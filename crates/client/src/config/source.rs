//! Host hooks that supply configuration over time.

use futures_util::stream::{self, BoxStream, StreamExt};
use tokio::sync::watch;

use super::RawConfiguration;

/// Resource-scoped configuration lookup.
///
/// `scope` is the URI of the resource a request concerns (`None` for requests
/// that are not tied to a resource). The returned stream yields the current
/// value first and then every later change; it may complete.
pub trait ConfigurationSource: Send + Sync {
    fn configuration(&self, scope: Option<&str>) -> BoxStream<'static, RawConfiguration>;
}

/// A fixed configuration: yields one value, then completes.
#[derive(Debug, Clone, Default)]
pub struct StaticConfiguration {
    raw: RawConfiguration,
}

impl StaticConfiguration {
    pub fn new(raw: RawConfiguration) -> Self {
        Self { raw }
    }
}

impl ConfigurationSource for StaticConfiguration {
    fn configuration(&self, _scope: Option<&str>) -> BoxStream<'static, RawConfiguration> {
        stream::once(std::future::ready(self.raw.clone())).boxed()
    }
}

/// A configuration the host can replace at any time.
///
/// Subscribers see the value current at subscription time and then each
/// update. Rapid successive updates may be coalesced into the latest one.
/// Every stream completes once the `WatchConfiguration` is dropped.
#[derive(Debug)]
pub struct WatchConfiguration {
    sender: watch::Sender<RawConfiguration>,
}

impl WatchConfiguration {
    pub fn new(initial: RawConfiguration) -> Self {
        let (sender, _) = watch::channel(initial);
        Self { sender }
    }

    /// Replace the configuration and notify every subscriber.
    pub fn set(&self, raw: RawConfiguration) {
        self.sender.send_replace(raw);
    }

    /// Edit the configuration in place and notify every subscriber.
    pub fn update(&self, edit: impl FnOnce(&mut RawConfiguration)) {
        self.sender.send_modify(edit);
    }

    pub fn current(&self) -> RawConfiguration {
        self.sender.borrow().clone()
    }
}

impl Default for WatchConfiguration {
    fn default() -> Self {
        Self::new(RawConfiguration::default())
    }
}

impl ConfigurationSource for WatchConfiguration {
    fn configuration(&self, _scope: Option<&str>) -> BoxStream<'static, RawConfiguration> {
        let receiver = self.sender.subscribe();
        stream::unfold((receiver, true), |(mut receiver, first)| async move {
            if !first && receiver.changed().await.is_err() {
                return None;
            }
            let value = receiver.borrow_and_update().clone();
            Some((value, (receiver, false)))
        })
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_configuration_yields_once() {
        let source = StaticConfiguration::new(RawConfiguration::default().with_debug(true));
        let values: Vec<_> = source.configuration(None).collect().await;
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].debug, Some(true));
    }

    #[tokio::test]
    async fn watch_configuration_streams_updates_until_dropped() {
        let source = WatchConfiguration::default();
        let mut stream = source.configuration(Some("file:///a.go"));

        assert_eq!(stream.next().await, Some(RawConfiguration::default()));

        source.update(|raw| raw.enable = Some(false));
        assert_eq!(stream.next().await.and_then(|raw| raw.enable), Some(false));

        drop(source);
        assert_eq!(stream.next().await, None);
    }
}
