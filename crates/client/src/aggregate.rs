//! Fan-out of one request across the configured providers and merging of
//! their results into a continuously updated combined list.
//!
//! The engine runs as one task per subscription. Each time the provider list
//! changes a new round starts: calls of the previous round are dropped and
//! every provider's contribution is reset. Within a round each provider settles
//! exactly once, with its results, or with an empty contribution when it
//! failed or did not apply.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::future::BoxFuture;
use futures_util::stream::{FuturesUnordered, Stream, StreamExt};
use openctx_types::{EachWithProviderUri, ProviderSettings};
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::errors::ProviderError;
use crate::logging::Logger;
use crate::provider::ProviderClient;

/// A pooled provider client with the settings to call it with.
#[derive(Debug, Clone)]
pub struct ProviderBinding {
    pub client: Arc<ProviderClient>,
    pub settings: ProviderSettings,
}

impl ProviderBinding {
    pub fn new(client: Arc<ProviderClient>, settings: ProviderSettings) -> Self {
        Self { client, settings }
    }

    pub fn provider_uri(&self) -> &str {
        self.client.provider_uri()
    }
}

/// Emission policy for a combined stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserveOptions {
    /// Emit as soon as any provider has settled (`true`), or only once every
    /// provider of the current round has settled (`false`).
    pub emit_partial: bool,
}

impl Default for ObserveOptions {
    fn default() -> Self {
        Self { emit_partial: true }
    }
}

/// Outcome of one provider call: `Ok(None)` means "not applicable".
pub type ProviderOutcome<T> = Result<Option<Vec<T>>, ProviderError>;

/// Combined snapshot emitted by a [`ResultStream`].
pub type Combined<T> = Vec<EachWithProviderUri<T>>;

/// Stream of combined snapshots. Dropping it cancels the engine task and every
/// in-flight provider call of the subscription.
pub struct ResultStream<T> {
    receiver: mpsc::UnboundedReceiver<Combined<T>>,
    _guard: DropGuard,
}

impl<T> ResultStream<T> {
    /// Wait for the first snapshot, or an empty list if the stream ends
    /// without producing one.
    pub async fn first(mut self) -> Combined<T> {
        self.receiver.recv().await.unwrap_or_default()
    }
}

impl<T> Unpin for ResultStream<T> {}

impl<T> Stream for ResultStream<T> {
    type Item = Combined<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

/// Start an engine task.
///
/// `providers` yields the current provider list whenever it changes; `call`
/// issues the request to one provider. The returned stream ends when
/// `providers` completes and the last round has settled, or when
/// `cancellation_token` is cancelled.
pub fn aggregate<T, S, F>(
    providers: S,
    call: F,
    options: ObserveOptions,
    logger: Logger,
    cancellation_token: CancellationToken,
) -> ResultStream<T>
where
    T: Clone + Send + 'static,
    S: Stream<Item = Vec<ProviderBinding>> + Send + 'static,
    F: Fn(&ProviderBinding) -> BoxFuture<'static, ProviderOutcome<T>> + Send + 'static,
{
    let (sender, receiver) = mpsc::unbounded_channel();
    let task_token = cancellation_token.child_token();
    tokio::spawn(run_rounds(providers, call, options, logger, sender, task_token.clone()));
    ResultStream {
        receiver,
        _guard: task_token.drop_guard(),
    }
}

async fn run_rounds<T, S, F>(
    providers: S,
    call: F,
    options: ObserveOptions,
    logger: Logger,
    sender: mpsc::UnboundedSender<Combined<T>>,
    cancellation_token: CancellationToken,
) where
    T: Clone + Send + 'static,
    S: Stream<Item = Vec<ProviderBinding>> + Send + 'static,
    F: Fn(&ProviderBinding) -> BoxFuture<'static, ProviderOutcome<T>> + Send + 'static,
{
    let mut providers = Box::pin(providers);
    let mut round: FuturesUnordered<BoxFuture<'static, (usize, Combined<T>)>> = FuturesUnordered::new();
    let mut slots: Vec<Option<Combined<T>>> = Vec::new();
    let mut upstream_done = false;

    loop {
        tokio::select! {
            biased;
            _ = cancellation_token.cancelled() => break,
            next = providers.next(), if !upstream_done => match next {
                Some(bindings) => {
                    round = FuturesUnordered::new();
                    slots = vec![None; bindings.len()];
                    if bindings.is_empty() {
                        if sender.send(Vec::new()).is_err() {
                            break;
                        }
                        continue;
                    }
                    for (index, binding) in bindings.iter().enumerate() {
                        let pending = call(binding);
                        let provider_uri = binding.provider_uri().to_string();
                        let logger = logger.clone();
                        round.push(Box::pin(async move {
                            let outcome = pending.await;
                            (index, settle(&provider_uri, outcome, &logger))
                        }));
                    }
                }
                None => {
                    upstream_done = true;
                    if round.is_empty() {
                        break;
                    }
                }
            },
            Some((index, contribution)) = round.next(), if !round.is_empty() => {
                if let Some(slot) = slots.get_mut(index) {
                    *slot = Some(contribution);
                }
                let settled = slots.iter().all(Option::is_some);
                if (options.emit_partial || settled) && sender.send(combine(&slots)).is_err() {
                    break;
                }
                if upstream_done && round.is_empty() {
                    break;
                }
            }
        }
    }
}

/// Turn one provider outcome into its contribution, isolating failures.
fn settle<T>(provider_uri: &str, outcome: ProviderOutcome<T>, logger: &Logger) -> Combined<T> {
    match outcome {
        Ok(Some(values)) => values
            .into_iter()
            .map(|value| EachWithProviderUri::new(value, provider_uri))
            .collect(),
        Ok(None) => {
            logger.log(format_args!("{provider_uri}: not applicable, contributing nothing"));
            Vec::new()
        }
        Err(error) => {
            logger.log(format_args!("{provider_uri}: request failed, contributing nothing: {error}"));
            Vec::new()
        }
    }
}

/// Concatenate settled contributions in provider order.
fn combine<T: Clone>(slots: &[Option<Combined<T>>]) -> Combined<T> {
    slots.iter().flatten().flat_map(|values| values.iter().cloned()).collect()
}
