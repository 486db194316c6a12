//! Time-bounded cache of provider clients keyed by identity.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use openctx_types::ProviderIdentity;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::debug;

use crate::provider::{ProviderClient, ProviderEnv};

/// Default lifetime of a pooled client, measured from insertion.
pub const DEFAULT_POOL_TTL: Duration = Duration::from_secs(5 * 60);
/// Default interval between background sweeps of expired entries.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

struct PoolEntry {
    client: Arc<ProviderClient>,
    inserted: Instant,
}

struct PoolInner {
    ttl: Duration,
    entries: Mutex<HashMap<ProviderIdentity, PoolEntry>>,
}

impl PoolInner {
    fn sweep(&self, now: Instant) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| now.duration_since(entry.inserted) < self.ttl);
        before - entries.len()
    }
}

/// Cache of [`ProviderClient`]s.
///
/// Entries expire a fixed TTL after insertion regardless of how often they
/// are read. Expired entries are never returned, and a background task purges
/// them on a fixed tick so memory stays bounded while the pool is idle. The
/// task stops when the pool is dropped.
pub struct ProviderPool {
    inner: Arc<PoolInner>,
    _sweeper: Option<DropGuard>,
}

impl ProviderPool {
    pub fn new(ttl: Duration) -> Self {
        Self::with_resolution(ttl, DEFAULT_SWEEP_INTERVAL)
    }

    /// Pool whose background sweep runs every `tick`.
    ///
    /// Outside a tokio runtime no sweeper is started; expiry is then enforced
    /// on lookup only.
    pub fn with_resolution(ttl: Duration, tick: Duration) -> Self {
        let inner = Arc::new(PoolInner {
            ttl,
            entries: Mutex::new(HashMap::new()),
        });
        let sweeper = tokio::runtime::Handle::try_current().ok().map(|handle| {
            let token = CancellationToken::new();
            handle.spawn(sweep_expired(Arc::downgrade(&inner), tick, token.clone()));
            token.drop_guard()
        });
        Self { inner, _sweeper: sweeper }
    }

    /// Return the live client for `identity`, constructing and caching one if
    /// there is none. Cheap and synchronous: construction performs no I/O.
    pub fn get_or_create(&self, identity: &ProviderIdentity, env: &ProviderEnv) -> Arc<ProviderClient> {
        let now = Instant::now();
        let mut entries = self.inner.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = entries.get(identity)
            && now.duration_since(entry.inserted) < self.inner.ttl
        {
            return Arc::clone(&entry.client);
        }

        let client = Arc::new(ProviderClient::new(identity.clone(), env));
        entries.insert(
            identity.clone(),
            PoolEntry {
                client: Arc::clone(&client),
                inserted: now,
            },
        );
        debug!("Created provider client for {}", identity.provider_uri);
        client
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// Number of cached entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.inner.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ProviderPool {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_TTL)
    }
}

async fn sweep_expired(inner: Weak<PoolInner>, tick: Duration, cancellation_token: CancellationToken) {
    let mut ticker = tokio::time::interval(tick);
    loop {
        tokio::select! {
            _ = cancellation_token.cancelled() => break,
            _ = ticker.tick() => {
                let Some(inner) = inner.upgrade() else { break };
                let evicted = inner.sweep(Instant::now());
                if evicted > 0 {
                    debug!("Evicted {} expired provider client(s)", evicted);
                }
            }
        }
    }
}
