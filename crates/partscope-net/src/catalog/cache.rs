//! Remote data cache.
//!
//! [`TtlCache`] memoizes provider responses for a fixed time-to-live and
//! coalesces concurrent requests: while a fetch for a key is in flight, every
//! further caller for that key awaits the same result instead of starting its
//! own request.
//!
//! Fetches run on a spawned tokio task. A caller that goes away does not
//! cancel the fetch; its result is still stored for later callers.
//!
//! [`CatalogCache`] bundles one [`TtlCache`] per provider resource.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use partscope_core::logging::targets;
use partscope_core::{Category, RecordSet, Relationship, Supplier};
use tokio::time::Instant;

use super::error::{CatalogError, CatalogResult};
use super::provider::RecordProvider;
use super::query::{CacheKey, RecordQuery};

/// Time-to-live of cached provider responses unless configured otherwise.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Counters describing how requests were served.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Requests answered from a fresh entry.
    pub hits: u64,
    /// Requests that found no fresh entry and no fetch in flight.
    pub misses: u64,
    /// Requests that joined a fetch already in flight.
    pub coalesced: u64,
    /// Fetches that completed successfully and were stored.
    pub stored: u64,
    /// Fetches that failed.
    pub failures: u64,
}

impl CacheStats {
    /// Add up two sets of counters.
    pub fn merge(self, other: Self) -> Self {
        Self {
            hits: self.hits + other.hits,
            misses: self.misses + other.misses,
            coalesced: self.coalesced + other.coalesced,
            stored: self.stored + other.stored,
            failures: self.failures + other.failures,
        }
    }
}

struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
}

type SharedFetch<V> = Shared<BoxFuture<'static, CatalogResult<V>>>;

struct InFlight<V> {
    id: u64,
    result: SharedFetch<V>,
}

struct CacheState<V> {
    entries: HashMap<CacheKey, CacheEntry<V>>,
    in_flight: HashMap<CacheKey, InFlight<V>>,
    /// Bumped by `clear()`; fetches started under an older epoch never store.
    epoch: u64,
    next_fetch_id: u64,
    stats: CacheStats,
}

impl<V: Clone> CacheState<V> {
    fn fresh(&self, key: &CacheKey, ttl: Duration) -> Option<V> {
        self.entries
            .get(key)
            .filter(|entry| entry.stored_at.elapsed() < ttl)
            .map(|entry| entry.value.clone())
    }
}

/// A TTL cache with request coalescing.
pub struct TtlCache<V> {
    name: &'static str,
    ttl: Duration,
    state: Arc<Mutex<CacheState<V>>>,
}

impl<V> TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create an empty cache. `name` labels its log events.
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            ttl,
            state: Arc::new(Mutex::new(CacheState {
                entries: HashMap::new(),
                in_flight: HashMap::new(),
                epoch: 0,
                next_fetch_id: 0,
                stats: CacheStats::default(),
            })),
        }
    }

    /// The time-to-live of entries.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the fresh entry for `key`, or run `fetch` and store its result.
    ///
    /// A fresh entry is returned without suspending. If a fetch for `key` is
    /// already in flight, this call waits for it instead of calling `fetch`.
    /// Errors are propagated and never stored; an older entry for `key` is
    /// left in place.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn get_or_fetch<F, Fut>(&self, key: CacheKey, fetch: F) -> CatalogResult<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = CatalogResult<V>> + Send + 'static,
    {
        let pending = {
            let mut state = self.state.lock();

            if let Some(value) = state.fresh(&key, self.ttl) {
                state.stats.hits += 1;
                tracing::debug!(target: targets::CATALOG, cache = self.name, %key, "cache hit");
                return Ok(value);
            }

            if let Some(in_flight) = state.in_flight.get(&key) {
                let result = in_flight.result.clone();
                state.stats.coalesced += 1;
                tracing::debug!(target: targets::CATALOG, cache = self.name, %key, "joining in-flight fetch");
                result
            } else {
                state.stats.misses += 1;
                let id = state.next_fetch_id;
                state.next_fetch_id += 1;

                let task = tokio::spawn(Self::complete_fetch(
                    Arc::downgrade(&self.state),
                    self.name,
                    key.clone(),
                    id,
                    state.epoch,
                    fetch(),
                ));
                let result = async move {
                    task.await.unwrap_or_else(|err| {
                        Err(CatalogError::unavailable(format!("fetch task failed: {err}")))
                    })
                }
                .boxed()
                .shared();

                tracing::debug!(target: targets::CATALOG, cache = self.name, %key, "cache miss, fetching");
                state.in_flight.insert(
                    key,
                    InFlight {
                        id,
                        result: result.clone(),
                    },
                );
                result
            }
        };

        pending.await
    }

    /// Await `fetch` and record its outcome.
    async fn complete_fetch<Fut>(
        state: Weak<Mutex<CacheState<V>>>,
        name: &'static str,
        key: CacheKey,
        id: u64,
        epoch: u64,
        fetch: Fut,
    ) -> CatalogResult<V>
    where
        Fut: Future<Output = CatalogResult<V>>,
    {
        let result = fetch.await;

        let Some(state) = state.upgrade() else {
            return result;
        };
        let mut state = state.lock();

        if state.in_flight.get(&key).is_some_and(|f| f.id == id) {
            state.in_flight.remove(&key);
        }

        match &result {
            Ok(_) if state.epoch != epoch => {
                tracing::debug!(target: targets::CATALOG, cache = name, %key, "cache cleared during fetch, result not stored");
            }
            Ok(value) => {
                state.stats.stored += 1;
                state.entries.insert(
                    key,
                    CacheEntry {
                        value: value.clone(),
                        stored_at: Instant::now(),
                    },
                );
            }
            Err(err) => {
                state.stats.failures += 1;
                tracing::debug!(target: targets::CATALOG, cache = name, %key, error = %err, "fetch failed, nothing stored");
            }
        }

        result
    }

    /// The fresh entry for `key`, if any.
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        self.state.lock().fresh(key, self.ttl)
    }

    /// The entry for `key` even if it has expired.
    pub fn get_stale(&self, key: &CacheKey) -> Option<V> {
        self.state
            .lock()
            .entries
            .get(key)
            .map(|entry| entry.value.clone())
    }

    /// Whether a fetch for `key` is in flight.
    pub fn is_fetching(&self, key: &CacheKey) -> bool {
        self.state.lock().in_flight.contains_key(key)
    }

    /// Remove the entry for `key`. Returns `true` if one was present.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        self.state.lock().entries.remove(key).is_some()
    }

    /// Remove every entry and detach in-flight fetches.
    ///
    /// Detached fetches still answer their waiters but are not stored.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.in_flight.clear();
        state.epoch += 1;
        tracing::debug!(target: targets::CATALOG, cache = self.name, "cache cleared");
    }

    /// Drop expired entries, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let ttl = self.ttl;
        let mut state = self.state.lock();
        let before = state.entries.len();
        state
            .entries
            .retain(|_, entry| entry.stored_at.elapsed() < ttl);
        before - state.entries.len()
    }

    /// Number of stored entries, fresh or expired.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Whether no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Request counters.
    pub fn stats(&self) -> CacheStats {
        self.state.lock().stats
    }
}

impl<V> std::fmt::Debug for TtlCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TtlCache")
            .field("name", &self.name)
            .field("ttl", &self.ttl)
            .field("entries", &state.entries.len())
            .field("in_flight", &state.in_flight.len())
            .finish()
    }
}

static_assertions::assert_impl_all!(TtlCache<RecordSet>: Send, Sync);

/// Remote data cache in front of a [`RecordProvider`].
///
/// Record listings propagate errors. The category, supplier and relationship
/// lists are best-effort and degrade to empty on error.
pub struct CatalogCache<P> {
    provider: Arc<P>,
    records: TtlCache<RecordSet>,
    categories: TtlCache<Arc<[Category]>>,
    suppliers: TtlCache<Arc<[Supplier]>>,
    relationships: TtlCache<Arc<[Relationship]>>,
}

impl<P: RecordProvider> CatalogCache<P> {
    /// Cache `provider` with the default time-to-live.
    pub fn new(provider: P) -> Self {
        Self::with_ttl(provider, DEFAULT_TTL)
    }

    /// Cache `provider` with a custom time-to-live.
    pub fn with_ttl(provider: P, ttl: Duration) -> Self {
        Self {
            provider: Arc::new(provider),
            records: TtlCache::new("records", ttl),
            categories: TtlCache::new("categories", ttl),
            suppliers: TtlCache::new("suppliers", ttl),
            relationships: TtlCache::new("relationships", ttl),
        }
    }

    /// The wrapped provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// The time-to-live of entries.
    pub fn ttl(&self) -> Duration {
        self.records.ttl()
    }

    /// Fetch the full record listing.
    pub async fn fetch_all(&self) -> CatalogResult<RecordSet> {
        self.fetch(&RecordQuery::all()).await
    }

    /// Fetch the records matching `query`.
    pub async fn fetch(&self, query: &RecordQuery) -> CatalogResult<RecordSet> {
        let provider = Arc::clone(&self.provider);
        let owned = query.clone();
        self.records
            .get_or_fetch(CacheKey::Records(query.clone()), move || async move {
                provider.fetch_records(&owned).await.map(RecordSet::from)
            })
            .await
    }

    /// The fresh cached result for `query`, without any network access.
    pub fn cached(&self, query: &RecordQuery) -> Option<RecordSet> {
        self.records.get(&CacheKey::Records(query.clone()))
    }

    /// The cached result for `query` even if expired.
    pub fn stale(&self, query: &RecordQuery) -> Option<RecordSet> {
        self.records.get_stale(&CacheKey::Records(query.clone()))
    }

    /// The category list; empty if the provider fails.
    pub async fn categories(&self) -> Arc<[Category]> {
        let provider = Arc::clone(&self.provider);
        let result = self
            .categories
            .get_or_fetch(CacheKey::Categories, move || async move {
                provider.fetch_categories().await.map(Arc::from)
            })
            .await;
        best_effort(CacheKey::Categories, result)
    }

    /// The supplier list; empty if the provider fails.
    pub async fn suppliers(&self) -> Arc<[Supplier]> {
        let provider = Arc::clone(&self.provider);
        let result = self
            .suppliers
            .get_or_fetch(CacheKey::Suppliers, move || async move {
                provider.fetch_suppliers().await.map(Arc::from)
            })
            .await;
        best_effort(CacheKey::Suppliers, result)
    }

    /// The relationship list; empty if the provider fails.
    pub async fn relationships(&self) -> Arc<[Relationship]> {
        let provider = Arc::clone(&self.provider);
        let result = self
            .relationships
            .get_or_fetch(CacheKey::Relationships, move || async move {
                provider.fetch_relationships().await.map(Arc::from)
            })
            .await;
        best_effort(CacheKey::Relationships, result)
    }

    /// Drop the cached result for `query`.
    pub fn invalidate(&self, query: &RecordQuery) -> bool {
        self.records.invalidate(&CacheKey::Records(query.clone()))
    }

    /// Drop every cached response.
    pub fn clear(&self) {
        self.records.clear();
        self.categories.clear();
        self.suppliers.clear();
        self.relationships.clear();
    }

    /// Drop expired entries of every resource.
    pub fn purge_expired(&self) -> usize {
        self.records.purge_expired()
            + self.categories.purge_expired()
            + self.suppliers.purge_expired()
            + self.relationships.purge_expired()
    }

    /// Counters summed over every resource.
    pub fn stats(&self) -> CacheStats {
        self.records
            .stats()
            .merge(self.categories.stats())
            .merge(self.suppliers.stats())
            .merge(self.relationships.stats())
    }

    /// Counters of the record listings alone.
    pub fn record_stats(&self) -> CacheStats {
        self.records.stats()
    }
}

fn best_effort<T>(key: CacheKey, result: CatalogResult<Arc<[T]>>) -> Arc<[T]> {
    result.unwrap_or_else(|err| {
        tracing::warn!(target: targets::CATALOG, %key, error = %err, "best-effort lookup failed, using empty list");
        Arc::from(Vec::new())
    })
}

impl<P> std::fmt::Debug for CatalogCache<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogCache")
            .field("records", &self.records)
            .finish_non_exhaustive()
    }
}
