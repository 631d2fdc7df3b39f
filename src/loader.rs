//! Per-request batched loaders.
//!
//! Implements the DataLoader pattern for preventing N+1 query problems:
//! a [`Loader`] caches results for the lifetime of one client request and
//! coalesces concurrent loads into a single batched fetch. The
//! [`DataLoaderManager`] hands out loaders deduplicated by compound cache
//! key (entity tag + scope + extra filter params), so two resolvers asking
//! for the same lookup under the same scope share one cache.
//!
//! Coalescing matters for correctness-adjacent performance: the first load
//! in a scheduling tick becomes the dispatcher and yields once before
//! draining the pending key set, which gives sibling resolvers the chance to
//! enqueue their keys into the same underlying fetch. Dispatching eagerly on
//! the first request would defeat batching entirely.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tokio::sync::{watch, Mutex};

use crate::error::{GatewayError, Result};
use crate::models::Entity;
use crate::scope::ScopeFilter;
use crate::storage::{FilterSet, StorageBackend};

/// Compound identity of a loader: two lookups share a cache only when their
/// tag, scope, and extra params are all equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LoaderKey {
    tag: &'static str,
    scope: ScopeFilter,
    params: Vec<(&'static str, String)>,
}

impl LoaderKey {
    pub fn new(tag: &'static str) -> Self {
        Self { tag, scope: ScopeFilter::default(), params: Vec::new() }
    }

    pub fn scoped(mut self, scope: ScopeFilter) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_filters(mut self, filters: &FilterSet) -> Self {
        self.params = filters
            .entries()
            .iter()
            .map(|(field, value)| (*field, value.to_string()))
            .collect();
        self
    }

    pub fn tag(&self) -> &'static str {
        self.tag
    }
}

/// A source of batched fetches for one keyed lookup.
#[async_trait]
pub trait BatchSource: Send + Sync + 'static {
    type Key: Clone + Eq + Hash + Send + Sync + 'static;
    type Value: Clone + Send + Sync + 'static;

    /// The compound cache key identifying this lookup within a request.
    fn cache_key(&self) -> LoaderKey;

    /// Fetch all values for the given keys in one underlying call. Keys with
    /// no match must be left out of the result map.
    async fn load_batch(&self, keys: &[Self::Key]) -> Result<HashMap<Self::Key, Self::Value>>;

    /// Error raised when a singular load finds nothing for its key.
    fn on_missing(&self, _key: &Self::Key) -> GatewayError {
        GatewayError::GenericNotFound("no such object".into())
    }
}

enum CacheSlot<V> {
    Found(V),
    Missing,
    Failed(GatewayError),
}

struct LoaderState<K, V> {
    cache: HashMap<K, CacheSlot<V>>,
    pending: HashSet<K>,
    dispatching: bool,
}

/// Caching, coalescing loader over one [`BatchSource`].
///
/// Clones share the same cache; the manager relies on this to hand the same
/// loader to every resolver that asks for an equal cache key.
pub struct Loader<S: BatchSource> {
    source: Arc<S>,
    state: Arc<Mutex<LoaderState<S::Key, S::Value>>>,
    generation: Arc<watch::Sender<u64>>,
}

impl<S: BatchSource> Clone for Loader<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            state: Arc::clone(&self.state),
            generation: Arc::clone(&self.generation),
        }
    }
}

enum Step<V> {
    Resolved(Result<V>),
    Dispatch,
    Wait(watch::Receiver<u64>),
}

impl<S: BatchSource> Loader<S> {
    pub fn new(source: S) -> Self {
        let (tx, _rx) = watch::channel(0);
        Self {
            source: Arc::new(source),
            state: Arc::new(Mutex::new(LoaderState {
                cache: HashMap::new(),
                pending: HashSet::new(),
                dispatching: false,
            })),
            generation: Arc::new(tx),
        }
    }

    /// Loads a single value by key.
    ///
    /// Concurrent loads for equal keys share one underlying fetch and one
    /// cached result; loads enqueued while a dispatch is in flight are
    /// batched into the next one. A key absent in the underlying store fails
    /// with the source's entity-specific not-found error.
    pub async fn load(&self, key: S::Key) -> Result<S::Value> {
        loop {
            let step = {
                let mut state = self.state.lock().await;
                if let Some(slot) = state.cache.get(&key) {
                    let resolved = match slot {
                        CacheSlot::Found(v) => Ok(v.clone()),
                        CacheSlot::Missing => Err(self.source.on_missing(&key)),
                        CacheSlot::Failed(e) => Err(e.clone()),
                    };
                    Step::Resolved(resolved)
                } else {
                    state.pending.insert(key.clone());
                    if state.dispatching {
                        Step::Wait(self.generation.subscribe())
                    } else {
                        state.dispatching = true;
                        Step::Dispatch
                    }
                }
            };
            match step {
                Step::Resolved(result) => return result,
                Step::Dispatch => self.dispatch().await,
                Step::Wait(mut rx) => {
                    // A lost sender only happens when the loader itself is
                    // dropped mid-request; treat it as a wakeup and re-check.
                    let _ = rx.changed().await;
                }
            }
        }
    }

    async fn dispatch(&self) {
        // Let sibling resolvers scheduled in this tick enqueue their keys
        // before the batch is drained.
        tokio::task::yield_now().await;
        let keys: Vec<S::Key> = {
            let mut state = self.state.lock().await;
            state.pending.drain().collect()
        };
        tracing::debug!(
            tag = self.source.cache_key().tag(),
            keys = keys.len(),
            "dispatching batched fetch",
        );
        let outcome = self.source.load_batch(&keys).await;
        {
            let mut state = self.state.lock().await;
            match outcome {
                Ok(mut fetched) => {
                    for key in keys {
                        let slot = match fetched.remove(&key) {
                            Some(value) => CacheSlot::Found(value),
                            None => CacheSlot::Missing,
                        };
                        state.cache.insert(key, slot);
                    }
                }
                Err(err) => {
                    for key in keys {
                        state.cache.insert(key, CacheSlot::Failed(err.clone()));
                    }
                }
            }
            state.dispatching = false;
        }
        self.generation.send_modify(|gen| *gen = gen.wrapping_add(1));
    }
}

/// Per-request registry of loaders, keyed by compound [`LoaderKey`].
///
/// One manager is created per incoming request and dropped with it; caches
/// never leak across requests or tenants.
#[derive(Default)]
pub struct DataLoaderManager {
    loaders: StdMutex<HashMap<LoaderKey, Box<dyn Any + Send + Sync>>>,
}

impl DataLoaderManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the loader registered under the source's cache key, creating
    /// it from `source` on first use.
    pub fn get_loader<S: BatchSource>(&self, source: S) -> Loader<S> {
        let key = source.cache_key();
        let mut loaders = self.loaders.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = loaders.get(&key).and_then(|l| l.downcast_ref::<Loader<S>>()) {
            return existing.clone();
        }
        let loader = Loader::new(source);
        loaders.insert(key, Box::new(loader.clone()));
        loader
    }
}

/// Singular lookup source: at most one entity per key, backed by
/// [`StorageBackend::fetch_by_keys`]. A key with no row resolves to the
/// entity's not-found error.
pub struct EntitySource<E: Entity> {
    storage: Arc<dyn StorageBackend>,
    tag: &'static str,
    scope: ScopeFilter,
    filters: FilterSet,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> EntitySource<E> {
    pub fn new(storage: Arc<dyn StorageBackend>, tag: &'static str, scope: ScopeFilter) -> Self {
        Self { storage, tag, scope, filters: FilterSet::new(), _entity: PhantomData }
    }

    pub fn filter<V: Into<JsonValue>>(mut self, field: &'static str, value: Option<V>) -> Self {
        self.filters = self.filters.maybe(field, value);
        self
    }
}

#[async_trait]
impl<E: Entity> BatchSource for EntitySource<E> {
    type Key = String;
    type Value = E;

    fn cache_key(&self) -> LoaderKey {
        LoaderKey::new(self.tag)
            .scoped(self.scope.clone())
            .with_filters(&self.filters)
    }

    async fn load_batch(&self, keys: &[String]) -> Result<HashMap<String, E>> {
        let mut grouped = self
            .storage
            .fetch_by_keys(self.tag, keys, &self.scope, &self.filters)
            .await?;
        let mut out = HashMap::with_capacity(keys.len());
        for key in keys {
            if let Some(rows) = grouped.remove(key) {
                if let Some(row) = rows.first() {
                    out.insert(key.clone(), E::from_row(row)?);
                }
            }
        }
        Ok(out)
    }

    fn on_missing(&self, _key: &String) -> GatewayError {
        E::not_found()
    }
}

/// List-valued lookup source: zero or more entities per key. Keys with no
/// rows resolve to an empty sequence, never to a not-found error.
pub struct ListSource<E: Entity> {
    storage: Arc<dyn StorageBackend>,
    tag: &'static str,
    scope: ScopeFilter,
    filters: FilterSet,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> ListSource<E> {
    pub fn new(storage: Arc<dyn StorageBackend>, tag: &'static str, scope: ScopeFilter) -> Self {
        Self { storage, tag, scope, filters: FilterSet::new(), _entity: PhantomData }
    }

    pub fn filter<V: Into<JsonValue>>(mut self, field: &'static str, value: Option<V>) -> Self {
        self.filters = self.filters.maybe(field, value);
        self
    }
}

#[async_trait]
impl<E: Entity> BatchSource for ListSource<E> {
    type Key = String;
    type Value = Vec<E>;

    fn cache_key(&self) -> LoaderKey {
        LoaderKey::new(self.tag)
            .scoped(self.scope.clone())
            .with_filters(&self.filters)
    }

    async fn load_batch(&self, keys: &[String]) -> Result<HashMap<String, Vec<E>>> {
        let mut grouped = self
            .storage
            .fetch_by_keys(self.tag, keys, &self.scope, &self.filters)
            .await?;
        let mut out = HashMap::with_capacity(keys.len());
        for key in keys {
            let rows = grouped.remove(key).unwrap_or_default();
            let entities = rows.iter().map(E::from_row).collect::<Result<Vec<E>>>()?;
            out.insert(key.clone(), entities);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        fetches: Arc<AtomicUsize>,
        tag: &'static str,
    }

    #[async_trait]
    impl BatchSource for CountingSource {
        type Key = String;
        type Value = String;

        fn cache_key(&self) -> LoaderKey {
            LoaderKey::new(self.tag)
        }

        async fn load_batch(&self, keys: &[String]) -> Result<HashMap<String, String>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(keys
                .iter()
                .filter(|k| !k.starts_with("missing"))
                .map(|k| (k.clone(), format!("value-{k}")))
                .collect())
        }

        fn on_missing(&self, _key: &String) -> GatewayError {
            GatewayError::ObjectNotFound { object: "thing" }
        }
    }

    fn counting_loader(fetches: &Arc<AtomicUsize>) -> Loader<CountingSource> {
        Loader::new(CountingSource { fetches: Arc::clone(fetches), tag: "thing.by_id" })
    }

    #[tokio::test]
    async fn concurrent_loads_for_one_key_share_one_fetch() {
        let fetches = Arc::new(AtomicUsize::new(0));
        let loader = counting_loader(&fetches);
        let (a, b, c) = tokio::join!(
            loader.load("k1".to_string()),
            loader.load("k1".to_string()),
            loader.load("k1".to_string()),
        );
        assert_eq!(a.unwrap(), "value-k1");
        assert_eq!(b.unwrap(), "value-k1");
        assert_eq!(c.unwrap(), "value-k1");
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_loads_for_different_keys_are_batched() {
        let fetches = Arc::new(AtomicUsize::new(0));
        let loader = counting_loader(&fetches);
        let (a, b) = tokio::join!(
            loader.load("k1".to_string()),
            loader.load("k2".to_string()),
        );
        assert_eq!(a.unwrap(), "value-k1");
        assert_eq!(b.unwrap(), "value-k2");
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn repeated_loads_hit_the_cache() {
        let fetches = Arc::new(AtomicUsize::new(0));
        let loader = counting_loader(&fetches);
        loader.load("k1".to_string()).await.unwrap();
        loader.load("k1".to_string()).await.unwrap();
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_key_fails_with_entity_not_found() {
        let fetches = Arc::new(AtomicUsize::new(0));
        let loader = counting_loader(&fetches);
        let err = loader.load("missing-1".to_string()).await.unwrap_err();
        assert_eq!(err, GatewayError::ObjectNotFound { object: "thing" });
        // The miss itself is cached; retrying must not refetch.
        let _ = loader.load("missing-1".to_string()).await;
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn manager_deduplicates_loaders_by_compound_key() {
        let fetches = Arc::new(AtomicUsize::new(0));
        let manager = DataLoaderManager::new();
        let first = manager.get_loader(CountingSource {
            fetches: Arc::clone(&fetches),
            tag: "thing.by_id",
        });
        first.load("k1".to_string()).await.unwrap();
        // Same compound key: must reuse the cached loader and its cache.
        let second = manager.get_loader(CountingSource {
            fetches: Arc::clone(&fetches),
            tag: "thing.by_id",
        });
        second.load("k1".to_string()).await.unwrap();
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        // A different tag gets a fresh loader.
        let third = manager.get_loader(CountingSource {
            fetches: Arc::clone(&fetches),
            tag: "thing.by_name",
        });
        third.load("k1".to_string()).await.unwrap();
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }
}
