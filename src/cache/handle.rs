//! Cache Handle Module
//!
//! `Cache` is the shared, cloneable entry point to one `CacheStore`. It is
//! built once at startup and handed to the request client, the query facade
//! and the domain wrappers.
//!
//! Nothing here returns a storage error to its caller: serialization and
//! persistence failures are logged, counted in `CacheStats::storage_errors`,
//! and degrade to miss behavior.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::cache::{
    CacheEntry, CacheStats, CacheStore, FilePersistence, KeyPattern, Persistence, Ttl, TtlPolicy,
};
use crate::config::Config;
use crate::error::{CacheError, RequestError, Result};

type FlightValue = Arc<dyn Any + Send + Sync>;
type FlightFuture = Shared<BoxFuture<'static, std::result::Result<FlightValue, RequestError>>>;

/// A fetch currently running for one key. Later callers await the same
/// future instead of issuing their own.
struct InFlight {
    id: u64,
    fetch: FlightFuture,
}

struct CacheInner {
    store: RwLock<CacheStore>,
    persistence: Option<Arc<dyn Persistence>>,
    in_flight: Mutex<HashMap<String, InFlight>>,
    next_flight_id: AtomicU64,
}

// == Cache ==
/// Cloneable handle to the process-wide cache.
#[derive(Clone)]
pub struct Cache {
    inner: Arc<CacheInner>,
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("persistent", &self.inner.persistence.is_some())
            .finish_non_exhaustive()
    }
}

impl Cache {
    // == Constructors ==
    /// Wraps a purely in-memory store.
    pub fn new(store: CacheStore) -> Self {
        Self::build(store, None)
    }

    /// Wraps a store that writes through to `persistence`. Call
    /// [`Cache::hydrate`] to reload previously persisted entries.
    pub fn with_persistence(store: CacheStore, persistence: Arc<dyn Persistence>) -> Self {
        Self::build(store, Some(persistence))
    }

    fn build(store: CacheStore, persistence: Option<Arc<dyn Persistence>>) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                store: RwLock::new(store),
                persistence,
                in_flight: Mutex::new(HashMap::new()),
                next_flight_id: AtomicU64::new(1),
            }),
        }
    }

    /// Builds the cache described by `config`.
    ///
    /// Fails only on an invalid TTL table. An unusable `cache_dir` is logged
    /// and the cache runs in memory.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let store = CacheStore::new(config.max_entries, config.ttl_policy()?);

        let Some(dir) = &config.cache_dir else {
            return Ok(Self::new(store));
        };

        match FilePersistence::open(dir).await {
            Ok(persistence) => {
                let cache = Self::with_persistence(store, Arc::new(persistence));
                let restored = cache.hydrate().await;
                info!(
                    "Restored {} cache entries from {}",
                    restored,
                    dir.display()
                );
                Ok(cache)
            }
            Err(err) => {
                warn!(
                    "Cache directory {} unusable ({}), running in memory only",
                    dir.display(),
                    err
                );
                Ok(Self::new(store))
            }
        }
    }

    // == Get ==
    /// Returns the cached value for `key` if present and fresh.
    ///
    /// A value that no longer decodes as `T` is dropped and treated as a
    /// miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.inner.store.write().await.get(key);
        let Some(value) = value else {
            debug!(key, "cache miss");
            return None;
        };

        match serde_json::from_value(value) {
            Ok(decoded) => {
                debug!(key, "cache hit");
                Some(decoded)
            }
            Err(err) => {
                self.inner.store.write().await.delete(key);
                self.storage_failure(key, "decode", &err.into()).await;
                self.persist_remove(key).await;
                None
            }
        }
    }

    // == Set ==
    /// Stores `value` under `key`. Best effort: a value that cannot be
    /// serialized or persisted is logged and skipped.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Option<Ttl>) {
        match serde_json::to_value(value) {
            Ok(value) => self.set_value(key, value, ttl).await,
            Err(err) => self.storage_failure(key, "encode", &err.into()).await,
        }
    }

    async fn set_value(&self, key: &str, value: Value, ttl: Option<Ttl>) {
        let outcome = {
            let mut store = self.inner.store.write().await;
            store
                .set(key.to_string(), value, ttl)
                .map(|evicted| (evicted, store.peek(key).cloned()))
        };

        match outcome {
            Ok((evicted, entry)) => {
                debug!(key, ttl = %ttl.unwrap_or_default(), "cache set");
                if let Some(victim) = evicted {
                    debug!(key = %victim, "evicted least recently used entry");
                    self.persist_remove(&victim).await;
                }
                if let (Some(persistence), Some(entry)) = (&self.inner.persistence, entry) {
                    if let Err(err) = persistence.save(key, &entry).await {
                        self.storage_failure(key, "persist", &err).await;
                    }
                }
            }
            Err(err) => self.storage_failure(key, "set", &err).await,
        }
    }

    // == Delete ==
    /// Removes one entry. Returns whether it was cached.
    pub async fn delete(&self, key: &str) -> bool {
        let existed = self.inner.store.write().await.delete(key);
        self.persist_remove(key).await;
        existed
    }

    // == Invalidate ==
    /// Removes every entry matching `pattern` and returns how many were
    /// removed.
    pub async fn invalidate(&self, pattern: impl Into<KeyPattern>) -> usize {
        let pattern = pattern.into();
        let removed = self.inner.store.write().await.invalidate(&pattern);
        for key in &removed {
            self.persist_remove(key).await;
        }
        debug!(pattern = %pattern, removed = removed.len(), "cache invalidate");
        removed.len()
    }

    // == Clear ==
    pub async fn clear(&self) {
        let removed = self.inner.store.write().await.clear();
        if let Some(persistence) = &self.inner.persistence {
            if let Err(err) = persistence.clear().await {
                self.storage_failure("*", "clear", &err).await;
            }
        }
        info!("Cache cleared ({} entries)", removed);
    }

    // == Cleanup Expired ==
    /// Eagerly removes expired entries. Returns the number removed.
    pub async fn cleanup_expired(&self) -> usize {
        let expired = self.inner.store.write().await.cleanup_expired();
        for key in &expired {
            self.persist_remove(key).await;
        }
        expired.len()
    }

    // == Hydrate ==
    /// Reloads fresh entries from persistence into memory and deletes the
    /// stale ones. Returns the number restored.
    pub async fn hydrate(&self) -> usize {
        let Some(persistence) = &self.inner.persistence else {
            return 0;
        };

        let loaded = match persistence.load_all().await {
            Ok(loaded) => loaded,
            Err(err) => {
                self.storage_failure("*", "load", &err).await;
                return 0;
            }
        };

        let mut stale = Vec::new();
        let mut restored = 0;
        {
            let mut store = self.inner.store.write().await;
            let now = store.now_ms();
            for (key, entry) in loaded {
                if entry.is_expired(now) {
                    stale.push(key);
                } else {
                    if let Some(victim) = store.insert_entry(key, entry) {
                        stale.push(victim);
                    }
                    restored += 1;
                }
            }
        }

        for key in &stale {
            self.persist_remove(key).await;
        }
        restored
    }

    // == Inspection ==
    pub async fn stats(&self) -> CacheStats {
        self.inner.store.read().await.stats()
    }

    /// Fresh entry for `key`, without counting a hit or miss.
    pub async fn entry(&self, key: &str) -> Option<CacheEntry> {
        self.inner.store.read().await.peek(key).cloned()
    }

    pub async fn keys(&self) -> Vec<String> {
        self.inner.store.read().await.keys()
    }

    pub async fn policy(&self) -> TtlPolicy {
        self.inner.store.read().await.policy()
    }

    /// Number of keys with a fetch currently running.
    pub fn in_flight(&self) -> usize {
        self.flights().len()
    }

    // == Fetch Through ==
    /// Read-through lookup: serves a fresh cached value, otherwise runs
    /// `fetcher`, caches its result at `ttl` and returns it.
    ///
    /// Concurrent misses on the same key share a single running fetch.
    /// With `force` the cache read is skipped and a new fetch always runs,
    /// superseding any fetch already running for the key. Errors are never
    /// cached.
    pub async fn fetch_through<T, F, Fut>(
        &self,
        key: &str,
        ttl: Option<Ttl>,
        force: bool,
        fetcher: F,
    ) -> std::result::Result<T, RequestError>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, RequestError>> + Send + 'static,
    {
        if !force {
            if let Some(hit) = self.get::<T>(key).await {
                return Ok(hit);
            }
        }
        self.fetch_shared(key, ttl, force, fetcher).await
    }

    /// Flight handling behind [`Cache::fetch_through`], without the cache
    /// read. `fresh` starts a new flight even when one is running; only the
    /// newest flight for a key writes its result to the cache.
    pub(crate) async fn fetch_shared<T, F, Fut>(
        &self,
        key: &str,
        ttl: Option<Ttl>,
        fresh: bool,
        fetcher: F,
    ) -> std::result::Result<T, RequestError>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, RequestError>> + Send + 'static,
    {
        let (flight, unused_fetcher) = {
            let mut flights = self.flights();
            match flights.get(key) {
                Some(running) if !fresh => (running.fetch.clone(), Some(fetcher)),
                _ => {
                    let id = self.inner.next_flight_id.fetch_add(1, Ordering::Relaxed);
                    let fetch = self.start_flight(key, id, ttl, fetcher());
                    let previous = flights.insert(
                        key.to_string(),
                        InFlight {
                            id,
                            fetch: fetch.clone(),
                        },
                    );
                    if previous.is_some() {
                        debug!(key, "superseding in-flight fetch");
                    }
                    (fetch, None)
                }
            }
        };

        if unused_fetcher.is_some() {
            debug!(key, "joining in-flight fetch");
        }

        let shared = flight.await?;
        if let Some(value) = shared.downcast_ref::<T>() {
            return Ok(value.clone());
        }

        // Same key fetched as a different type: fall back to our own fetch
        match unused_fetcher {
            Some(fetcher) => {
                let value = fetcher().await?;
                self.set(key, &value, ttl).await;
                Ok(value)
            }
            None => Err(RequestError::Decode(format!(
                "fetch for {key} produced an unexpected type"
            ))),
        }
    }

    fn start_flight<T, Fut>(&self, key: &str, id: u64, ttl: Option<Ttl>, fut: Fut) -> FlightFuture
    where
        T: Serialize + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<T, RequestError>> + Send + 'static,
    {
        let weak: Weak<CacheInner> = Arc::downgrade(&self.inner);
        let key = key.to_string();

        async move {
            let result = fut.await;
            if let Some(inner) = weak.upgrade() {
                let cache = Cache { inner };
                // A superseded flight must not overwrite its successor's result
                if cache.is_current_flight(&key, id) {
                    if let Ok(value) = &result {
                        cache.set(&key, value, ttl).await;
                    }
                    cache.finish_flight(&key, id);
                }
            }
            result.map(|value| Arc::new(value) as FlightValue)
        }
        .boxed()
        .shared()
    }

    fn is_current_flight(&self, key: &str, id: u64) -> bool {
        self.flights().get(key).is_some_and(|running| running.id == id)
    }

    fn finish_flight(&self, key: &str, id: u64) {
        let mut flights = self.flights();
        if flights.get(key).is_some_and(|running| running.id == id) {
            flights.remove(key);
        }
    }

    fn flights(&self) -> std::sync::MutexGuard<'_, HashMap<String, InFlight>> {
        self.inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // == Failure Handling ==
    async fn persist_remove(&self, key: &str) {
        if let Some(persistence) = &self.inner.persistence {
            if let Err(err) = persistence.remove(key).await {
                self.storage_failure(key, "unpersist", &err).await;
            }
        }
    }

    async fn storage_failure(&self, key: &str, operation: &str, err: &CacheError) {
        warn!(key, operation, error = %err, "cache storage failure ignored");
        self.inner.store.write().await.record_storage_error();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use async_trait::async_trait;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn test_cache() -> (Cache, ManualClock) {
        let clock = ManualClock::new(0);
        let store = CacheStore::with_clock(100, TtlPolicy::default(), Arc::new(clock.clone()));
        (Cache::new(store), clock)
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Plot {
        id: String,
        area: f64,
    }

    /// Serializes fine on the way in, never on the way out.
    #[derive(Debug, Clone)]
    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> std::result::Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("refuses to serialize"))
        }
    }

    impl<'de> Deserialize<'de> for Unserializable {
        fn deserialize<D: serde::Deserializer<'de>>(_: D) -> std::result::Result<Self, D::Error> {
            Ok(Unserializable)
        }
    }

    #[derive(Debug)]
    struct BrokenDisk;

    #[async_trait]
    impl Persistence for BrokenDisk {
        async fn load_all(&self) -> Result<Vec<(String, CacheEntry)>> {
            Err(CacheError::Storage("disk unplugged".into()))
        }
        async fn save(&self, _: &str, _: &CacheEntry) -> Result<()> {
            Err(CacheError::Storage("disk full".into()))
        }
        async fn remove(&self, _: &str) -> Result<()> {
            Err(CacheError::Storage("read-only".into()))
        }
        async fn clear(&self) -> Result<()> {
            Err(CacheError::Storage("read-only".into()))
        }
    }

    #[tokio::test]
    async fn test_typed_set_and_get() {
        let (cache, _) = test_cache();
        let plot = Plot {
            id: "p1".into(),
            area: 2.5,
        };

        cache.set("plots:detail:p1", &plot, Some(Ttl::Long)).await;

        assert_eq!(cache.get::<Plot>("plots:detail:p1").await, Some(plot));
        assert_eq!(cache.stats().await.hits, 1);
    }

    #[tokio::test]
    async fn test_expired_read_is_miss_and_purged() {
        let (cache, clock) = test_cache();
        cache.set("k", &json!(1), Some(Ttl::Millis(1_000))).await;

        clock.advance(Duration::from_millis(1_001));

        assert_eq!(cache.get::<Value>("k").await, None);
        assert_eq!(cache.stats().await.total_entries, 0);
    }

    #[tokio::test]
    async fn test_shape_mismatch_is_miss() {
        let (cache, _) = test_cache();
        cache.set("plots:detail:p1", &json!("not a plot"), None).await;

        assert_eq!(cache.get::<Plot>("plots:detail:p1").await, None);
        let stats = cache.stats().await;
        assert_eq!(stats.storage_errors, 1);
        assert_eq!(stats.total_entries, 0);
    }

    #[tokio::test]
    async fn test_unserializable_value_is_skipped() {
        let (cache, _) = test_cache();
        cache.set("k", &Unserializable, None).await;

        assert_eq!(cache.get::<Value>("k").await, None);
        assert_eq!(cache.stats().await.storage_errors, 1);
    }

    #[tokio::test]
    async fn test_broken_persistence_keeps_memory_cache_working() {
        let store = CacheStore::new(10, TtlPolicy::default());
        let cache = Cache::with_persistence(store, Arc::new(BrokenDisk));

        assert_eq!(cache.hydrate().await, 0);
        cache.set("k", &json!("v"), None).await;
        assert_eq!(cache.get::<String>("k").await, Some("v".to_string()));
        assert!(cache.delete("k").await);
        cache.clear().await;

        // load, save, remove, clear
        assert_eq!(cache.stats().await.storage_errors, 4);
    }

    #[tokio::test]
    async fn test_hydrate_restores_fresh_entries_only() {
        let tmp = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(10_000);
        let persistence = Arc::new(FilePersistence::open(tmp.path()).await.unwrap());

        let first = Cache::with_persistence(
            CacheStore::with_clock(10, TtlPolicy::default(), Arc::new(clock.clone())),
            persistence.clone(),
        );
        first.set("fresh", &json!(1), Some(Ttl::Long)).await;
        first.set("stale", &json!(2), Some(Ttl::Millis(10))).await;

        clock.advance(Duration::from_secs(1));

        let second = Cache::with_persistence(
            CacheStore::with_clock(10, TtlPolicy::default(), Arc::new(clock.clone())),
            persistence.clone(),
        );
        assert_eq!(second.hydrate().await, 1);
        assert_eq!(second.get::<i32>("fresh").await, Some(1));
        assert_eq!(second.get::<i32>("stale").await, None);
        assert_eq!(persistence.load_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_through_miss_then_hit() {
        let (cache, _) = test_cache();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let calls = calls.clone();
            let value: String = cache
                .fetch_through("producers:detail:1", None, false, move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("Amina".to_string())
                })
                .await
                .unwrap();
            assert_eq!(value, "Amina");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_through_force_refetches() {
        let (cache, _) = test_cache();
        cache.set("k", &1, None).await;

        let value: i32 = cache
            .fetch_through("k", None, true, || async { Ok(2) })
            .await
            .unwrap();

        assert_eq!(value, 2);
        assert_eq!(cache.get::<i32>("k").await, Some(2));
    }

    #[tokio::test]
    async fn test_fetch_through_error_not_cached() {
        let (cache, _) = test_cache();

        let result: std::result::Result<i32, _> = cache
            .fetch_through("k", None, false, || async {
                Err(RequestError::NotFound("plot".into()))
            })
            .await;

        assert_eq!(result, Err(RequestError::NotFound("plot".into())));
        assert!(cache.keys().await.is_empty());
        assert_eq!(cache.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_misses_share_one_fetch() {
        let (cache, _) = test_cache();
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(tokio::sync::Notify::new());

        let spawn_reader = |cache: Cache| {
            let calls = calls.clone();
            let gate = gate.clone();
            tokio::spawn(async move {
                cache
                    .fetch_through::<Vec<String>, _, _>("crops:plot:9", None, false, move || {
                        async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            gate.notified().await;
                            Ok(vec!["maize".to_string()])
                        }
                    })
                    .await
            })
        };

        let first = spawn_reader(cache.clone());
        let second = spawn_reader(cache.clone());

        // Let both readers reach the in-flight slot
        while cache.in_flight() == 0 {
            tokio::task::yield_now().await;
        }
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        gate.notify_one();

        assert_eq!(first.await.unwrap().unwrap(), vec!["maize".to_string()]);
        assert_eq!(second.await.unwrap().unwrap(), vec!["maize".to_string()]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_forced_fetch_supersedes_running_fetch() {
        let (cache, _) = test_cache();
        let gate = Arc::new(tokio::sync::Notify::new());

        let stale = {
            let cache = cache.clone();
            let gate = gate.clone();
            tokio::spawn(async move {
                cache
                    .fetch_through::<String, _, _>("plots:detail:1", None, false, move || {
                        async move {
                            gate.notified().await;
                            Ok("before".to_string())
                        }
                    })
                    .await
            })
        };
        while cache.in_flight() == 0 {
            tokio::task::yield_now().await;
        }

        let fresh: String = cache
            .fetch_through("plots:detail:1", None, true, || async {
                Ok("after".to_string())
            })
            .await
            .unwrap();
        assert_eq!(fresh, "after");

        gate.notify_one();
        assert_eq!(stale.await.unwrap().unwrap(), "before");

        // The older flight finished last but does not overwrite the newer one
        assert_eq!(
            cache.get::<String>("plots:detail:1").await.as_deref(),
            Some("after")
        );
        assert_eq!(cache.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_fetch_result_returned_even_if_caching_fails() {
        let (cache, _) = test_cache();

        let value = cache
            .fetch_through("k", None, false, || async { Ok(Unserializable) })
            .await;

        assert!(value.is_ok());
        assert_eq!(cache.stats().await.storage_errors, 1);
    }
}
