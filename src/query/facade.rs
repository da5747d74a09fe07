//! Query Facade Module
//!
//! A `Query` binds one cache key to a fetcher. Activation serves the cache
//! or fetches on a miss; `refetch` always goes to the fetcher. All failures
//! end up in `QueryState::error`, nothing is returned to the caller.

use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::cache::Cache;
use crate::error::RequestError;
use crate::query::{QueryOptions, QueryState};

/// Type-erased fetcher shared by every refetch of one query.
pub type Fetcher<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, RequestError>> + Send + Sync>;

struct QueryInner<T> {
    cache: Cache,
    key: Option<String>,
    fetcher: Fetcher<T>,
    options: QueryOptions<T>,
    state: watch::Sender<QueryState<T>>,
    enabled: AtomicBool,
    /// Cleared on dispose; nothing touches `state` afterwards
    alive: AtomicBool,
    activated: AtomicBool,
    /// Bumped by every load; only the newest load publishes its outcome
    generation: AtomicU64,
    interval: Mutex<Option<JoinHandle<()>>>,
}

// == Query ==
/// Read-through view of one cache key.
///
/// Dropping the query disposes it.
pub struct Query<T> {
    inner: Arc<QueryInner<T>>,
}

impl<T> Query<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Creates an inactive query. A `None` key disables it just like
    /// `enabled = false`. Call [`Query::mount`] to activate.
    pub fn new<F, Fut>(
        cache: Cache,
        key: Option<String>,
        fetcher: F,
        options: QueryOptions<T>,
    ) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, RequestError>> + Send + 'static,
    {
        let fetcher: Fetcher<T> = Arc::new(move || fetcher().boxed());
        let (state, _) = watch::channel(QueryState::idle());

        Self {
            inner: Arc::new(QueryInner {
                cache,
                key,
                fetcher,
                enabled: AtomicBool::new(options.enabled),
                options,
                state,
                alive: AtomicBool::new(true),
                activated: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                interval: Mutex::new(None),
            }),
        }
    }

    pub fn key(&self) -> Option<&str> {
        self.inner.key.as_deref()
    }

    /// Current snapshot.
    pub fn state(&self) -> QueryState<T> {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<QueryState<T>> {
        self.inner.state.subscribe()
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_active()
    }

    // == Activation ==
    /// First activation: serve the cache, or fetch on a miss. Later calls
    /// do nothing until the query is disabled and enabled again.
    pub async fn mount(&self) {
        if !self.inner.is_active() || self.inner.activated.swap(true, Ordering::SeqCst) {
            return;
        }

        self.start_interval();
        if self.inner.options.refetch_on_mount {
            self.inner.load(false).await;
        } else {
            self.inner.read_cache().await;
        }
    }

    /// Enabling activates the query; disabling stops the interval and
    /// resets the state to idle.
    pub async fn set_enabled(&self, enabled: bool) {
        let was = self.inner.enabled.swap(enabled, Ordering::SeqCst);
        if enabled && !was {
            self.mount().await;
        } else if !enabled && was {
            self.inner.stop_interval();
            self.inner.activated.store(false, Ordering::SeqCst);
            self.inner.update(|state| *state = QueryState::idle());
        }
    }

    // == Refetch ==
    /// Runs the fetcher regardless of what is cached and stores the result.
    pub async fn refetch(&self) {
        self.inner.load(true).await;
    }

    // == Invalidate ==
    /// Drops the cached entry and the local value without fetching.
    pub async fn invalidate(&self) {
        let Some(key) = &self.inner.key else {
            return;
        };
        self.inner.cache.delete(key).await;
        self.inner.update(|state| state.data = None);
    }

    // == Set Data ==
    /// Optimistic update: writes `value` to the cache and the local state
    /// without calling the fetcher.
    pub async fn set_data(&self, value: T) {
        let Some(key) = &self.inner.key else {
            return;
        };
        self.inner
            .cache
            .set(key, &value, self.inner.options.ttl)
            .await;
        self.inner.update(|state| {
            state.data = Some(value);
            state.error = None;
        });
    }

    // == Interval ==
    fn start_interval(&self) {
        let Some(period) = self.inner.options.refetch_interval else {
            return;
        };
        if period.is_zero() {
            warn!(key = ?self.inner.key, "ignoring zero refetch interval");
            return;
        }
        let weak = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(refetch_loop(weak, period));

        let previous = self
            .inner
            .interval
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }
}

impl<T> Query<T> {
    // == Dispose ==
    /// Deactivates for good. In-flight fetches still complete and cache
    /// their result but no longer touch this query's state.
    pub fn dispose(&self) {
        self.inner.alive.store(false, Ordering::SeqCst);
        self.inner.stop_interval();
    }
}

impl<T> Drop for Query<T> {
    fn drop(&mut self) {
        self.dispose();
    }
}

async fn refetch_loop<T>(weak: Weak<QueryInner<T>>, period: Duration)
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let Some(inner) = weak.upgrade() else {
            break;
        };
        if !inner.is_active() {
            break;
        }
        inner.load(true).await;
    }
}

impl<T> QueryInner<T> {
    fn stop_interval(&self) {
        let handle = self
            .interval
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

impl<T> QueryInner<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn is_active(&self) -> bool {
        self.key.is_some()
            && self.enabled.load(Ordering::SeqCst)
            && self.alive.load(Ordering::SeqCst)
    }

    fn update(&self, change: impl FnOnce(&mut QueryState<T>)) {
        if self.alive.load(Ordering::SeqCst) {
            self.state.send_modify(change);
        }
    }

    async fn read_cache(&self) -> bool {
        let Some(key) = &self.key else {
            return false;
        };
        match self.cache.get::<T>(key).await {
            Some(hit) => {
                self.update(|state| {
                    state.data = Some(hit);
                    state.loading = false;
                    state.error = None;
                });
                true
            }
            None => false,
        }
    }

    async fn load(&self, force: bool) {
        if !self.is_active() {
            return;
        }
        if !force && self.read_cache().await {
            return;
        }
        let Some(key) = &self.key else {
            return;
        };

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.update(|state| {
            state.loading = true;
            state.error = None;
        });

        // The cache was already consulted above. A forced load never joins
        // a fetch that started before it.
        let fetcher = self.fetcher.clone();
        let result = self
            .cache
            .fetch_shared(key, self.options.ttl, force, move || fetcher())
            .await;

        if !self.is_active() {
            debug!(key = %key, "query deactivated during fetch, dropping result");
            return;
        }
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(key = %key, "superseded by a newer load, dropping result");
            return;
        }

        match result {
            Ok(data) => {
                self.update(|state| {
                    state.data = Some(data.clone());
                    state.loading = false;
                    state.error = None;
                });
                if let Some(callback) = &self.options.on_success {
                    run_callback("on_success", || callback(&data));
                }
            }
            Err(error) => {
                warn!(key = %key, error = %error, "query fetch failed");
                self.update(|state| {
                    state.loading = false;
                    state.error = Some(error.clone());
                });
                if let Some(callback) = &self.options.on_error {
                    run_callback("on_error", || callback(&error));
                }
            }
        }
    }
}

fn run_callback(name: &str, callback: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(callback)).is_err() {
        warn!(callback = name, "query callback panicked");
    }
}

// == Cache Integration ==
impl Cache {
    /// Builds a query over this cache and mounts it.
    pub async fn query<T, F, Fut>(
        &self,
        key: Option<String>,
        fetcher: F,
        options: QueryOptions<T>,
    ) -> Query<T>
    where
        T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, RequestError>> + Send + 'static,
    {
        let query = Query::new(self.clone(), key, fetcher, options);
        query.mount().await;
        query
    }
}
