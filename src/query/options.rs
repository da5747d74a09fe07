//! Query Options Module

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::Ttl;
use crate::error::RequestError;

pub(crate) type ErrorCallback = Arc<dyn Fn(&RequestError) + Send + Sync>;
pub(crate) type SuccessCallback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Per-call-site settings for a [`Query`](crate::query::Query).
pub struct QueryOptions<T> {
    /// Lifetime of values this query writes; `None` resolves to medium
    pub ttl: Option<Ttl>,
    pub enabled: bool,
    /// Fetch on activation when the cache misses. When false, activation
    /// only reads the cache.
    pub refetch_on_mount: bool,
    /// Forced refetch period while the query is active
    pub refetch_interval: Option<Duration>,
    pub(crate) on_error: Option<ErrorCallback>,
    pub(crate) on_success: Option<SuccessCallback<T>>,
}

impl<T> QueryOptions<T> {
    pub fn new() -> Self {
        Self {
            ttl: None,
            enabled: true,
            refetch_on_mount: true,
            refetch_interval: None,
            on_error: None,
            on_success: None,
        }
    }

    pub fn ttl(mut self, ttl: Ttl) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn refetch_on_mount(mut self, refetch_on_mount: bool) -> Self {
        self.refetch_on_mount = refetch_on_mount;
        self
    }

    pub fn refetch_interval(mut self, interval: Duration) -> Self {
        self.refetch_interval = Some(interval);
        self
    }

    pub fn on_error(mut self, callback: impl Fn(&RequestError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(callback));
        self
    }

    pub fn on_success(mut self, callback: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(callback));
        self
    }
}

impl<T> Default for QueryOptions<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for QueryOptions<T> {
    fn clone(&self) -> Self {
        Self {
            ttl: self.ttl,
            enabled: self.enabled,
            refetch_on_mount: self.refetch_on_mount,
            refetch_interval: self.refetch_interval,
            on_error: self.on_error.clone(),
            on_success: self.on_success.clone(),
        }
    }
}

impl<T> fmt::Debug for QueryOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryOptions")
            .field("ttl", &self.ttl)
            .field("enabled", &self.enabled)
            .field("refetch_on_mount", &self.refetch_on_mount)
            .field("refetch_interval", &self.refetch_interval)
            .field("on_error", &self.on_error.is_some())
            .field("on_success", &self.on_success.is_some())
            .finish()
    }
}
