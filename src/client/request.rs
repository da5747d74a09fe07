//! Request Module
//!
//! One logical backend call and the response handed back to callers.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::cache::Ttl;

// == Target ==
/// What a request operates on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Target {
    Select { table: String },
    Insert { table: String },
    Update { table: String },
    Delete { table: String },
    Rpc { function: String },
}

impl Target {
    /// Reads are safe to cache and to retry.
    pub fn is_read(&self) -> bool {
        matches!(self, Target::Select { .. } | Target::Rpc { .. })
    }

    pub fn resource(&self) -> &str {
        match self {
            Target::Select { table }
            | Target::Insert { table }
            | Target::Update { table }
            | Target::Delete { table } => table,
            Target::Rpc { function } => function,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = match self {
            Target::Select { .. } => "select",
            Target::Insert { .. } => "insert",
            Target::Update { .. } => "update",
            Target::Delete { .. } => "delete",
            Target::Rpc { .. } => "rpc",
        };
        write!(f, "{}:{}", action, self.resource())
    }
}

// == Cache Mode ==
/// Caching requested for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Nothing chosen yet; interceptors may pick a policy
    #[default]
    Unset,
    /// Never read or write the cache
    Bypass,
    /// Serve from and store into the cache at this lifetime
    Ttl(Ttl),
}

// == Request ==
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub target: Target,
    /// Column equality filters
    pub filters: BTreeMap<String, String>,
    pub body: Option<Value>,
    pub headers: BTreeMap<String, String>,
    pub cache: CacheMode,
    /// Whether transient failures may be retried
    pub retry: bool,
    /// Overrides the client default timeout
    pub timeout: Option<Duration>,
}

impl Request {
    pub fn new(target: Target) -> Self {
        // Inserts are not idempotent, so they are not retried by default
        let retry = !matches!(target, Target::Insert { .. });
        Self {
            target,
            filters: BTreeMap::new(),
            body: None,
            headers: BTreeMap::new(),
            cache: CacheMode::Unset,
            retry,
            timeout: None,
        }
    }

    pub fn select(table: impl Into<String>) -> Self {
        Self::new(Target::Select {
            table: table.into(),
        })
    }

    pub fn insert(table: impl Into<String>, body: Value) -> Self {
        Self::new(Target::Insert {
            table: table.into(),
        })
        .body(body)
    }

    pub fn update(table: impl Into<String>, body: Value) -> Self {
        Self::new(Target::Update {
            table: table.into(),
        })
        .body(body)
    }

    pub fn delete(table: impl Into<String>) -> Self {
        Self::new(Target::Delete {
            table: table.into(),
        })
    }

    pub fn rpc(function: impl Into<String>, args: Value) -> Self {
        Self::new(Target::Rpc {
            function: function.into(),
        })
        .body(args)
    }

    // == Builders ==
    pub fn filter(mut self, column: impl Into<String>, value: impl fmt::Display) -> Self {
        self.filters.insert(column.into(), value.to_string());
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn cached(mut self, ttl: Ttl) -> Self {
        self.cache = CacheMode::Ttl(ttl);
        self
    }

    pub fn no_cache(mut self) -> Self {
        self.cache = CacheMode::Bypass;
        self
    }

    pub fn retry(mut self, retry: bool) -> Self {
        self.retry = retry;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    // == Cache Key ==
    /// Deterministic key for this request's result. Filters and body are
    /// rendered as canonical JSON, so identical requests share a key and
    /// distinct ones never do.
    pub fn cache_key(&self) -> String {
        let mut key = format!("api:{}", self.target);
        if !self.filters.is_empty() {
            key.push('?');
            key.push_str(&Value::from_iter(self.filters.clone()).to_string());
        }
        if let Some(body) = &self.body {
            key.push('#');
            key.push_str(&body.to_string());
        }
        key
    }
}

// == Response ==
#[derive(Debug, Clone, PartialEq)]
pub struct Response<T> {
    pub data: T,
    /// Served from the cache without calling the transport
    pub cached: bool,
    /// Transport attempts made; 0 when the first pass hit the cache
    pub attempts: u32,
    pub elapsed: Duration,
}

impl<T> Response<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Response<U> {
        Response {
            data: f(self.data),
            cached: self.cached,
            attempts: self.attempts,
            elapsed: self.elapsed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_target_display() {
        assert_eq!(Request::select("plots").target.to_string(), "select:plots");
        assert_eq!(
            Request::rpc("get_agent_dashboard", json!({})).target.to_string(),
            "rpc:get_agent_dashboard"
        );
    }

    #[test]
    fn test_cache_key_is_order_independent() {
        let a = Request::select("visits")
            .filter("agent_id", "a1")
            .filter("status", "planned");
        let b = Request::select("visits")
            .filter("status", "planned")
            .filter("agent_id", "a1");

        assert_eq!(a.cache_key(), b.cache_key());
        assert_eq!(
            a.cache_key(),
            r#"api:select:visits?{"agent_id":"a1","status":"planned"}"#
        );
    }

    #[test]
    fn test_cache_key_distinguishes_rpc_args() {
        let a = Request::rpc("get_plots_by_agent", json!({"agent_id": "a1"}));
        let b = Request::rpc("get_plots_by_agent", json!({"agent_id": "a2"}));
        assert_ne!(a.cache_key(), b.cache_key());

        // serde_json objects are sorted, so key order in the literal is irrelevant
        let c = Request::rpc("f", json!({"b": 1, "a": 2}));
        let d = Request::rpc("f", json!({"a": 2, "b": 1}));
        assert_eq!(c.cache_key(), d.cache_key());
    }

    #[test]
    fn test_cache_key_filter_values_cannot_forge_columns() {
        let packed = Request::select("crops").filter("a", "1&b=2");
        let split = Request::select("crops").filter("a", 1).filter("b", 2);
        assert_ne!(packed.cache_key(), split.cache_key());
    }

    #[test]
    fn test_insert_not_retried_by_default() {
        assert!(!Request::insert("visits", json!({})).retry);
        assert!(Request::select("visits").retry);
        assert!(Request::update("visits", json!({})).retry);
    }

    #[test]
    fn test_builders() {
        let request = Request::select("alerts")
            .cached(Ttl::Short)
            .header("x-client", "mobile")
            .timeout(Duration::from_secs(2))
            .retry(false);

        assert_eq!(request.cache, CacheMode::Ttl(Ttl::Short));
        assert_eq!(request.headers.get("x-client").map(String::as_str), Some("mobile"));
        assert_eq!(request.timeout, Some(Duration::from_secs(2)));
        assert!(!request.retry);
        assert_eq!(request.no_cache().cache, CacheMode::Bypass);
    }
}
