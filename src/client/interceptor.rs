//! Interceptor Module
//!
//! Ordered hooks around every request. Each stage feeds the next; a stage
//! that fails (or panics) sends the request down the error path.

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::cache::Ttl;
use crate::client::{CacheMode, Request};
use crate::error::RequestError;

/// Hooks run by the client. All stages default to pass-through.
pub trait Interceptor: Send + Sync {
    /// Used in logs.
    fn name(&self) -> &str {
        "interceptor"
    }

    /// Rewrites the outgoing request, or rejects it.
    fn on_request(&self, request: Request) -> Result<Request, RequestError> {
        Ok(request)
    }

    /// Rewrites a transport response, or rejects it.
    fn on_response(&self, _request: &Request, data: Value) -> Result<Value, RequestError> {
        Ok(data)
    }

    /// Translates or enriches a terminal error.
    fn on_error(&self, _request: &Request, error: RequestError) -> RequestError {
        error
    }
}

// == Interceptor Chain ==
#[derive(Clone, Default)]
pub struct InterceptorChain {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an interceptor; registration order is execution order.
    pub fn push(&mut self, interceptor: Arc<dyn Interceptor>) {
        self.interceptors.push(interceptor);
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    pub fn apply_request(&self, mut request: Request) -> Result<Request, RequestError> {
        for interceptor in &self.interceptors {
            request = guarded(interceptor.name(), || interceptor.on_request(request))?;
        }
        Ok(request)
    }

    pub fn apply_response(&self, request: &Request, mut data: Value) -> Result<Value, RequestError> {
        for interceptor in &self.interceptors {
            data = guarded(interceptor.name(), || interceptor.on_response(request, data))?;
        }
        Ok(data)
    }

    /// Error hooks cannot fail; a panicking one is skipped and the error
    /// it received moves on unchanged.
    pub fn apply_error(&self, request: &Request, mut error: RequestError) -> RequestError {
        for interceptor in &self.interceptors {
            let input = error.clone();
            error = match catch_unwind(AssertUnwindSafe(|| interceptor.on_error(request, input))) {
                Ok(translated) => translated,
                Err(_) => {
                    warn!(interceptor = interceptor.name(), "error interceptor panicked");
                    error
                }
            };
        }
        error
    }
}

fn guarded<T>(
    name: &str,
    stage: impl FnOnce() -> Result<T, RequestError>,
) -> Result<T, RequestError> {
    match catch_unwind(AssertUnwindSafe(stage)) {
        Ok(result) => result,
        Err(_) => {
            warn!(interceptor = name, "interceptor panicked");
            Err(RequestError::Rejected(format!("interceptor {name} panicked")))
        }
    }
}

// == Default Headers ==
/// Adds headers the caller did not set.
#[derive(Debug, Clone, Default)]
pub struct DefaultHeaders {
    headers: BTreeMap<String, String>,
}

impl DefaultHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

impl Interceptor for DefaultHeaders {
    fn name(&self) -> &str {
        "default_headers"
    }

    fn on_request(&self, mut request: Request) -> Result<Request, RequestError> {
        for (name, value) in &self.headers {
            request
                .headers
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }
        Ok(request)
    }
}

// == Default Cache Policy ==
/// Turns caching on for reads that did not choose a cache mode.
#[derive(Debug, Clone, Copy)]
pub struct DefaultCachePolicy {
    ttl: Ttl,
}

impl DefaultCachePolicy {
    pub fn new(ttl: Ttl) -> Self {
        Self { ttl }
    }
}

impl Interceptor for DefaultCachePolicy {
    fn name(&self) -> &str {
        "default_cache_policy"
    }

    fn on_request(&self, mut request: Request) -> Result<Request, RequestError> {
        if request.target.is_read() && request.cache == CacheMode::Unset {
            request.cache = CacheMode::Ttl(self.ttl);
        }
        Ok(request)
    }
}
