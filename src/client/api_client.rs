//! API Client Module
//!
//! Runs the request pipeline: request interceptors, the cache check,
//! the transport call under a timeout, response interceptors, then the
//! cache write. On failure it retries with backoff or hands the error to
//! the error interceptors.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::cache::Cache;
use crate::client::metrics::notify;
use crate::client::{
    CacheMode, ClientMetrics, DefaultHeaders, HttpTransport, Interceptor, InterceptorChain,
    Request, RequestEvent, RequestListener, Response, RetryPolicy, Transport,
};
use crate::config::Config;
use crate::error::RequestError;

/// Default whole-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

struct ClientInner {
    transport: Arc<dyn Transport>,
    cache: Cache,
    chain: RwLock<InterceptorChain>,
    listeners: RwLock<Vec<Arc<dyn RequestListener>>>,
    metrics: Mutex<ClientMetrics>,
    /// Active requests per target; an entry disappears when its count
    /// drops to zero
    in_flight: Mutex<HashMap<String, u32>>,
    retry: RetryPolicy,
    timeout: Duration,
}

/// Result of one pass through the pipeline.
enum Attempt {
    Cached { key: String, data: Value },
    Fetched(Value),
}

// == Api Client ==
/// Cloneable request client sharing one transport, cache and metrics.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

impl ApiClient {
    pub fn builder(transport: Arc<dyn Transport>, cache: Cache) -> ApiClientBuilder {
        ApiClientBuilder {
            transport,
            cache,
            chain: InterceptorChain::new(),
            listeners: Vec::new(),
            retry: RetryPolicy::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Client for the configured backend over HTTP.
    pub fn from_config(config: &Config, cache: Cache) -> Result<Self, RequestError> {
        let transport = HttpTransport::new(
            &config.backend_url,
            config.api_key.as_deref(),
            config.request_timeout(),
        )?;

        let headers = DefaultHeaders::new().with("x-client-info", "agriconnect-cache");

        Ok(Self::builder(Arc::new(transport), cache)
            .retry_policy(config.retry_policy())
            .timeout(config.request_timeout())
            .interceptor(Arc::new(headers))
            .build())
    }

    pub fn cache(&self) -> &Cache {
        &self.inner.cache
    }

    pub fn add_interceptor(&self, interceptor: Arc<dyn Interceptor>) {
        self.inner
            .chain
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(interceptor);
    }

    pub fn add_listener(&self, listener: Arc<dyn RequestListener>) {
        self.inner
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    pub fn metrics(&self) -> ClientMetrics {
        self.inner
            .metrics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Requests currently running against `target` (e.g. `select:plots`).
    pub fn in_flight(&self, target: &str) -> u32 {
        self.in_flight_map().get(target).copied().unwrap_or(0)
    }

    /// Number of targets with at least one running request.
    pub fn in_flight_targets(&self) -> usize {
        self.in_flight_map().len()
    }

    // == Convenience Calls ==
    pub async fn select<T: DeserializeOwned>(&self, request: Request) -> Result<T, RequestError> {
        Ok(self.request(request).await?.data)
    }

    pub async fn rpc<T, A>(&self, function: &str, args: &A) -> Result<T, RequestError>
    where
        T: DeserializeOwned,
        A: Serialize + ?Sized,
    {
        let args = serde_json::to_value(args)
            .map_err(|err| RequestError::BadRequest(err.to_string()))?;
        Ok(self.request(Request::rpc(function, args)).await?.data)
    }

    pub async fn insert<T, B>(&self, table: &str, body: &B) -> Result<T, RequestError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_value(body)
            .map_err(|err| RequestError::BadRequest(err.to_string()))?;
        Ok(self.request(Request::insert(table, body)).await?.data)
    }

    // == Request ==
    /// Runs `request` through the full pipeline and decodes the payload.
    pub async fn request<T: DeserializeOwned>(
        &self,
        request: Request,
    ) -> Result<Response<T>, RequestError> {
        let response = self.request_value(request).await?;
        let data = serde_json::from_value(response.data.clone())?;
        Ok(response.map(|_| data))
    }

    /// Runs `request` through the full pipeline, returning raw JSON.
    pub async fn request_value(&self, request: Request) -> Result<Response<Value>, RequestError> {
        let target = request.target.to_string();
        let started = Instant::now();
        let tracked = self.track(&target);
        self.with_metrics(|metrics| metrics.record_request(&target));

        let mut attempt: u32 = 0;
        let outcome = loop {
            attempt += 1;
            match self.attempt(request.clone()).await {
                Ok(done) => break Ok(done),
                Err((seen, error)) => {
                    if self
                        .inner
                        .retry
                        .should_retry(&error, attempt, seen.retry)
                    {
                        let delay = self.inner.retry.delay_for(attempt);
                        debug!(%target, attempt, ?delay, error = %error, "retrying request");
                        self.with_metrics(ClientMetrics::record_retry);
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    let chain = self.chain();
                    break Err(chain.apply_error(&seen, error));
                }
            }
        };

        drop(tracked);
        let elapsed = started.elapsed();

        match outcome {
            Ok(Attempt::Cached { key, data }) => {
                self.with_metrics(ClientMetrics::record_cache_hit);
                self.emit(RequestEvent::CacheHit {
                    target: target.clone(),
                    key,
                });
                // Passes before the hit that reached the transport
                Ok(Response {
                    data,
                    cached: true,
                    attempts: attempt - 1,
                    elapsed,
                })
            }
            Ok(Attempt::Fetched(data)) => {
                self.with_metrics(|metrics| metrics.record_success(elapsed));
                self.emit(RequestEvent::Response {
                    target: target.clone(),
                    attempts: attempt,
                    elapsed_ms: elapsed.as_millis() as u64,
                });
                Ok(Response {
                    data,
                    cached: false,
                    attempts: attempt,
                    elapsed,
                })
            }
            Err(error) => {
                warn!(%target, attempts = attempt, error = %error, "request failed");
                self.with_metrics(|metrics| metrics.record_failure(elapsed));
                self.emit(RequestEvent::Error {
                    target: target.clone(),
                    kind: error.kind(),
                    message: error.to_string(),
                    attempts: attempt,
                });
                Err(error)
            }
        }
    }

    /// One pass through the pipeline. On failure, also returns the request
    /// as the error interceptors should see it.
    async fn attempt(&self, original: Request) -> Result<Attempt, (Request, RequestError)> {
        let chain = self.chain();
        let request = match chain.apply_request(original.clone()) {
            Ok(request) => request,
            Err(error) => return Err((original, error)),
        };

        let cache_key = request.cache_key();
        if let CacheMode::Ttl(_) = request.cache {
            if let Some(data) = self.inner.cache.get::<Value>(&cache_key).await {
                return Ok(Attempt::Cached {
                    key: cache_key,
                    data,
                });
            }
        }

        let timeout = request.timeout.unwrap_or(self.inner.timeout);
        let result =
            match tokio::time::timeout(timeout, self.inner.transport.execute(&request)).await {
                Ok(result) => result,
                Err(_) => Err(RequestError::Timeout {
                    target: request.target.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                }),
            };
        let data = match result.and_then(|data| chain.apply_response(&request, data)) {
            Ok(data) => data,
            Err(error) => return Err((request, error)),
        };

        // Only payloads the response stage accepted are cached
        if let CacheMode::Ttl(ttl) = request.cache {
            self.inner.cache.set(&cache_key, &data, Some(ttl)).await;
        }
        Ok(Attempt::Fetched(data))
    }

    // == Bookkeeping ==
    fn chain(&self) -> InterceptorChain {
        self.inner
            .chain
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn emit(&self, event: RequestEvent) {
        let listeners = self
            .inner
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        notify(&listeners, &event);
    }

    fn with_metrics(&self, update: impl FnOnce(&mut ClientMetrics)) {
        let mut metrics = self
            .inner
            .metrics
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        update(&mut *metrics);
    }

    fn in_flight_map(&self) -> std::sync::MutexGuard<'_, HashMap<String, u32>> {
        self.inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Counts a request against `target` until the guard is dropped, which
    /// also covers callers that abandon the request mid-flight.
    fn track(&self, target: &str) -> InFlightGuard<'_> {
        *self.in_flight_map().entry(target.to_string()).or_insert(0) += 1;
        InFlightGuard {
            client: self,
            target: target.to_string(),
        }
    }

    fn finish(&self, target: &str) {
        let mut in_flight = self.in_flight_map();
        if let Some(count) = in_flight.get_mut(target) {
            *count -= 1;
            if *count == 0 {
                in_flight.remove(target);
            }
        }
    }
}

struct InFlightGuard<'a> {
    client: &'a ApiClient,
    target: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.client.finish(&self.target);
    }
}

// == Builder ==
pub struct ApiClientBuilder {
    transport: Arc<dyn Transport>,
    cache: Cache,
    chain: InterceptorChain,
    listeners: Vec<Arc<dyn RequestListener>>,
    retry: RetryPolicy,
    timeout: Duration,
}

impl ApiClientBuilder {
    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.chain.push(interceptor);
        self
    }

    pub fn listener(mut self, listener: Arc<dyn RequestListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn build(self) -> ApiClient {
        ApiClient {
            inner: Arc::new(ClientInner {
                transport: self.transport,
                cache: self.cache,
                chain: RwLock::new(self.chain),
                listeners: RwLock::new(self.listeners),
                metrics: Mutex::new(ClientMetrics::default()),
                in_flight: Mutex::new(HashMap::new()),
                retry: self.retry,
                timeout: self.timeout,
            }),
        }
    }
}
