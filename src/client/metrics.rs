//! Client Metrics Module
//!
//! Request counters and lifecycle events. Informational only: nothing in
//! the request path reads them back.

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::warn;

use crate::error::ErrorKind;

// == Client Metrics ==
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClientMetrics {
    pub total_requests: u64,
    pub cache_hits: u64,
    pub successes: u64,
    pub failures: u64,
    /// Extra attempts made after transient failures
    pub retries: u64,
    /// Requests per target (`select:plots`, `rpc:get_agent_dashboard`, ...)
    pub per_endpoint: BTreeMap<String, u64>,
    /// Running mean over completed (non-cached) requests
    pub average_response_ms: f64,
}

impl ClientMetrics {
    pub fn record_request(&mut self, endpoint: &str) {
        self.total_requests += 1;
        *self.per_endpoint.entry(endpoint.to_string()).or_insert(0) += 1;
    }

    pub fn record_cache_hit(&mut self) {
        self.cache_hits += 1;
    }

    pub fn record_retry(&mut self) {
        self.retries += 1;
    }

    pub fn record_success(&mut self, elapsed: Duration) {
        self.successes += 1;
        self.record_response_time(elapsed);
    }

    pub fn record_failure(&mut self, elapsed: Duration) {
        self.failures += 1;
        self.record_response_time(elapsed);
    }

    fn record_response_time(&mut self, elapsed: Duration) {
        let completed = (self.successes + self.failures) as f64;
        let sample = elapsed.as_secs_f64() * 1000.0;
        self.average_response_ms += (sample - self.average_response_ms) / completed;
    }
}

// == Request Event ==
/// Exactly one event is emitted per request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RequestEvent {
    CacheHit {
        target: String,
        key: String,
    },
    Response {
        target: String,
        attempts: u32,
        elapsed_ms: u64,
    },
    Error {
        target: String,
        kind: ErrorKind,
        message: String,
        attempts: u32,
    },
}

/// Receives request lifecycle events.
pub trait RequestListener: Send + Sync {
    fn on_event(&self, event: &RequestEvent) -> anyhow::Result<()>;
}

impl<F> RequestListener for F
where
    F: Fn(&RequestEvent) -> anyhow::Result<()> + Send + Sync,
{
    fn on_event(&self, event: &RequestEvent) -> anyhow::Result<()> {
        self(event)
    }
}

/// Delivers `event` to every listener. Listener errors and panics are
/// logged and never reach the request.
pub(crate) fn notify(listeners: &[Arc<dyn RequestListener>], event: &RequestEvent) {
    for listener in listeners {
        match catch_unwind(AssertUnwindSafe(|| listener.on_event(event))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(error = %err, "request listener failed"),
            Err(_) => warn!("request listener panicked"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_running_average() {
        let mut metrics = ClientMetrics::default();
        metrics.record_success(Duration::from_millis(100));
        metrics.record_failure(Duration::from_millis(300));
        metrics.record_success(Duration::from_millis(200));

        assert_eq!(metrics.successes, 2);
        assert_eq!(metrics.failures, 1);
        assert!((metrics.average_response_ms - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_per_endpoint_counts() {
        let mut metrics = ClientMetrics::default();
        metrics.record_request("select:plots");
        metrics.record_request("select:plots");
        metrics.record_request("rpc:get_alerts");

        assert_eq!(metrics.total_requests, 3);
        assert_eq!(metrics.per_endpoint["select:plots"], 2);
        assert_eq!(metrics.per_endpoint["rpc:get_alerts"], 1);
    }

    #[test]
    fn test_failing_listeners_do_not_stop_delivery() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = {
            let seen = seen.clone();
            move |event: &RequestEvent| -> anyhow::Result<()> {
                seen.lock().unwrap().push(event.clone());
                Ok(())
            }
        };

        let listeners: Vec<Arc<dyn RequestListener>> = vec![
            Arc::new(|_: &RequestEvent| -> anyhow::Result<()> { anyhow::bail!("sink down") }),
            Arc::new(|_: &RequestEvent| -> anyhow::Result<()> { panic!("listener bug") }),
            Arc::new(recorder),
        ];

        let event = RequestEvent::CacheHit {
            target: "select:plots".into(),
            key: "api:select:plots".into(),
        };
        notify(&listeners, &event);

        assert_eq!(*seen.lock().unwrap(), vec![event]);
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let event = RequestEvent::Error {
            target: "rpc:f".into(),
            kind: ErrorKind::Timeout,
            message: "slow".into(),
            attempts: 4,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "error");
        assert_eq!(json["kind"], "timeout");
    }
}
