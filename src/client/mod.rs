//! Request Client Module
//!
//! Retrying, caching request client for the backend. Every call goes through
//! the interceptor chain and emits exactly one lifecycle event.

mod api_client;
mod http;
mod interceptor;
mod metrics;
mod request;
mod retry;
mod transport;

pub use api_client::{ApiClient, ApiClientBuilder, DEFAULT_TIMEOUT};
pub use http::HttpTransport;
pub use interceptor::{DefaultCachePolicy, DefaultHeaders, Interceptor, InterceptorChain};
pub use metrics::{ClientMetrics, RequestEvent, RequestListener};
pub use request::{CacheMode, Request, Response, Target};
pub use retry::RetryPolicy;
pub use transport::Transport;
