//! Transport Module
//!
//! The seam between the request client and whatever actually talks to the
//! backend.

use async_trait::async_trait;
use serde_json::Value;

use crate::client::Request;
use crate::error::RequestError;

/// Executes one attempt of a request. Retries, timeouts, caching and
/// interceptors are the client's concern, not the transport's.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: &Request) -> Result<Value, RequestError>;
}
