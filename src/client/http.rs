//! HTTP Transport Module
//!
//! Maps request targets onto a PostgREST-style REST surface:
//! `/rest/v1/<table>` for table actions and `/rest/v1/rpc/<function>` for
//! remote procedures.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use crate::client::{Request, Target, Transport};
use crate::error::RequestError;

// == HTTP Transport ==
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Builds a transport for `base_url`. With an API key, every call
    /// carries it as `apikey` and as a bearer token.
    ///
    /// `connect_timeout` bounds connection setup only; whole-request
    /// timeouts are enforced by the client.
    pub fn new(
        base_url: &str,
        api_key: Option<&str>,
        connect_timeout: Duration,
    ) -> Result<Self, RequestError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = api_key {
            headers.insert("apikey", header_value(key)?);
            headers.insert(AUTHORIZATION, header_value(&format!("Bearer {key}"))?);
        }

        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .default_headers(headers)
            .build()
            .map_err(|err| RequestError::Network(err.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, target: &Target) -> (Method, String) {
        match target {
            Target::Select { table } => (Method::GET, format!("{}/rest/v1/{table}", self.base_url)),
            Target::Insert { table } => {
                (Method::POST, format!("{}/rest/v1/{table}", self.base_url))
            }
            Target::Update { table } => {
                (Method::PATCH, format!("{}/rest/v1/{table}", self.base_url))
            }
            Target::Delete { table } => {
                (Method::DELETE, format!("{}/rest/v1/{table}", self.base_url))
            }
            Target::Rpc { function } => (
                Method::POST,
                format!("{}/rest/v1/rpc/{function}", self.base_url),
            ),
        }
    }
}

fn header_value(value: &str) -> Result<HeaderValue, RequestError> {
    HeaderValue::from_str(value).map_err(|err| RequestError::BadRequest(err.to_string()))
}

fn classify(err: reqwest::Error, target: &Target) -> RequestError {
    if err.is_timeout() {
        RequestError::Timeout {
            target: target.to_string(),
            timeout_ms: 0,
        }
    } else {
        RequestError::Network(err.to_string())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: &Request) -> Result<Value, RequestError> {
        let (method, url) = self.endpoint(&request.target);
        debug!(%method, %url, "backend call");

        let mut builder = self.client.request(method, &url);

        if !matches!(request.target, Target::Rpc { .. }) {
            let query: Vec<(&str, String)> = request
                .filters
                .iter()
                .map(|(column, value)| (column.as_str(), format!("eq.{value}")))
                .collect();
            builder = builder.query(&query);
        }
        if !request.target.is_read() {
            builder = builder.header("Prefer", "return=representation");
        }
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|err| RequestError::BadRequest(err.to_string()))?;
            builder = builder.header(name, header_value(value)?);
        }
        match (&request.body, &request.target) {
            (Some(body), _) => builder = builder.json(body),
            (None, Target::Rpc { .. }) => builder = builder.json(&serde_json::json!({})),
            (None, _) => {}
        }

        let response = builder
            .send()
            .await
            .map_err(|err| classify(err, &request.target))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| classify(err, &request.target))?;

        if !status.is_success() {
            return Err(RequestError::from_status(status.as_u16(), error_message(&text)));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

/// Pulls `message` out of a JSON error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}
