//! API Handlers
//!
//! HTTP request handlers for each admin endpoint.

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;

use crate::cache::Cache;
use crate::client::{ApiClient, ClientMetrics};
use crate::error::{CacheError, Result};
use crate::models::{
    ClearResponse, DeleteResponse, EntryResponse, HealthResponse, InvalidateRequest,
    InvalidateResponse, KeysResponse, StatsResponse,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub cache: Cache,
    /// Absent when the server runs without a backend
    pub client: Option<ApiClient>,
}

impl AppState {
    pub fn new(cache: Cache) -> Self {
        Self {
            cache,
            client: None,
        }
    }

    pub fn with_client(mut self, client: ApiClient) -> Self {
        self.client = Some(client);
        self
    }
}

/// Handler for GET /entries/:key
///
/// Does not count as a cache hit or miss.
pub async fn get_entry_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<EntryResponse>> {
    let entry = state
        .cache
        .entry(&key)
        .await
        .ok_or_else(|| CacheError::NotFound(key.clone()))?;

    Ok(Json(EntryResponse::new(key, entry)))
}

/// Handler for GET /entries
pub async fn list_keys_handler(State(state): State<AppState>) -> Json<KeysResponse> {
    Json(KeysResponse::new(state.cache.keys().await))
}

/// Handler for DELETE /entries/:key
pub async fn delete_entry_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<DeleteResponse> {
    let deleted = state.cache.delete(&key).await;
    Json(DeleteResponse::new(key, deleted))
}

/// Handler for DELETE /entries
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    state.cache.clear().await;
    Json(ClearResponse::new())
}

/// Handler for POST /invalidate
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Json(req): Json<InvalidateRequest>,
) -> Result<Json<InvalidateResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let pattern = req.key_pattern();
    let removed = state.cache.invalidate(pattern.clone()).await;
    info!("Invalidated {} entries matching {}", removed, pattern);

    Ok(Json(InvalidateResponse::new(pattern.to_string(), removed)))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.cache.stats().await;
    Json(StatsResponse::new(stats, state.cache.in_flight()))
}

/// Handler for GET /metrics
pub async fn metrics_handler(State(state): State<AppState>) -> Result<Json<ClientMetrics>> {
    let client = state
        .client
        .as_ref()
        .ok_or_else(|| CacheError::NotFound("request client not configured".to_string()))?;
    Ok(Json(client.metrics()))
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.client.is_some()))
}
