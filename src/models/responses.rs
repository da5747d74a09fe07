//! Response DTOs for the admin API

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::cache::{CacheEntry, CacheStats};

/// Response body for GET /entries/:key
#[derive(Debug, Clone, Serialize)]
pub struct EntryResponse {
    pub key: String,
    pub value: Value,
    pub stored_at: DateTime<Utc>,
    pub ttl_ms: u64,
    pub expires_at: DateTime<Utc>,
}

impl EntryResponse {
    pub fn new(key: impl Into<String>, entry: CacheEntry) -> Self {
        let stored_at = entry.stored_at_utc();
        let ttl = Duration::milliseconds(i64::try_from(entry.ttl_ms).unwrap_or(i64::MAX));
        Self {
            key: key.into(),
            stored_at,
            ttl_ms: entry.ttl_ms,
            expires_at: stored_at.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
            value: entry.value,
        }
    }
}

/// Response body for GET /entries
#[derive(Debug, Clone, Serialize)]
pub struct KeysResponse {
    pub count: usize,
    pub keys: Vec<String>,
}

impl KeysResponse {
    pub fn new(keys: Vec<String>) -> Self {
        Self {
            count: keys.len(),
            keys,
        }
    }
}

/// Response body for DELETE /entries/:key
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub message: String,
    pub key: String,
    /// False when the key was not cached
    pub deleted: bool,
}

impl DeleteResponse {
    pub fn new(key: impl Into<String>, deleted: bool) -> Self {
        let key = key.into();
        let message = if deleted {
            format!("Key '{}' deleted successfully", key)
        } else {
            format!("Key '{}' was not cached", key)
        };
        Self {
            message,
            key,
            deleted,
        }
    }
}

/// Response body for POST /invalidate
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    pub pattern: String,
    pub removed: usize,
}

impl InvalidateResponse {
    pub fn new(pattern: impl Into<String>, removed: usize) -> Self {
        Self {
            pattern: pattern.into(),
            removed,
        }
    }
}

/// Response body for DELETE /entries
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    pub message: String,
}

impl ClearResponse {
    pub fn new() -> Self {
        Self {
            message: "Cache cleared".to_string(),
        }
    }
}

impl Default for ClearResponse {
    fn default() -> Self {
        Self::new()
    }
}

/// Response body for GET /stats
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: CacheStats,
    /// hits / (hits + misses)
    pub hit_rate: f64,
    /// Keys with a read-through fetch currently running
    pub in_flight: usize,
}

impl StatsResponse {
    pub fn new(stats: CacheStats, in_flight: usize) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            stats,
            in_flight,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
    /// Whether a backend request client is configured
    pub backend: bool,
}

impl HealthResponse {
    pub fn healthy(backend: bool) -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            backend,
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
