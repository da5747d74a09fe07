//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
///
/// Also the persisted form of an entry, so it round-trips through serde.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The stored payload
    pub value: Value,
    /// Insertion timestamp (Unix milliseconds)
    pub stored_at: u64,
    /// Resolved lifetime in milliseconds
    pub ttl_ms: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry stored at `now_ms`.
    pub fn new(value: Value, now_ms: u64, ttl_ms: u64) -> Self {
        Self {
            value,
            stored_at: now_ms,
            ttl_ms,
        }
    }

    // == Is Expired ==
    /// An entry expires once strictly more than `ttl_ms` has elapsed since
    /// it was stored. At exactly `ttl_ms` it is still fresh.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.stored_at) > self.ttl_ms
    }

    /// Last instant (Unix milliseconds) at which the entry is still fresh.
    pub fn expires_at(&self) -> u64 {
        self.stored_at.saturating_add(self.ttl_ms)
    }

    // == Time To Live ==
    /// Returns remaining lifetime in milliseconds, 0 once expired.
    pub fn ttl_remaining_ms(&self, now_ms: u64) -> u64 {
        self.expires_at().saturating_sub(now_ms)
    }

    /// Insertion time as a UTC datetime, for display.
    pub fn stored_at_utc(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.stored_at as i64)
            .single()
            .unwrap_or_default()
    }
}
