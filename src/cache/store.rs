//! Cache Store Module
//!
//! Synchronous cache engine combining HashMap storage with LRU tracking and
//! TTL expiration. Shared access goes through the async `Cache` handle.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::cache::{
    CacheEntry, CacheStats, Clock, KeyPattern, LruTracker, SystemClock, Ttl, TtlPolicy,
    MAX_KEY_LENGTH,
};
use crate::error::{CacheError, Result};

// == Cache Store ==
/// Main cache storage with LRU eviction and TTL support.
#[derive(Debug)]
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// LRU access tracker
    lru: LruTracker,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed
    max_entries: usize,
    /// Named lifetime table
    policy: TtlPolicy,
    clock: Arc<dyn Clock>,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore with the given capacity and TTL table,
    /// reading wall-clock time.
    pub fn new(max_entries: usize, policy: TtlPolicy) -> Self {
        Self::with_clock(max_entries, policy, Arc::new(SystemClock))
    }

    /// Creates a store that reads time from `clock`.
    pub fn with_clock(max_entries: usize, policy: TtlPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: CacheStats::new(),
            max_entries: max_entries.max(1),
            policy,
            clock,
        }
    }

    // == Set ==
    /// Stores a value, overwriting any previous entry and resetting its age.
    ///
    /// If the key is new and the store is at capacity, the least recently
    /// used entry is evicted first; its key is returned so callers can drop
    /// it from any backing storage.
    ///
    /// # Arguments
    /// * `key` - The key to store
    /// * `value` - The payload
    /// * `ttl` - Requested lifetime (`None` resolves to medium)
    pub fn set(&mut self, key: String, value: Value, ttl: Option<Ttl>) -> Result<Option<String>> {
        validate_key(&key)?;

        let entry = CacheEntry::new(value, self.clock.now_ms(), self.policy.resolve(ttl));
        Ok(self.insert_entry(key, entry))
    }

    /// Inserts a prebuilt entry, keeping its original timestamp. Used when
    /// reloading persisted entries.
    pub fn insert_entry(&mut self, key: String, entry: CacheEntry) -> Option<String> {
        let mut evicted = None;
        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            if let Some(victim) = self.lru.evict_oldest() {
                self.entries.remove(&victim);
                self.stats.record_eviction();
                evicted = Some(victim);
            }
        }

        self.lru.touch(&key);
        self.entries.insert(key, entry);
        self.stats.set_total_entries(self.entries.len());
        evicted
    }

    // == Get ==
    /// Returns the value if present and fresh.
    ///
    /// An expired entry is removed on the spot and the lookup counts as a
    /// miss.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        let now = self.clock.now_ms();
        match self.entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                self.entries.remove(key);
                self.lru.remove(key);
                self.stats.record_expirations(1);
                self.stats.record_miss();
                self.stats.set_total_entries(self.entries.len());
                None
            }
            Some(entry) => {
                let value = entry.value.clone();
                self.stats.record_hit();
                self.lru.touch(key);
                Some(value)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    /// Returns a fresh entry without touching statistics or recency.
    pub fn peek(&self, key: &str) -> Option<&CacheEntry> {
        let now = self.clock.now_ms();
        self.entries.get(key).filter(|entry| !entry.is_expired(now))
    }

    // == Delete ==
    /// Removes one entry. Returns whether it existed.
    pub fn delete(&mut self, key: &str) -> bool {
        if self.entries.remove(key).is_some() {
            self.lru.remove(key);
            self.stats.record_invalidations(1);
            self.stats.set_total_entries(self.entries.len());
            true
        } else {
            false
        }
    }

    // == Invalidate ==
    /// Removes every entry whose key matches `pattern` and returns the
    /// removed keys.
    pub fn invalidate(&mut self, pattern: &KeyPattern) -> Vec<String> {
        let matched: Vec<String> = self
            .entries
            .keys()
            .filter(|key| pattern.matches(key))
            .cloned()
            .collect();

        for key in &matched {
            self.entries.remove(key);
            self.lru.remove(key);
        }

        self.stats.record_invalidations(matched.len());
        self.stats.set_total_entries(self.entries.len());
        matched
    }

    // == Clear ==
    /// Removes all entries. Counters are kept.
    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        self.lru.clear();
        self.stats.set_total_entries(0);
        removed
    }

    // == Cleanup Expired ==
    /// Removes all expired entries and returns their keys.
    pub fn cleanup_expired(&mut self) -> Vec<String> {
        let now = self.clock.now_ms();
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.entries.remove(key);
            self.lru.remove(key);
        }

        self.stats.record_expirations(expired.len());
        self.stats.set_total_entries(self.entries.len());
        expired
    }

    pub fn record_storage_error(&mut self) {
        self.stats.record_storage_error();
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    /// Keys currently held, sorted. Expired entries not yet purged are
    /// included.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn policy(&self) -> TtlPolicy {
        self.policy
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidKey("key cannot be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidKey(format!(
            "key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use serde_json::json;
    use std::time::Duration;

    fn test_store(max_entries: usize) -> (CacheStore, ManualClock) {
        let clock = ManualClock::new(1_000_000);
        let store = CacheStore::with_clock(
            max_entries,
            TtlPolicy::default(),
            Arc::new(clock.clone()),
        );
        (store, clock)
    }

    #[test]
    fn test_store_set_and_get() {
        let (mut store, _) = test_store(100);

        store
            .set("plots:agent:1".into(), json!([{"id": "p1"}]), None)
            .unwrap();

        assert_eq!(store.get("plots:agent:1"), Some(json!([{"id": "p1"}])));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_get_missing_is_none() {
        let (mut store, _) = test_store(100);
        assert_eq!(store.get("nope"), None);
        assert_eq!(store.stats().misses, 1);
    }

    #[test]
    fn test_store_expired_entry_removed_on_read() {
        let (mut store, clock) = test_store(100);
        store
            .set("alerts:agent:1".into(), json!([]), Some(Ttl::Short))
            .unwrap();

        clock.advance(Duration::from_millis(TtlPolicy::DEFAULT_SHORT_MS));
        assert!(store.get("alerts:agent:1").is_some());

        clock.advance(Duration::from_millis(1));
        assert_eq!(store.get("alerts:agent:1"), None);

        let stats = store.stats();
        assert_eq!(stats.total_entries, 0);
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_store_overwrite_resets_age() {
        let (mut store, clock) = test_store(100);
        store.set("k".into(), json!(1), Some(Ttl::Millis(100))).unwrap();

        clock.advance(Duration::from_millis(80));
        store.set("k".into(), json!(2), Some(Ttl::Millis(100))).unwrap();
        clock.advance(Duration::from_millis(80));

        assert_eq!(store.get("k"), Some(json!(2)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_delete() {
        let (mut store, _) = test_store(100);
        store.set("k".into(), json!(1), None).unwrap();

        assert!(store.delete("k"));
        assert!(!store.delete("k"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_invalidate_prefix() {
        let (mut store, _) = test_store(100);
        store.set("plots:agent:1".into(), json!(1), None).unwrap();
        store.set("plots:agent:2".into(), json!(2), None).unwrap();
        store.set("crops:plot:9".into(), json!(3), None).unwrap();

        let removed = store.invalidate(&KeyPattern::parse("plots:*"));

        assert_eq!(removed.len(), 2);
        assert_eq!(store.get("crops:plot:9"), Some(json!(3)));
        assert_eq!(store.get("plots:agent:1"), None);
        assert_eq!(store.stats().invalidations, 2);
    }

    #[test]
    fn test_store_lru_eviction() {
        let (mut store, _) = test_store(3);
        store.set("k1".into(), json!(1), None).unwrap();
        store.set("k2".into(), json!(2), None).unwrap();
        store.set("k3".into(), json!(3), None).unwrap();

        // k1 becomes most recently used
        store.get("k1");
        let evicted = store.set("k4".into(), json!(4), None).unwrap();

        assert_eq!(evicted, Some("k2".to_string()));
        assert_eq!(store.len(), 3);
        assert_eq!(store.stats().evictions, 1);
        assert!(store.get("k1").is_some());
    }

    #[test]
    fn test_store_overwrite_at_capacity_does_not_evict() {
        let (mut store, _) = test_store(2);
        store.set("a".into(), json!(1), None).unwrap();
        store.set("b".into(), json!(2), None).unwrap();

        let evicted = store.set("a".into(), json!(3), None).unwrap();
        assert_eq!(evicted, None);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_store_cleanup_expired() {
        let (mut store, clock) = test_store(100);
        store.set("short".into(), json!(1), Some(Ttl::Short)).unwrap();
        store.set("long".into(), json!(2), Some(Ttl::Long)).unwrap();

        clock.advance(Duration::from_millis(TtlPolicy::DEFAULT_MEDIUM_MS));

        let removed = store.cleanup_expired();
        assert_eq!(removed, vec!["short".to_string()]);
        assert_eq!(store.keys(), vec!["long".to_string()]);
    }

    #[test]
    fn test_store_peek_skips_stats() {
        let (mut store, _) = test_store(100);
        store.set("k".into(), json!("v"), None).unwrap();

        assert_eq!(store.peek("k").map(|e| &e.value), Some(&json!("v")));
        assert_eq!(store.stats().hits, 0);
    }

    #[test]
    fn test_store_rejects_bad_keys() {
        let (mut store, _) = test_store(100);

        let result = store.set(String::new(), json!(1), None);
        assert!(matches!(result, Err(CacheError::InvalidKey(_))));

        let result = store.set("x".repeat(MAX_KEY_LENGTH + 1), json!(1), None);
        assert!(matches!(result, Err(CacheError::InvalidKey(_))));
    }

    #[test]
    fn test_store_clear() {
        let (mut store, _) = test_store(100);
        store.set("a".into(), json!(1), None).unwrap();
        store.set("b".into(), json!(2), None).unwrap();

        assert_eq!(store.clear(), 2);
        assert!(store.is_empty());
        assert_eq!(store.stats().total_entries, 0);
    }
}
