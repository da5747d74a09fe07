//! Cache Module
//!
//! In-memory caching with TTL expiration, LRU eviction, pattern
//! invalidation and optional persistence.

mod clock;
mod entry;
mod handle;
mod lru;
mod pattern;
mod persist;
mod stats;
mod store;
mod ttl;


// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use handle::Cache;
pub use lru::LruTracker;
pub use pattern::KeyPattern;
pub use persist::{FilePersistence, Persistence};
pub use stats::CacheStats;
pub use store::CacheStore;
pub use ttl::{Ttl, TtlPolicy};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 512;
