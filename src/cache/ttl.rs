//! TTL Policy Module
//!
//! Centralizes lifetime choices. Call sites pick a named `Ttl`; the
//! `TtlPolicy` table turns it into milliseconds.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};

// == TTL ==
/// Lifetime requested for a cache write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ttl {
    /// Volatile data (alerts, live counters)
    Short,
    /// Default for lists and detail views
    Medium,
    /// Slow-moving reference data (producers, plot geometry)
    Long,
    /// Explicit lifetime in milliseconds
    Millis(u64),
}

impl Ttl {
    /// Parses `short`, `medium` or `long`, case-insensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "short" => Some(Ttl::Short),
            "medium" => Some(Ttl::Medium),
            "long" => Some(Ttl::Long),
            _ => None,
        }
    }
}

impl Default for Ttl {
    fn default() -> Self {
        Ttl::Medium
    }
}

impl From<Duration> for Ttl {
    fn from(duration: Duration) -> Self {
        Ttl::Millis(duration.as_millis() as u64)
    }
}

impl fmt::Display for Ttl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ttl::Short => f.write_str("short"),
            Ttl::Medium => f.write_str("medium"),
            Ttl::Long => f.write_str("long"),
            Ttl::Millis(ms) => write!(f, "{ms}ms"),
        }
    }
}

// == TTL Policy ==
/// Name to milliseconds table. Always satisfies `short < medium < long`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TtlPolicy {
    short_ms: u64,
    medium_ms: u64,
    long_ms: u64,
}

impl TtlPolicy {
    pub const DEFAULT_SHORT_MS: u64 = 2 * 60 * 1000;
    pub const DEFAULT_MEDIUM_MS: u64 = 5 * 60 * 1000;
    pub const DEFAULT_LONG_MS: u64 = 15 * 60 * 1000;

    /// Builds a custom table, rejecting one that is not strictly increasing.
    pub fn new(short_ms: u64, medium_ms: u64, long_ms: u64) -> Result<Self> {
        if !(short_ms < medium_ms && medium_ms < long_ms) {
            return Err(CacheError::InvalidTtlPolicy(format!(
                "expected short < medium < long, got {short_ms}ms / {medium_ms}ms / {long_ms}ms"
            )));
        }
        Ok(Self {
            short_ms,
            medium_ms,
            long_ms,
        })
    }

    // == Resolve ==
    /// Resolves a requested lifetime to milliseconds, falling back to
    /// `medium` when none was given.
    pub fn resolve(&self, ttl: Option<Ttl>) -> u64 {
        match ttl.unwrap_or_default() {
            Ttl::Short => self.short_ms,
            Ttl::Medium => self.medium_ms,
            Ttl::Long => self.long_ms,
            Ttl::Millis(ms) => ms,
        }
    }

    pub fn duration(&self, ttl: Option<Ttl>) -> Duration {
        Duration::from_millis(self.resolve(ttl))
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            short_ms: Self::DEFAULT_SHORT_MS,
            medium_ms: Self::DEFAULT_MEDIUM_MS,
            long_ms: Self::DEFAULT_LONG_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_strictly_ordered() {
        let policy = TtlPolicy::default();
        let short = policy.resolve(Some(Ttl::Short));
        let medium = policy.resolve(Some(Ttl::Medium));
        let long = policy.resolve(Some(Ttl::Long));

        assert!(short < medium);
        assert!(medium < long);
    }

    #[test]
    fn test_missing_ttl_falls_back_to_medium() {
        let policy = TtlPolicy::default();
        assert_eq!(policy.resolve(None), TtlPolicy::DEFAULT_MEDIUM_MS);
    }

    #[test]
    fn test_explicit_millis_pass_through() {
        let policy = TtlPolicy::default();
        assert_eq!(policy.resolve(Some(Ttl::Millis(42))), 42);
        assert_eq!(
            policy.duration(Some(Duration::from_secs(3).into())),
            Duration::from_secs(3)
        );
    }

    #[test]
    fn test_unordered_policy_rejected() {
        assert!(TtlPolicy::new(1000, 1000, 2000).is_err());
        assert!(TtlPolicy::new(3000, 2000, 1000).is_err());
        assert!(TtlPolicy::new(1, 2, 3).is_ok());
    }

    #[test]
    fn test_ttl_names() {
        assert_eq!(Ttl::from_name("Short"), Some(Ttl::Short));
        assert_eq!(Ttl::from_name(" long "), Some(Ttl::Long));
        assert_eq!(Ttl::from_name("forever"), None);
        assert_eq!(Ttl::Medium.to_string(), "medium");
    }
}
