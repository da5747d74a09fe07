//! Configuration Module
//!
//! Loads cache, backend and admin server settings from environment
//! variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::TtlPolicy;
use crate::client::RetryPolicy;
use crate::error::Result;

/// Runtime configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries before LRU eviction
    pub max_entries: usize,
    pub ttl_short_ms: u64,
    pub ttl_medium_ms: u64,
    pub ttl_long_ms: u64,
    /// Seconds between background expiry sweeps
    pub sweep_interval: u64,
    /// Enables file persistence when set
    pub cache_dir: Option<PathBuf>,
    /// Base URL of the REST/RPC backend
    pub backend_url: String,
    pub api_key: Option<String>,
    pub request_timeout_ms: u64,
    /// Retries after the first attempt
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    /// Admin HTTP server port
    pub server_port: u16,
}

fn parsed<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn non_empty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_ENTRIES` - Maximum cache entries (default: 1000)
    /// - `CACHE_TTL_SHORT_MS` / `CACHE_TTL_MEDIUM_MS` / `CACHE_TTL_LONG_MS` -
    ///   TTL table (default: 2 min / 5 min / 15 min)
    /// - `CACHE_SWEEP_INTERVAL` - Expiry sweep frequency in seconds (default: 30)
    /// - `CACHE_DIR` - Directory for persisted entries (default: memory only)
    /// - `BACKEND_URL` - Backend base URL (default: http://localhost:54321)
    /// - `BACKEND_API_KEY` - Backend API key (default: none)
    /// - `REQUEST_TIMEOUT_MS` - Per-request timeout (default: 10000)
    /// - `RETRY_ATTEMPTS` - Retries after the first attempt (default: 3)
    /// - `RETRY_DELAY_MS` - Base backoff delay (default: 1000)
    /// - `SERVER_PORT` - Admin HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_entries: parsed("CACHE_MAX_ENTRIES", defaults.max_entries),
            ttl_short_ms: parsed("CACHE_TTL_SHORT_MS", defaults.ttl_short_ms),
            ttl_medium_ms: parsed("CACHE_TTL_MEDIUM_MS", defaults.ttl_medium_ms),
            ttl_long_ms: parsed("CACHE_TTL_LONG_MS", defaults.ttl_long_ms),
            sweep_interval: parsed("CACHE_SWEEP_INTERVAL", defaults.sweep_interval),
            cache_dir: non_empty("CACHE_DIR").map(PathBuf::from),
            backend_url: non_empty("BACKEND_URL").unwrap_or(defaults.backend_url),
            api_key: non_empty("BACKEND_API_KEY"),
            request_timeout_ms: parsed("REQUEST_TIMEOUT_MS", defaults.request_timeout_ms),
            retry_attempts: parsed("RETRY_ATTEMPTS", defaults.retry_attempts),
            retry_delay_ms: parsed("RETRY_DELAY_MS", defaults.retry_delay_ms),
            server_port: parsed("SERVER_PORT", defaults.server_port),
        }
    }

    /// The TTL table; fails unless short < medium < long.
    pub fn ttl_policy(&self) -> Result<TtlPolicy> {
        TtlPolicy::new(self.ttl_short_ms, self.ttl_medium_ms, self.ttl_long_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_attempts,
            Duration::from_millis(self.retry_delay_ms),
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            ttl_short_ms: TtlPolicy::DEFAULT_SHORT_MS,
            ttl_medium_ms: TtlPolicy::DEFAULT_MEDIUM_MS,
            ttl_long_ms: TtlPolicy::DEFAULT_LONG_MS,
            sweep_interval: 30,
            cache_dir: None,
            backend_url: "http://localhost:54321".to_string(),
            api_key: None,
            request_timeout_ms: 10_000,
            retry_attempts: 3,
            retry_delay_ms: 1_000,
            server_port: 3000,
        }
    }
}
