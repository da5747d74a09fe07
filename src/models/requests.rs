//! Request DTOs for the admin API

use serde::Deserialize;

use crate::cache::KeyPattern;

/// Request body for POST /invalidate
///
/// `pattern` uses the cache pattern syntax: a trailing `*` is a prefix
/// match, anything else a substring match.
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidateRequest {
    pub pattern: String,
}

impl InvalidateRequest {
    /// Returns an error message if the request is unusable.
    ///
    /// A bare `*` is refused: clearing everything has its own endpoint.
    pub fn validate(&self) -> Option<String> {
        let pattern = self.pattern.trim();
        if pattern.is_empty() {
            return Some("Pattern cannot be empty".to_string());
        }
        if pattern == "*" {
            return Some("Use DELETE /entries to clear the whole cache".to_string());
        }
        None
    }

    pub fn key_pattern(&self) -> KeyPattern {
        KeyPattern::parse(self.pattern.trim())
    }
}
