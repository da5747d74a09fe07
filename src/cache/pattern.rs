//! Key Pattern Module
//!
//! Matching rules for pattern invalidation over the flat key space.

use std::fmt;

use serde::{Deserialize, Serialize};

// == Key Pattern ==
/// `"plots:*"` matches every key starting with `plots:`; a pattern without a
/// trailing `*` matches any key containing it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum KeyPattern {
    Prefix(String),
    Contains(String),
}

impl KeyPattern {
    /// Parses the textual pattern syntax.
    pub fn parse(pattern: &str) -> Self {
        match pattern.strip_suffix('*') {
            Some(prefix) => KeyPattern::Prefix(prefix.to_string()),
            None => KeyPattern::Contains(pattern.to_string()),
        }
    }

    pub fn prefix(prefix: impl Into<String>) -> Self {
        KeyPattern::Prefix(prefix.into())
    }

    pub fn matches(&self, key: &str) -> bool {
        match self {
            KeyPattern::Prefix(prefix) => key.starts_with(prefix.as_str()),
            KeyPattern::Contains(needle) => key.contains(needle.as_str()),
        }
    }
}

impl From<&str> for KeyPattern {
    fn from(pattern: &str) -> Self {
        KeyPattern::parse(pattern)
    }
}

impl From<String> for KeyPattern {
    fn from(pattern: String) -> Self {
        KeyPattern::parse(&pattern)
    }
}

impl From<KeyPattern> for String {
    fn from(pattern: KeyPattern) -> Self {
        pattern.to_string()
    }
}

impl fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPattern::Prefix(prefix) => write!(f, "{prefix}*"),
            KeyPattern::Contains(needle) => f.write_str(needle),
        }
    }
}
