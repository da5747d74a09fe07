//! Read-Through Query Module
//!
//! The per-call-site facade over the cache: a keyed, fetcher-backed value
//! with loading and error state, plus refetch, invalidate and optimistic
//! updates.

mod facade;
mod options;
mod state;

pub use facade::{Fetcher, Query};
pub use options::QueryOptions;
pub use state::QueryState;
