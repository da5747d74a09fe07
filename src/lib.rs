//! AgriConnect Cache - client-side cache layer for the AgriConnect apps
//!
//! A typed TTL cache with pattern invalidation, a retrying request client
//! with interceptors, a read-through query facade and per-domain cache
//! wrappers, plus a small admin API for inspecting a running cache.

pub mod api;
pub mod cache;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod models;
pub mod query;
pub mod tasks;

pub use api::AppState;
pub use cache::{Cache, Ttl};
pub use client::{ApiClient, Request};
pub use config::Config;
pub use domain::DomainCache;
pub use error::{CacheError, RequestError};
pub use query::{Query, QueryOptions, QueryState};
pub use tasks::spawn_sweep_task;
