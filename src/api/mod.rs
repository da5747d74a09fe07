//! Admin API Module
//!
//! HTTP endpoints for inspecting and flushing the running cache.
//!
//! # Endpoints
//! - `GET /health` - Health check
//! - `GET /stats` - Cache statistics
//! - `GET /metrics` - Request client metrics
//! - `GET /entries` - List cached keys
//! - `GET /entries/:key` - Inspect one entry
//! - `DELETE /entries/:key` - Delete one entry
//! - `DELETE /entries` - Clear the cache
//! - `POST /invalidate` - Pattern invalidation

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
