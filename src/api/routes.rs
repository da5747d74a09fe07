//! API Routes
//!
//! Configures the Axum router with all admin endpoints.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, delete_entry_handler, get_entry_handler, health_handler, invalidate_handler,
    list_keys_handler, metrics_handler, stats_handler, AppState,
};

/// Creates the admin router.
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/entries", get(list_keys_handler).delete(clear_handler))
        .route(
            "/entries/:key",
            get(get_entry_handler).delete(delete_entry_handler),
        )
        .route("/invalidate", post(invalidate_handler))
        .route("/stats", get(stats_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
