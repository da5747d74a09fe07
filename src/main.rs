//! AgriConnect Cache admin server
//!
//! Runs a shared cache with its expiry sweep and request client, and serves
//! the admin API for inspecting and flushing it.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agriconnect_cache::api::create_router;
use agriconnect_cache::{spawn_sweep_task, ApiClient, AppState, Cache, Config};

/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the cache, restoring persisted entries if configured
/// 4. Build the backend request client
/// 5. Start the background expiry sweep
/// 6. Serve the admin API until SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agriconnect_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting AgriConnect cache server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: max_entries={}, ttl={}/{}/{}ms, backend={}, port={}, sweep_interval={}s",
        config.max_entries,
        config.ttl_short_ms,
        config.ttl_medium_ms,
        config.ttl_long_ms,
        config.backend_url,
        config.server_port,
        config.sweep_interval
    );

    let cache = Cache::from_config(&config)
        .await
        .context("invalid cache configuration")?;
    info!("Cache initialized");

    let mut state = AppState::new(cache.clone());
    match ApiClient::from_config(&config, cache.clone()) {
        Ok(client) => state = state.with_client(client),
        Err(err) => warn!("Request client unavailable, serving cache only: {}", err),
    }

    let sweep_handle = spawn_sweep_task(cache, config.sweep_interval);

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(sweep_handle))
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for Ctrl+C or SIGTERM, then stops the sweep task.
async fn shutdown_signal(sweep_handle: tokio::task::JoinHandle<()>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    sweep_handle.abort();
    warn!("Expiry sweep task aborted");
}
