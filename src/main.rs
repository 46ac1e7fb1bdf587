//! Logo Similarity - HTTP service for comparing logo pairs
//!
//! Serves single-pair and batch comparisons over a shared fetch cache.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::sync::RwLock;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use logo_similarity::api::create_router;
use logo_similarity::cache::CacheStore;
use logo_similarity::tasks::{persist_snapshot, restore_snapshot, spawn_snapshot_task};
use logo_similarity::{AppState, Config};

/// Main entry point for the logo comparison server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the cache store and restore its snapshot, if configured
/// 4. Start the background snapshot task
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM, persisting the cache
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "logo_similarity=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Logo Similarity Server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: max_entries={}, original_ttl={}s, replaced_ttl={}s, threshold={}, port={}",
        config.max_entries,
        config.original_ttl,
        config.replaced_ttl,
        config.default_threshold,
        config.server_port
    );

    let cache = Arc::new(RwLock::new(CacheStore::new(
        config.max_entries,
        config.max_payload_bytes,
    )));

    if let Some(path) = &config.snapshot_path {
        if let Err(err) = restore_snapshot(&cache, path).await {
            warn!("Starting with an empty cache: {}", err);
        }
    }

    let transport = logo_similarity::fetch::HttpTransport::new(config.request_timeout())
        .context("Failed to build HTTP client")?;
    let state = AppState::new(&config, cache.clone(), Arc::new(transport))
        .context("Invalid evaluator configuration")?;
    info!("Cache store and evaluator initialized");

    let snapshot_handle = config.snapshot_path.clone().map(|path| {
        info!("Background snapshot task started");
        spawn_snapshot_task(cache.clone(), path, config.snapshot_interval)
    });

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(snapshot_handle))
        .await
        .context("Server error")?;

    if let Some(path) = &config.snapshot_path {
        final_snapshot(&cache, path).await;
    }

    info!("Server shutdown complete");
    Ok(())
}

async fn final_snapshot(cache: &Arc<RwLock<CacheStore>>, path: &Path) {
    match persist_snapshot(cache, path).await {
        Ok(count) => info!("Saved {} cache entries to {}", count, path.display()),
        Err(err) => warn!("Final cache snapshot failed: {}", err),
    }
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the snapshot task and allows graceful shutdown.
async fn shutdown_signal(snapshot_handle: Option<tokio::task::JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
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

    if let Some(handle) = snapshot_handle {
        handle.abort();
        warn!("Snapshot task aborted");
    }
}
