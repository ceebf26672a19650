//! # Kleen Server
//!
//! REST API for the Kleen POS, driver app and customer portal.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Kleen Server                                   │
//! │                                                                         │
//! │  POS / Driver / Portal ───► HTTP (3001) ───► Handlers ───► SQLite      │
//! │                                                  │                      │
//! │                                                  ▼                      │
//! │                                                Redis                    │
//! │                                            (reset codes)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use kleen_db::{Database, DbConfig};
use kleen_server::services::{
    LogNotifier, NotificationDispatcher, RedisResetCodeStore, ResetCodeStore, SandboxGateway,
};
use kleen_server::{build_router, AppState, ServerConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,kleen=debug,sqlx=warn")),
        )
        .with_target(true)
        .init();

    info!("Starting Kleen server...");

    // Load configuration
    let config = ServerConfig::load().context("invalid configuration")?;
    info!(
        port = config.port,
        database = %config.database_path,
        redis = config.redis_url.is_some(),
        "Configuration loaded"
    );

    // Open database (runs migrations)
    let db = Database::new(
        DbConfig::new(&config.database_path).max_connections(config.db_max_connections),
    )
    .await
    .context("failed to open database")?;
    info!("Database ready");

    // Connect to Redis (optional; password reset needs it)
    let reset_codes: Option<Arc<dyn ResetCodeStore>> = match &config.redis_url {
        Some(redis_url) => match redis::Client::open(redis_url.as_str()) {
            Ok(client) => match RedisResetCodeStore::connect(client, config.reset_code_ttl_secs).await {
                Ok(store) => {
                    info!("Connected to Redis");
                    Some(Arc::new(store))
                }
                Err(e) => {
                    warn!(error = %e, "Failed to connect to Redis, password reset disabled");
                    None
                }
            },
            Err(e) => {
                warn!(error = %e, "Invalid Redis URL, password reset disabled");
                None
            }
        },
        None => {
            info!("REDIS_URL not set, password reset disabled");
            None
        }
    };

    let notifier = NotificationDispatcher::new(Arc::new(LogNotifier), config.io_timeout);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    // Create shared state
    let state = AppState::new(db.clone(), config, Arc::new(SandboxGateway), notifier, reset_codes);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
