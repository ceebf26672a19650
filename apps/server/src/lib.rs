//! # Kleen Server
//!
//! HTTP API for the Kleen POS: counter staff, the delivery driver and the
//! customer portal all talk to this server.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Kleen Server                                    │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │  Staff API     │  │  Driver API    │  │  Customer Portal           ││
//! │  │                │  │                │  │                            ││
//! │  │ • orders       │  │ • work queue   │  │ • login / profile          ││
//! │  │ • customers    │  │ • pickup       │  │ • my orders, book, edit    ││
//! │  │ • drawer, time │  │ • deliver      │  │ • feedback, password reset ││
//! │  │ • reports      │  │                │  │                            ││
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘│
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                      Infrastructure                               │  │
//! │  │                                                                   │  │
//! │  │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────────────┐│  │
//! │  │  │   SQLite     │  │    Redis     │  │  Gateway / Notifier      ││  │
//! │  │  │  (kleen-db)  │  │ reset codes  │  │  (timeouts, best-effort) ││  │
//! │  │  └──────────────┘  └──────────────┘  └──────────────────────────┘│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables (see [`config::ServerConfig`]):
//! - `PORT` - HTTP port (default: 3001)
//! - `DATABASE_PATH` - SQLite file (default: kleen.db)
//! - `REDIS_URL` - Redis connection string (password reset is off without it)
//! - `JWT_SECRET` - Secret for JWT signing
//! - `IO_TIMEOUT_MS`, `REQUEST_TIMEOUT_MS` - Time bounds

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::Router;
use kleen_db::Database;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::auth::JwtManager;
use crate::services::{NotificationDispatcher, OrderService, PaymentGateway, ResetCodeStore};

// Re-exports
pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};

/// Shared application state.
///
/// Cheap to clone: every field is a pool, an `Arc` or a small value.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub jwt: JwtManager,
    pub orders: OrderService,
    pub notifier: NotificationDispatcher,
    /// `None` when Redis is not configured; password reset is then disabled.
    pub reset_codes: Option<Arc<dyn ResetCodeStore>>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(
        db: Database,
        config: ServerConfig,
        gateway: Arc<dyn PaymentGateway>,
        notifier: NotificationDispatcher,
        reset_codes: Option<Arc<dyn ResetCodeStore>>,
    ) -> Self {
        let jwt = JwtManager::new(
            config.jwt_secret.clone(),
            config.staff_token_lifetime_secs,
            config.customer_token_lifetime_secs,
        );
        let orders = OrderService::new(db.clone(), gateway, notifier.clone(), config.io_timeout);

        AppState {
            db,
            jwt,
            orders,
            notifier,
            reset_codes,
            config: Arc::new(config),
        }
    }
}

/// Builds the full HTTP router with tracing and the request time bound.
pub fn build_router(state: AppState) -> Router {
    let request_timeout = state.config.request_timeout;

    routes::router()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}

// =============================================================================
// Test Support
// =============================================================================
