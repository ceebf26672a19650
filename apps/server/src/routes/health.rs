//! Health check.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok` or `error`
    pub status: &'static str,
    pub database: &'static str,
    /// `connected`, `unreachable` or `not_configured`
    pub redis: &'static str,
    pub time: DateTime<Utc>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// GET /health
///
/// Always answers 200; the body says what is reachable. Redis is optional,
/// so an unreachable Redis does not make the server unhealthy.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database_ok = state.db.health_check().await;
    let redis = match &state.reset_codes {
        Some(store) if store.ping().await => "connected",
        Some(_) => "unreachable",
        None => "not_configured",
    };

    Json(HealthResponse {
        status: if database_ok { "ok" } else { "error" },
        database: if database_ok { "connected" } else { "disconnected" },
        redis,
        time: Utc::now(),
    })
}
