//! Business settings.
//!
//! - GET /api/settings → every key (public; the storefront shows the profile)
//! - PUT /api/settings → admin, `{ "key": "value", ... }` upserts

use std::collections::BTreeMap;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::auth::AdminUser;
use crate::error::ApiResult;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/settings", get(list).put(update))
}

/// GET /api/settings
pub async fn list(State(state): State<AppState>) -> ApiResult<Json<BTreeMap<String, String>>> {
    Ok(Json(state.db.settings().all().await?))
}

/// PUT /api/settings
///
/// Keys are written one at a time; a rejected value (e.g. a non-numeric
/// `tax_rate`) stops the update at that key.
pub async fn update(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Json(changes): Json<BTreeMap<String, String>>,
) -> ApiResult<Json<BTreeMap<String, String>>> {
    let settings = state.db.settings();
    for (key, value) in &changes {
        settings.set(key, value).await?;
    }
    Ok(Json(settings.all().await?))
}
