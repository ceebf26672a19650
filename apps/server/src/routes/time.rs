//! Time clock.
//!
//! - GET /api/time-entries/status → the caller's open shift
//! - POST /api/time-entries/clock-in
//! - POST /api/time-entries/clock-out
//! - POST /api/time-entries/{user_id}/force-clock-out → admin
//! - GET /api/time-entries?date= → admin, a day's shifts
//!
//! Request bodies are optional; an empty POST is a plain clock-in/out.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use kleen_core::timeclock::{ClockIn, ClockOut};
use kleen_core::validation::parse_date;
use kleen_core::TimeEntry;
use kleen_db::business_date_today;
use serde::{Deserialize, Serialize};

use crate::auth::{AdminUser, StaffUser};
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ClockStatus {
    pub clocked_in: bool,
    pub entry: Option<TimeEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EntriesQuery {
    pub date: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/time-entries", get(list))
        .route("/api/time-entries/status", get(status))
        .route("/api/time-entries/clock-in", post(clock_in))
        .route("/api/time-entries/clock-out", post(clock_out))
        .route("/api/time-entries/{user_id}/force-clock-out", post(force_clock_out))
}

/// GET /api/time-entries/status
pub async fn status(State(state): State<AppState>, StaffUser(actor): StaffUser) -> ApiResult<Json<ClockStatus>> {
    let entry = state.db.time_entries().current(&actor.id).await?;
    Ok(Json(ClockStatus {
        clocked_in: entry.is_some(),
        entry,
    }))
}

/// POST /api/time-entries/clock-in
///
/// Only one `staff` member may be on shift at a time; admins and drivers
/// are not limited.
pub async fn clock_in(
    State(state): State<AppState>,
    StaffUser(actor): StaffUser,
    body: Option<Json<ClockIn>>,
) -> ApiResult<(StatusCode, Json<TimeEntry>)> {
    let input = body.map(|Json(input)| input).unwrap_or_default();
    let entry = state
        .db
        .time_entries()
        .clock_in(&actor, &input, business_date_today())
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// POST /api/time-entries/clock-out
pub async fn clock_out(
    State(state): State<AppState>,
    StaffUser(actor): StaffUser,
    body: Option<Json<ClockOut>>,
) -> ApiResult<Json<TimeEntry>> {
    let input = body.map(|Json(input)| input).unwrap_or_default();
    let entry = state
        .db
        .time_entries()
        .clock_out(&actor.id, &actor.name, &input)
        .await?;
    Ok(Json(entry))
}

/// POST /api/time-entries/{user_id}/force-clock-out
pub async fn force_clock_out(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<String>,
    body: Option<Json<ClockOut>>,
) -> ApiResult<Json<TimeEntry>> {
    let input = body.map(|Json(input)| input).unwrap_or_default();
    let entry = state
        .db
        .time_entries()
        .force_clock_out(&user_id, &input, &admin)
        .await?;
    Ok(Json(entry))
}

/// GET /api/time-entries
pub async fn list(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<EntriesQuery>,
) -> ApiResult<Json<Vec<TimeEntry>>> {
    let date = match query.date.as_deref() {
        Some(date) => parse_date("date", date)?,
        None => business_date_today(),
    };
    Ok(Json(state.db.time_entries().list_for_date(date).await?))
}
