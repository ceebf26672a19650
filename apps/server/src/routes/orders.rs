//! Orders (staff).
//!
//! - GET /api/orders?status=&customer_id=&date=&search=&limit=
//! - POST /api/orders
//! - GET /api/orders/{id}
//! - PATCH /api/orders/{id} → partial edit, re-priced when money changes
//! - PUT /api/orders/{id}/status → one forward step (or re-stamp)
//! - POST /api/orders/{id}/cancel
//! - PUT /api/orders/{id}/payment
//! - POST /api/orders/{id}/charge → card via the payment gateway
//! - POST /api/orders/{id}/pickup → driver collected it
//! - POST /api/orders/{id}/deliver → delivery fast path
//! - DELETE /api/orders/{id}, DELETE /api/orders → admin

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use kleen_core::validation::parse_date;
use kleen_core::{NewOrder, Order, OrderStatus, OrderUpdate, PaymentMethod, PaymentStatus};
use kleen_db::OrderFilter;
use serde::{Deserialize, Serialize};

use crate::auth::{AdminUser, DriverUser, StaffUser};
use crate::error::ApiResult;
use crate::services::payment::CardDetails;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
    pub customer_id: Option<String>,
    /// Business date, `YYYY-MM-DD`
    pub date: Option<String>,
    pub search: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DeliverRequest {
    /// Reference to the proof-of-delivery photo.
    pub photo: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteAllResponse {
    pub deleted: u64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/orders", get(list).post(create).delete(delete_all))
        .route("/api/orders/{id}", get(get_one).patch(update).delete(delete))
        .route("/api/orders/{id}/status", put(set_status))
        .route("/api/orders/{id}/cancel", post(cancel))
        .route("/api/orders/{id}/payment", put(set_payment))
        .route("/api/orders/{id}/charge", post(charge))
        .route("/api/orders/{id}/pickup", post(pickup))
        .route("/api/orders/{id}/deliver", post(deliver))
}

/// GET /api/orders
pub async fn list(
    State(state): State<AppState>,
    StaffUser(_actor): StaffUser,
    Query(query): Query<OrderQuery>,
) -> ApiResult<Json<Vec<Order>>> {
    let business_date = match query.date.as_deref() {
        Some(date) => Some(parse_date("date", date)?),
        None => None,
    };
    let filter = OrderFilter {
        status: query.status,
        customer_id: query.customer_id,
        business_date,
        search: query.search,
        limit: query.limit,
    };
    Ok(Json(state.db.orders().list(&filter).await?))
}

/// POST /api/orders
pub async fn create(
    State(state): State<AppState>,
    StaffUser(actor): StaffUser,
    Json(input): Json<NewOrder>,
) -> ApiResult<(StatusCode, Json<Order>)> {
    let order = state.orders.create(input, &actor).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /api/orders/{id}
pub async fn get_one(
    State(state): State<AppState>,
    StaffUser(_actor): StaffUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Order>> {
    Ok(Json(state.db.orders().get(&id).await?))
}

/// PATCH /api/orders/{id}
pub async fn update(
    State(state): State<AppState>,
    StaffUser(_actor): StaffUser,
    Path(id): Path<String>,
    Json(update): Json<OrderUpdate>,
) -> ApiResult<Json<Order>> {
    Ok(Json(state.orders.update(&id, update).await?))
}

/// PUT /api/orders/{id}/status
pub async fn set_status(
    State(state): State<AppState>,
    StaffUser(actor): StaffUser,
    Path(id): Path<String>,
    Json(req): Json<StatusRequest>,
) -> ApiResult<Json<Order>> {
    Ok(Json(state.orders.set_status(&id, req.status, &actor).await?))
}

/// POST /api/orders/{id}/cancel
pub async fn cancel(
    State(state): State<AppState>,
    StaffUser(actor): StaffUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Order>> {
    Ok(Json(state.db.orders().cancel(&id, &actor).await?))
}

/// PUT /api/orders/{id}/payment
pub async fn set_payment(
    State(state): State<AppState>,
    StaffUser(_actor): StaffUser,
    Path(id): Path<String>,
    Json(req): Json<PaymentRequest>,
) -> ApiResult<Json<Order>> {
    let order = state
        .db
        .orders()
        .set_payment(&id, req.payment_status, req.payment_method)
        .await?;
    Ok(Json(order))
}

/// POST /api/orders/{id}/charge
pub async fn charge(
    State(state): State<AppState>,
    StaffUser(_actor): StaffUser,
    Path(id): Path<String>,
    Json(card): Json<CardDetails>,
) -> ApiResult<Json<Order>> {
    Ok(Json(state.orders.charge_card(&id, card).await?))
}

/// POST /api/orders/{id}/pickup
pub async fn pickup(
    State(state): State<AppState>,
    DriverUser(actor): DriverUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Order>> {
    Ok(Json(state.db.orders().mark_picked_up(&id, &actor).await?))
}

/// POST /api/orders/{id}/deliver
pub async fn deliver(
    State(state): State<AppState>,
    StaffUser(actor): StaffUser,
    Path(id): Path<String>,
    Json(req): Json<DeliverRequest>,
) -> ApiResult<Json<Order>> {
    Ok(Json(state.orders.deliver(&id, &actor, req.photo).await?))
}

/// DELETE /api/orders/{id}
pub async fn delete(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.orders().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/orders
pub async fn delete_all(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> ApiResult<Json<DeleteAllResponse>> {
    let deleted = state.db.orders().delete_all().await?;
    Ok(Json(DeleteAllResponse { deleted }))
}
