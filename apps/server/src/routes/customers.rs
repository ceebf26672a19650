//! Customer management for staff.
//!
//! - GET /api/customers?search= → list by name
//! - POST /api/customers → create at the counter
//! - GET /api/customers/{id}
//! - PUT /api/customers/{id} → partial update
//! - DELETE /api/customers/{id} → admin; orders are detached, never deleted

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use kleen_core::{Customer, CustomerUpdate, NewCustomer};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::{AdminUser, StaffUser};
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CustomerQuery {
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteCustomerResponse {
    pub deleted: bool,
    /// Orders that kept their snapshot but lost the customer link.
    pub detached_orders: u64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/customers", get(list).post(create))
        .route("/api/customers/{id}", get(get_one).put(update).delete(delete))
}

/// GET /api/customers
pub async fn list(
    State(state): State<AppState>,
    StaffUser(_actor): StaffUser,
    Query(query): Query<CustomerQuery>,
) -> ApiResult<Json<Vec<Customer>>> {
    Ok(Json(state.db.customers().list(query.search.as_deref()).await?))
}

/// POST /api/customers
pub async fn create(
    State(state): State<AppState>,
    StaffUser(actor): StaffUser,
    Json(input): Json<NewCustomer>,
) -> ApiResult<(StatusCode, Json<Customer>)> {
    let customer = state.db.customers().create(input).await?;
    info!(customer = %customer.id, by = %actor.name, "Customer created at counter");
    Ok((StatusCode::CREATED, Json(customer)))
}

/// GET /api/customers/{id}
pub async fn get_one(
    State(state): State<AppState>,
    StaffUser(_actor): StaffUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Customer>> {
    Ok(Json(state.db.customers().get(&id).await?))
}

/// PUT /api/customers/{id}
pub async fn update(
    State(state): State<AppState>,
    StaffUser(_actor): StaffUser,
    Path(id): Path<String>,
    Json(update): Json<CustomerUpdate>,
) -> ApiResult<Json<Customer>> {
    Ok(Json(state.db.customers().update(&id, update).await?))
}

/// DELETE /api/customers/{id}
pub async fn delete(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteCustomerResponse>> {
    let detached_orders = state.db.customers().delete(&id).await?;
    Ok(Json(DeleteCustomerResponse {
        deleted: true,
        detached_orders,
    }))
}
