//! Customer portal.
//!
//! ## Routes
//! - POST /api/public/customer-login → sign in, or sign up on first visit
//! - GET/PUT /api/public/customer-info → own profile
//! - GET /api/public/my-orders
//! - POST /api/public/orders → book (catalog-priced)
//! - PATCH /api/public/orders/{id}, POST /api/public/orders/{id}/cancel
//!   → only while `received`
//! - POST /api/public/feedback
//! - POST /api/public/password-reset/request, .../confirm
//! - GET /api/feedback → admin
//!
//! ## Login
//! ```text
//! phone known? ──no──► email known? ──no──► phone + name given? ──no──► 400
//!     │                    │                    └─yes─► create, is_new = true
//!     │◄───────────yes─────┘
//!     └─yes─► password set? ──no──► set it (first portal visit)
//!                 └─yes─► verify ──fail──► 401
//! ```

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use kleen_core::validation::validate_password;
use kleen_core::{
    Customer, CustomerOrderEdit, CustomerUpdate, Feedback, NewFeedback, NotificationPreference,
    Order,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::auth::{hash_password, verify_password, AdminUser, CustomerAuth};
use crate::error::{ApiError, ApiResult};
use crate::services::notify::{Channel, Notification};
use crate::services::orders::PortalOrder;
use crate::services::reset_codes::{ResetCheck, ResetStoreError};
use crate::AppState;

// =============================================================================
// Request / Response Types
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CustomerLoginRequest {
    /// Primary lookup key; required to create an account.
    pub phone: String,
    pub password: String,
    /// Required only when the phone is not registered yet.
    pub name: Option<String>,
    /// Alternate lookup key when the phone is absent or unmatched.
    pub email: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CustomerLoginResponse {
    pub customer: Customer,
    pub token: String,
    pub is_new: bool,
}

/// Fields a customer may change on their own profile.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub notification_preference: Option<NotificationPreference>,
}

impl From<ProfileUpdate> for CustomerUpdate {
    fn from(profile: ProfileUpdate) -> Self {
        CustomerUpdate {
            name: profile.name,
            email: profile.email,
            address: profile.address,
            notification_preference: profile.notification_preference,
            ..CustomerUpdate::default()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub phone: String,
}

#[derive(Debug, Serialize)]
pub struct ResetRequested {
    pub sent: bool,
}

#[derive(Debug, Deserialize)]
pub struct ResetConfirm {
    pub phone: String,
    pub code: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct ResetConfirmed {
    pub reset: bool,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/public/customer-login", post(login))
        .route("/api/public/customer-info", get(profile).put(update_profile))
        .route("/api/public/my-orders", get(my_orders))
        .route("/api/public/orders", post(create_order))
        .route("/api/public/orders/{id}", patch(edit_order))
        .route("/api/public/orders/{id}/cancel", post(cancel_order))
        .route("/api/public/feedback", post(leave_feedback))
        .route("/api/public/password-reset/request", post(request_reset))
        .route("/api/public/password-reset/confirm", post(confirm_reset))
        .route("/api/feedback", get(list_feedback))
}

/// The customer behind a portal token. A deleted account is logged out.
async fn current_customer(state: &AppState, auth: &CustomerAuth) -> ApiResult<Customer> {
    state
        .db
        .customers()
        .get_by_id(&auth.customer_id)
        .await?
        .ok_or_else(|| ApiError::unauthenticated("Account no longer exists"))
}

// =============================================================================
// Account
// =============================================================================

/// POST /api/public/customer-login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<CustomerLoginRequest>,
) -> ApiResult<Json<CustomerLoginResponse>> {
    let email = req.email.as_deref().map(str::trim).filter(|e| !e.is_empty());
    if (req.phone.trim().is_empty() && email.is_none()) || req.password.is_empty() {
        return Err(ApiError::validation("Phone (or email) and password are required"));
    }

    let customers = state.db.customers();
    let mut existing = customers.find_by_phone(&req.phone).await?;
    if existing.is_none() {
        if let Some(email) = email {
            existing = customers.find_by_email(email).await?;
            if let Some(customer) = &existing {
                debug!(customer = %customer.id, "Portal login matched by email");
            }
        }
    }

    let (customer, is_new) = match existing {
        None => {
            if req.phone.trim().is_empty() {
                return Err(ApiError::validation("Phone is required to create an account"));
            }
            let name = req
                .name
                .as_deref()
                .filter(|n| !n.trim().is_empty())
                .ok_or_else(|| ApiError::validation("Name is required to create an account"))?;
            validate_password(&req.password)?;

            let created = customers
                .create_with_password(name, &req.phone, hash_password(&req.password)?)
                .await?;
            let customer = if req.email.is_some() || req.address.is_some() {
                let extras = CustomerUpdate {
                    email: req.email,
                    address: req.address,
                    ..CustomerUpdate::default()
                };
                customers.update(&created.id, extras).await?
            } else {
                created
            };
            info!(customer = %customer.id, "Portal account created");
            (customer, true)
        }
        Some(customer) => match customer.password_hash.clone() {
            Some(hash) => {
                if !verify_password(&req.password, &hash) {
                    warn!(customer = %customer.id, "Failed portal login");
                    return Err(ApiError::unauthenticated("Invalid login or password"));
                }
                (customer, false)
            }
            None => {
                validate_password(&req.password)?;
                customers
                    .set_password(&customer.id, &hash_password(&req.password)?)
                    .await?;
                info!(customer = %customer.id, "Portal password set on first login");
                (customer, false)
            }
        },
    };

    let token = state.jwt.issue_customer(&customer)?;
    Ok(Json(CustomerLoginResponse {
        customer,
        token,
        is_new,
    }))
}

/// GET /api/public/customer-info
pub async fn profile(State(state): State<AppState>, auth: CustomerAuth) -> ApiResult<Json<Customer>> {
    Ok(Json(current_customer(&state, &auth).await?))
}

/// PUT /api/public/customer-info
///
/// Phone, discount and plan are staff-managed and cannot be changed here.
pub async fn update_profile(
    State(state): State<AppState>,
    auth: CustomerAuth,
    Json(update): Json<ProfileUpdate>,
) -> ApiResult<Json<Customer>> {
    let customer = current_customer(&state, &auth).await?;
    Ok(Json(state.db.customers().update(&customer.id, update.into()).await?))
}

// =============================================================================
// Orders
// =============================================================================

/// GET /api/public/my-orders
///
/// Linked orders plus unlinked ones whose snapshot phone matches.
pub async fn my_orders(State(state): State<AppState>, auth: CustomerAuth) -> ApiResult<Json<Vec<Order>>> {
    let customer = current_customer(&state, &auth).await?;
    let orders = state
        .db
        .orders()
        .list_for_customer(&customer.id, &customer.phone_key)
        .await?;
    Ok(Json(orders))
}

/// POST /api/public/orders
pub async fn create_order(
    State(state): State<AppState>,
    auth: CustomerAuth,
    Json(request): Json<PortalOrder>,
) -> ApiResult<(StatusCode, Json<Order>)> {
    let customer = current_customer(&state, &auth).await?;
    let order = state.orders.create_for_customer(&customer, request).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// PATCH /api/public/orders/{id}
pub async fn edit_order(
    State(state): State<AppState>,
    auth: CustomerAuth,
    Path(id): Path<String>,
    Json(edit): Json<CustomerOrderEdit>,
) -> ApiResult<Json<Order>> {
    let customer = current_customer(&state, &auth).await?;
    Ok(Json(state.orders.update_as_customer(&id, &customer, edit).await?))
}

/// POST /api/public/orders/{id}/cancel
pub async fn cancel_order(
    State(state): State<AppState>,
    auth: CustomerAuth,
    Path(id): Path<String>,
) -> ApiResult<Json<Order>> {
    let customer = current_customer(&state, &auth).await?;
    let order = state
        .db
        .orders()
        .cancel_as_customer(&id, &customer.id, &customer.phone_key, &customer.name)
        .await?;
    Ok(Json(order))
}

// =============================================================================
// Feedback
// =============================================================================

/// POST /api/public/feedback
pub async fn leave_feedback(
    State(state): State<AppState>,
    auth: CustomerAuth,
    Json(input): Json<NewFeedback>,
) -> ApiResult<(StatusCode, Json<Feedback>)> {
    let customer = current_customer(&state, &auth).await?;
    let feedback = state.db.feedback().create(&customer, input).await?;
    Ok((StatusCode::CREATED, Json(feedback)))
}

/// GET /api/feedback
pub async fn list_feedback(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> ApiResult<Json<Vec<Feedback>>> {
    Ok(Json(state.db.feedback().list().await?))
}

// =============================================================================
// Password Reset
// =============================================================================

fn reset_store_error(err: ResetStoreError) -> ApiError {
    error!(error = %err, "Reset code store failed");
    ApiError::unavailable("Password reset is temporarily unavailable")
}

/// POST /api/public/password-reset/request
///
/// Answers the same way for unknown phones so the endpoint cannot be used
/// to discover accounts.
pub async fn request_reset(
    State(state): State<AppState>,
    Json(req): Json<ResetRequest>,
) -> ApiResult<Json<ResetRequested>> {
    let store = state
        .reset_codes
        .as_ref()
        .ok_or_else(|| ApiError::unavailable("Password reset is not configured"))?;

    let Some(customer) = state.db.customers().find_by_phone(&req.phone).await? else {
        debug!("Password reset requested for unknown phone");
        return Ok(Json(ResetRequested { sent: true }));
    };

    let code = store.issue(&customer.id).await.map_err(reset_store_error)?;
    let (channel, recipient) = match (customer.notification_preference, &customer.email) {
        (NotificationPreference::Email, Some(email)) => (Channel::Email, email.clone()),
        _ => (Channel::Sms, customer.phone.clone()),
    };
    state.notifier.dispatch(Notification::reset_code(
        channel,
        recipient,
        &code,
        state.config.reset_code_ttl_secs,
    ));

    info!(customer = %customer.id, "Password reset code issued");
    Ok(Json(ResetRequested { sent: true }))
}

/// POST /api/public/password-reset/confirm
///
/// A wrong code leaves the live code in place; the right one is single-use.
pub async fn confirm_reset(
    State(state): State<AppState>,
    Json(req): Json<ResetConfirm>,
) -> ApiResult<Json<ResetConfirmed>> {
    let store = state
        .reset_codes
        .as_ref()
        .ok_or_else(|| ApiError::unavailable("Password reset is not configured"))?;
    validate_password(&req.new_password)?;

    let customer = state.db.customers().find_by_phone(&req.phone).await?;
    let check = match &customer {
        Some(customer) => store
            .consume(&customer.id, req.code.trim())
            .await
            .map_err(reset_store_error)?,
        None => ResetCheck::Expired,
    };

    let customer = match (check, customer) {
        (ResetCheck::Ok, Some(customer)) => customer,
        (ResetCheck::Mismatch, _) => return Err(ApiError::validation("Invalid reset code")),
        _ => return Err(ApiError::validation("Reset code expired")),
    };

    state
        .db
        .customers()
        .set_password(&customer.id, &hash_password(&req.new_password)?)
        .await?;
    info!(customer = %customer.id, "Portal password reset");
    Ok(Json(ResetConfirmed { reset: true }))
}

// =============================================================================
// Tests
// =============================================================================
