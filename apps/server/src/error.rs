//! # API Error Type
//!
//! Unified error type for HTTP handlers.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Handler: Result<Json<T>, ApiError>                                     │
//! │         │                                                               │
//! │         ├── ValidationError ───────────────► 400 VALIDATION_ERROR       │
//! │         ├── missing / bad token ───────────► 401 UNAUTHENTICATED        │
//! │         ├── CoreError::Forbidden, role ────► 403 FORBIDDEN              │
//! │         ├── DbError::NotFound ─────────────► 404 NOT_FOUND              │
//! │         ├── CoreError (domain rule) ───────► 409 BUSINESS_RULE          │
//! │         ├── DbError::UniqueViolation ──────► 409 CONFLICT               │
//! │         ├── card declined ─────────────────► 402 PAYMENT_DECLINED       │
//! │         ├── gateway unreachable ───────────► 502 GATEWAY_ERROR          │
//! │         ├── collaborator timed out ────────► 504 TIMEOUT                │
//! │         ├── feature not configured ────────► 503 UNAVAILABLE            │
//! │         └── any other DbError ─────────────► 500 DATABASE_ERROR         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format
//! ```json
//! { "code": "BUSINESS_RULE", "message": "Order KP00042 cannot move from received to ready" }
//! ```
//! Storage failures are logged in full and reported with a generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use kleen_core::{CoreError, ValidationError};
use kleen_db::DbError;
use serde::Serialize;
use tracing::error;

/// Error returned from every handler.
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    Unauthenticated,
    Forbidden,
    NotFound,
    BusinessRule,
    Conflict,
    PaymentDeclined,
    GatewayError,
    Timeout,
    Unavailable,
    DatabaseError,
    Internal,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthenticated => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::BusinessRule | ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::PaymentDeclined => StatusCode::PAYMENT_REQUIRED,
            ErrorCode::GatewayError => StatusCode::BAD_GATEWAY,
            ErrorCode::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorCode::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::DatabaseError | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Unauthenticated, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Forbidden, message)
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn payment_declined(reason: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::PaymentDeclined, reason)
    }

    pub fn gateway(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::GatewayError, message)
    }

    pub fn timeout(what: &str) -> Self {
        ApiError::new(ErrorCode::Timeout, format!("{} timed out", what))
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Unavailable, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}

/// Converts domain errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => ApiError::validation(e.to_string()),
            CoreError::Forbidden(reason) => ApiError::forbidden(reason),
            rule @ (CoreError::InvalidTransition { .. }
            | CoreError::OrderNotEditable { .. }
            | CoreError::AlreadyClockedIn { .. }
            | CoreError::AnotherStaffActive { .. }
            | CoreError::NotClockedIn { .. }
            | CoreError::DrawerEventExists { .. }
            | CoreError::ChargeAmountChanged { .. }) => {
                ApiError::new(ErrorCode::BusinessRule, rule.to_string())
            }
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Domain(e) => e.into(),
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { .. } => ApiError::new(ErrorCode::Conflict, err.to_string()),
            DbError::ForeignKeyViolation { .. } => {
                ApiError::new(ErrorCode::Conflict, "Referenced record does not exist")
            }
            DbError::PoolExhausted => {
                error!(error = %err, "Database pool exhausted");
                ApiError::timeout("Database")
            }
            other => {
                error!(error = %other, "Database error");
                ApiError::new(ErrorCode::DatabaseError, "Database error")
            }
        }
    }
}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;
