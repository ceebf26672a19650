//! # Error Types
//!
//! Domain-specific error types for kleen-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  kleen-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  kleen-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  Server errors (apps/server)                                           │
//! │  └── ApiError         - What HTTP clients see (JSON)                   │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every business-rule rejection leaves stored state untouched: callers
//! evaluate these rules before (or inside) the transaction that would
//! persist the change.

use chrono::NaiveDate;
use thiserror::Error;

use crate::types::{DrawerEventKind, OrderStatus};

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Requested status change is not a legal edge of the order pipeline.
    ///
    /// ## When This Occurs
    /// ```text
    /// received ──► ready        (skips cleaned)
    /// cancelled ──► cleaned     (cancelled is terminal)
    /// delivered ──► anything    (delivered is terminal)
    /// cleaned ──► cancelled     (cancel only from received)
    /// ```
    #[error("Order {order_number} cannot move from {from} to {to}")]
    InvalidTransition {
        order_number: String,
        from: OrderStatus,
        to: OrderStatus,
    },

    /// Staff edit attempted on a delivered or cancelled order.
    #[error("Order {order_number} is {status} and can no longer be edited")]
    OrderNotEditable {
        order_number: String,
        status: OrderStatus,
    },

    /// Caller may not perform this action on this resource.
    ///
    /// Used for customer self-service once an order has left `received`,
    /// and for orders that do not belong to the calling customer.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// User already has an open time entry.
    #[error("{user_name} is already clocked in")]
    AlreadyClockedIn { user_name: String },

    /// Another staff-role user holds the single staff shift.
    #[error("{blocking_user} is currently clocked in; only one staff member may be on shift")]
    AnotherStaffActive { blocking_user: String },

    /// Clock-out requested with no open time entry.
    #[error("{user_name} is not clocked in")]
    NotClockedIn { user_name: String },

    /// An opening or closing count already exists for the business date.
    #[error("The {kind} count for {date} has already been recorded")]
    DrawerEventExists {
        kind: DrawerEventKind,
        date: NaiveDate,
    },

    /// The amount due changed while a card charge was in flight.
    #[error("Order {order_number} now totals {due_cents} cents but {charged_cents} cents were charged")]
    ChargeAmountChanged {
        order_number: String,
        charged_cents: i64,
        due_cents: i64,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Shorthand for [`CoreError::Forbidden`].
    pub fn forbidden(reason: impl Into<String>) -> Self {
        CoreError::Forbidden(reason.into())
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must be zero or greater.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid date, non-finite number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_message() {
        let err = CoreError::InvalidTransition {
            order_number: "KP00007".to_string(),
            from: OrderStatus::Received,
            to: OrderStatus::Ready,
        };
        assert_eq!(
            err.to_string(),
            "Order KP00007 cannot move from received to ready"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(ValidationError::required("phone").to_string(), "phone is required");

        let err = ValidationError::OutOfRange {
            field: "discount".to_string(),
            min: 0,
            max: 100,
        };
        assert_eq!(err.to_string(), "discount must be between 0 and 100");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("items").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }

    #[test]
    fn test_drawer_event_exists_message() {
        let err = CoreError::DrawerEventExists {
            kind: DrawerEventKind::Opening,
            date: NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(),
        };
        assert_eq!(
            err.to_string(),
            "The opening count for 2024-03-09 has already been recorded"
        );
    }
}
