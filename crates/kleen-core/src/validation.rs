//! # Validation Module
//!
//! Input validation and normalisation for Kleen POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP handler                                                 │
//! │  └── Type validation (JSON deserialization)                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE + pricing/lifecycle rules                        │
//! │  └── Business rule validation, phone canonicalisation                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── UNIQUE / partial UNIQUE indexes (single open shift, ...)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Phone Numbers
//! Customers type phones every which way (`(212) 555-0101`, `+1 212 555 0101`).
//! Storage keeps digits only, and matching uses the trailing ten digits so the
//! country code is optional.
//!
//! ```rust
//! use kleen_core::validation::{canonical_phone, phone_key};
//!
//! assert_eq!(canonical_phone("(212) 555-0101"), "2125550101");
//! assert_eq!(phone_key("+1 212 555 0101").as_deref(), Some("2125550101"));
//! ```

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::money::Percent;
use crate::types::{CustomerUpdate, NewCustomer, NewFeedback, NewOrder};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Digits kept for phone matching.
pub const PHONE_KEY_DIGITS: usize = 10;

/// Minimum password length for portal accounts.
pub const MIN_PASSWORD_LEN: usize = 6;

const MAX_NAME_LEN: usize = 120;
const MAX_NOTE_LEN: usize = 2000;

// =============================================================================
// Phone
// =============================================================================

/// Strips everything but ASCII digits.
pub fn canonical_phone(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Trailing ten digits of a phone number, or all digits when shorter.
/// `None` when the input has no digits at all.
pub fn phone_key(raw: &str) -> Option<String> {
    let digits = canonical_phone(raw);
    if digits.is_empty() {
        return None;
    }
    let start = digits.len().saturating_sub(PHONE_KEY_DIGITS);
    Some(digits[start..].to_string())
}

/// Validates a phone number and returns its canonical (digits only) form.
///
/// ## Rules
/// - Must contain at least ten digits
/// - At most fifteen digits (E.164 limit)
pub fn validate_phone(raw: &str) -> ValidationResult<String> {
    let digits = canonical_phone(raw);
    if digits.is_empty() {
        return Err(ValidationError::required("phone"));
    }
    if digits.len() < PHONE_KEY_DIGITS {
        return Err(ValidationError::TooShort {
            field: "phone".to_string(),
            min: PHONE_KEY_DIGITS,
        });
    }
    if digits.len() > 15 {
        return Err(ValidationError::TooLong {
            field: "phone".to_string(),
            max: 15,
        });
    }
    Ok(digits)
}

// =============================================================================
// Strings
// =============================================================================

/// Validates a required display name (customer or staff).
pub fn validate_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::required("name"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_NAME_LEN,
        });
    }
    Ok(())
}

/// Loose email shape check: `local@domain.tld`.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };
    if !valid {
        return Err(ValidationError::invalid_format("email", "must look like name@example.com"));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.is_empty() {
        return Err(ValidationError::required("password"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: MIN_PASSWORD_LEN,
        });
    }
    Ok(())
}

fn validate_notes(notes: Option<&str>) -> ValidationResult<()> {
    if let Some(notes) = notes {
        if notes.chars().count() > MAX_NOTE_LEN {
            return Err(ValidationError::TooLong {
                field: "notes".to_string(),
                max: MAX_NOTE_LEN,
            });
        }
    }
    Ok(())
}

/// Discounts are whole-order percentages between 0 and 100.
pub fn validate_discount(discount: Percent) -> ValidationResult<()> {
    if discount < Percent::zero() || discount > Percent::hundred() {
        return Err(ValidationError::OutOfRange {
            field: "discount_percent".to_string(),
            min: 0,
            max: 100,
        });
    }
    Ok(())
}

// =============================================================================
// Customers
// =============================================================================

/// Validates a new customer and returns the canonical phone.
pub fn validate_new_customer(customer: &NewCustomer) -> ValidationResult<String> {
    validate_name(&customer.name)?;
    let phone = validate_phone(&customer.phone)?;
    if let Some(email) = customer.email.as_deref().filter(|e| !e.trim().is_empty()) {
        validate_email(email)?;
    }
    if let Some(discount) = customer.discount_percent {
        validate_discount(discount)?;
    }
    Ok(phone)
}

pub fn validate_customer_update(update: &CustomerUpdate) -> ValidationResult<()> {
    if let Some(name) = &update.name {
        validate_name(name)?;
    }
    if let Some(phone) = &update.phone {
        validate_phone(phone)?;
    }
    if let Some(email) = update.email.as_deref().filter(|e| !e.trim().is_empty()) {
        validate_email(email)?;
    }
    if let Some(discount) = update.discount_percent {
        validate_discount(discount)?;
    }
    Ok(())
}

// =============================================================================
// Orders
// =============================================================================

/// Field checks for a new order that don't depend on pricing.
///
/// Item quantities, prices and the discount are validated by
/// [`pricing::compute`](crate::pricing::compute) when totals are computed.
pub fn validate_new_order(order: &NewOrder) -> ValidationResult<()> {
    if let Some(weight) = order.weight_lbs {
        if !weight.is_finite() {
            return Err(ValidationError::invalid_format("weight_lbs", "must be a finite number"));
        }
        if weight < 0.0 {
            return Err(ValidationError::MustNotBeNegative {
                field: "weight_lbs".to_string(),
            });
        }
    }
    if let Some(email) = order.customer_email.as_deref().filter(|e| !e.trim().is_empty()) {
        validate_email(email)?;
    }
    for item in &order.items {
        if item.description.trim().is_empty() {
            return Err(ValidationError::required("items.description"));
        }
    }
    validate_notes(order.notes.as_deref())
}

// =============================================================================
// Feedback / Dates
// =============================================================================

pub fn validate_feedback(feedback: &NewFeedback) -> ValidationResult<()> {
    if feedback.message.trim().is_empty() {
        return Err(ValidationError::required("message"));
    }
    if let Some(rating) = feedback.rating {
        if !(1..=5).contains(&rating) {
            return Err(ValidationError::OutOfRange {
                field: "rating".to_string(),
                min: 1,
                max: 5,
            });
        }
    }
    validate_notes(Some(&feedback.message))
}

/// Parses a `YYYY-MM-DD` query/body date.
pub fn parse_date(field: &str, value: &str) -> ValidationResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| ValidationError::invalid_format(field, "expected YYYY-MM-DD"))
}

// =============================================================================
// Unit Tests
// =============================================================================
