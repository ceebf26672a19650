//! Card payment gateway.
//!
//! The gateway is a narrow collaborator: one charge call that either
//! approves (transaction id + last four digits) or declines with a reason.
//! Card numbers and CVVs pass through memory only; they are never stored,
//! logged or echoed back.

use std::fmt;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use kleen_core::Money;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

/// Card details as submitted by the POS.
#[derive(Clone, Deserialize)]
pub struct CardDetails {
    pub number: String,
    /// `MM/YY`
    pub expiry: String,
    pub cvv: String,
}

impl CardDetails {
    pub fn digits(&self) -> String {
        self.number.chars().filter(char::is_ascii_digit).collect()
    }

    pub fn last_four(&self) -> String {
        let digits = self.digits();
        digits[digits.len().saturating_sub(4)..].to_string()
    }
}

impl fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardDetails")
            .field("number", &format_args!("****{}", self.last_four()))
            .field("expiry", &self.expiry)
            .field("cvv", &"***")
            .finish()
    }
}

/// Result of a charge the gateway answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChargeOutcome {
    Approved {
        transaction_id: String,
        last_four: String,
    },
    Declined {
        reason: String,
    },
}

/// The gateway could not be reached or answered nonsense.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Payment gateway unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Charges `amount` to `card`. `reference` identifies the order.
    async fn charge(
        &self,
        card: &CardDetails,
        amount: Money,
        reference: &str,
    ) -> Result<ChargeOutcome, GatewayError>;
}

// =============================================================================
// Sandbox
// =============================================================================

/// Development gateway: approves any well-formed, unexpired card.
///
/// Cards ending in `0002` are declined for insufficient funds so the decline
/// path can be exercised end to end.
#[derive(Debug, Clone, Default)]
pub struct SandboxGateway;

impl SandboxGateway {
    fn review(card: &CardDetails, today: NaiveDate) -> Option<String> {
        let digits = card.digits();
        if !(12..=19).contains(&digits.len()) || !luhn_valid(&digits) {
            return Some("Card number is invalid".to_string());
        }
        match parse_expiry(&card.expiry) {
            None => return Some("Expiry must be MM/YY".to_string()),
            Some((year, month)) if (year, month) < (today.year(), today.month()) => {
                return Some("Card has expired".to_string())
            }
            Some(_) => {}
        }
        let cvv_ok = (3..=4).contains(&card.cvv.len()) && card.cvv.chars().all(|c| c.is_ascii_digit());
        if !cvv_ok {
            return Some("Invalid security code".to_string());
        }
        if digits.ends_with("0002") {
            return Some("Insufficient funds".to_string());
        }
        None
    }
}

#[async_trait]
impl PaymentGateway for SandboxGateway {
    async fn charge(
        &self,
        card: &CardDetails,
        amount: Money,
        reference: &str,
    ) -> Result<ChargeOutcome, GatewayError> {
        let outcome = match Self::review(card, Utc::now().date_naive()) {
            Some(reason) => ChargeOutcome::Declined { reason },
            None => ChargeOutcome::Approved {
                transaction_id: format!("sbx_{}", Uuid::new_v4().simple()),
                last_four: card.last_four(),
            },
        };
        info!(
            reference = %reference,
            amount_cents = amount.cents(),
            approved = matches!(outcome, ChargeOutcome::Approved { .. }),
            "Sandbox charge"
        );
        Ok(outcome)
    }
}

/// Luhn checksum over a digit string.
pub fn luhn_valid(digits: &str) -> bool {
    let mut sum = 0;
    for (i, c) in digits.chars().rev().enumerate() {
        let Some(mut d) = c.to_digit(10) else {
            return false;
        };
        if i % 2 == 1 {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
    }
    !digits.is_empty() && sum % 10 == 0
}

/// `MM/YY` → (year, month).
fn parse_expiry(expiry: &str) -> Option<(i32, u32)> {
    let (month, year) = expiry.trim().split_once('/')?;
    let month: u32 = month.trim().parse().ok()?;
    let year: i32 = year.trim().parse().ok()?;
    if !(1..=12).contains(&month) {
        return None;
    }
    let year = if year < 100 { 2000 + year } else { year };
    Some((year, month))
}
