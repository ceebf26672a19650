//! # Cash Drawer
//!
//! Denomination counting and end-of-day reconciliation.
//!
//! ## Daily Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Morning           During the day                 Night                 │
//! │  ───────           ──────────────                 ─────                 │
//! │  opening count     cash orders marked paid        closing count        │
//! │  (bills + change)  expenses paid out of drawer    (bills + change)     │
//! │                                                                         │
//! │  expected = opening + cash sales − expenses                            │
//! │  actual   = closing                                                    │
//! │  mismatch = actual − expected   (flagged when |mismatch| > $0.01)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Drawer events are append-only. Corrections are made with further
//! expenses, never by editing a count.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{DrawerEvent, DrawerEventKind};
use crate::{MAX_AMOUNT_CENTS, MAX_DENOMINATION_COUNT};

/// Mismatches up to one cent either way are not flagged.
pub const MISMATCH_TOLERANCE_CENTS: i64 = 1;

// =============================================================================
// Denominations
// =============================================================================

/// Bill counts plus loose change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct DenominationCount {
    pub hundreds: i64,
    pub fifties: i64,
    pub twenties: i64,
    pub tens: i64,
    pub fives: i64,
    pub ones: i64,
    /// Coins, in cents.
    pub change_cents: i64,
}

impl DenominationCount {
    /// `Σ count × face value + change`.
    ///
    /// ```rust
    /// use kleen_core::drawer::DenominationCount;
    ///
    /// let count = DenominationCount { twenties: 10, change_cents: 125, ..Default::default() };
    /// assert_eq!(count.total().cents(), 20_125);
    /// ```
    ///
    /// Saturates instead of overflowing; counts that pass validation never
    /// come near the limit.
    pub fn total(&self) -> Money {
        let bills = [
            (self.hundreds, 100),
            (self.fifties, 50),
            (self.twenties, 20),
            (self.tens, 10),
            (self.fives, 5),
            (self.ones, 1),
        ]
        .iter()
        .fold(0i64, |sum, (count, face)| sum.saturating_add(count.saturating_mul(*face)));
        Money::from_cents(bills.saturating_mul(100).saturating_add(self.change_cents))
    }

    fn validate(&self) -> CoreResult<()> {
        let fields = [
            ("hundreds", self.hundreds, MAX_DENOMINATION_COUNT),
            ("fifties", self.fifties, MAX_DENOMINATION_COUNT),
            ("twenties", self.twenties, MAX_DENOMINATION_COUNT),
            ("tens", self.tens, MAX_DENOMINATION_COUNT),
            ("fives", self.fives, MAX_DENOMINATION_COUNT),
            ("ones", self.ones, MAX_DENOMINATION_COUNT),
            ("change_cents", self.change_cents, MAX_AMOUNT_CENTS),
        ];
        for (field, value, max) in fields {
            if value < 0 {
                return Err(ValidationError::MustNotBeNegative {
                    field: field.to_string(),
                }
                .into());
            }
            if value > max {
                return Err(ValidationError::OutOfRange {
                    field: field.to_string(),
                    min: 0,
                    max,
                }
                .into());
            }
        }
        Ok(())
    }
}

// =============================================================================
// Entries
// =============================================================================

/// A drawer event as submitted by staff.
///
/// ```json
/// { "kind": "opening", "counts": { "hundreds": 1, "twenties": 5 } }
/// { "kind": "expense", "amount_cents": 2000, "description": "Detergent" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DrawerEntry {
    Opening {
        counts: DenominationCount,
        #[serde(default)]
        notes: Option<String>,
    },
    Closing {
        counts: DenominationCount,
        #[serde(default)]
        notes: Option<String>,
    },
    Expense {
        amount_cents: i64,
        description: String,
        #[serde(default)]
        notes: Option<String>,
    },
}

impl DrawerEntry {
    pub fn kind(&self) -> DrawerEventKind {
        match self {
            DrawerEntry::Opening { .. } => DrawerEventKind::Opening,
            DrawerEntry::Closing { .. } => DrawerEventKind::Closing,
            DrawerEntry::Expense { .. } => DrawerEventKind::Expense,
        }
    }

    /// Zero counts for expenses.
    pub fn counts(&self) -> DenominationCount {
        match self {
            DrawerEntry::Opening { counts, .. } | DrawerEntry::Closing { counts, .. } => *counts,
            DrawerEntry::Expense { .. } => DenominationCount::default(),
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            DrawerEntry::Expense { description, .. } => Some(description),
            _ => None,
        }
    }

    pub fn notes(&self) -> Option<&str> {
        match self {
            DrawerEntry::Opening { notes, .. }
            | DrawerEntry::Closing { notes, .. }
            | DrawerEntry::Expense { notes, .. } => notes.as_deref(),
        }
    }

    /// Validates the entry and returns the amount it records.
    pub fn total(&self) -> CoreResult<Money> {
        match self {
            DrawerEntry::Opening { counts, .. } | DrawerEntry::Closing { counts, .. } => {
                counts.validate()?;
                Ok(counts.total())
            }
            DrawerEntry::Expense {
                amount_cents,
                description,
                ..
            } => {
                if *amount_cents <= 0 {
                    return Err(ValidationError::MustBePositive {
                        field: "amount_cents".to_string(),
                    }
                    .into());
                }
                if *amount_cents > MAX_AMOUNT_CENTS {
                    return Err(ValidationError::OutOfRange {
                        field: "amount_cents".to_string(),
                        min: 1,
                        max: MAX_AMOUNT_CENTS,
                    }
                    .into());
                }
                if description.trim().is_empty() {
                    return Err(ValidationError::required("description").into());
                }
                Ok(Money::from_cents(*amount_cents))
            }
        }
    }
}

// =============================================================================
// Reconciliation
// =============================================================================

/// The drawer picture for one business date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DrawerStatus {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub opening: Option<DrawerEvent>,
    pub closing: Option<DrawerEvent>,
    pub expenses: Vec<DrawerEvent>,
    pub cash_sales_cents: i64,
    pub expense_total_cents: i64,
    pub expected_cash_cents: i64,
    /// Closing count, once recorded.
    pub actual_cash_cents: Option<i64>,
    /// `actual − expected`; negative means the drawer is short.
    pub mismatch_cents: Option<i64>,
    pub has_mismatch: bool,
}

/// Reconciles a day's drawer events against its paid cash sales.
///
/// `events` are that date's events in recording order; the first opening and
/// first closing are used.
pub fn reconcile(date: NaiveDate, events: Vec<DrawerEvent>, cash_sales: Money) -> DrawerStatus {
    let mut opening = None;
    let mut closing = None;
    let mut expenses = Vec::new();

    for event in events {
        match event.kind {
            DrawerEventKind::Opening if opening.is_none() => opening = Some(event),
            DrawerEventKind::Closing if closing.is_none() => closing = Some(event),
            DrawerEventKind::Expense => expenses.push(event),
            _ => {}
        }
    }

    let opening_total = opening.as_ref().map(DrawerEvent::total).unwrap_or_default();
    let expense_total: Money = expenses.iter().map(DrawerEvent::total).sum();
    let expected = opening_total + cash_sales - expense_total;

    let actual = closing.as_ref().map(DrawerEvent::total);
    let mismatch = actual.map(|actual| actual - expected);
    let has_mismatch = mismatch
        .map(|m| m.abs().cents() > MISMATCH_TOLERANCE_CENTS)
        .unwrap_or(false);

    DrawerStatus {
        date,
        opening,
        closing,
        expenses,
        cash_sales_cents: cash_sales.cents(),
        expense_total_cents: expense_total.cents(),
        expected_cash_cents: expected.cents(),
        actual_cash_cents: actual.map(|m| m.cents()),
        mismatch_cents: mismatch.map(|m| m.cents()),
        has_mismatch,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
