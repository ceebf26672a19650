//! # kleen-core: Pure Business Logic for Kleen POS
//!
//! This crate is the **heart** of Kleen POS. It holds the order lifecycle and
//! financial reconciliation rules as pure functions with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kleen POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │        POS (staff)  ·  Driver app  ·  Customer portal           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ HTTP / JSON                            │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    apps/server (axum)                           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ kleen-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │  ┌─────────┐ ┌──────────┐ ┌───────────┐ ┌────────┐ ┌─────────┐ │   │
//! │  │  │ pricing │ │lifecycle │ │  drawer   │ │timeclock│ │reporting│ │   │
//! │  │  │ totals  │ │ statuses │ │ reconcile │ │ shifts │ │ windows │ │   │
//! │  │  └─────────┘ └──────────┘ └───────────┘ └────────┘ └─────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    kleen-db (Database Layer)                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Order, Customer, TimeEntry, DrawerEvent, ...)
//! - [`money`] - `Money` (integer cents) and `Percent` (thousandths of a percent)
//! - [`pricing`] - Subtotal / discount / adjustment / tax / total calculator
//! - [`lifecycle`] - Order status state machine and stage stamping
//! - [`drawer`] - Cash drawer denomination math and daily reconciliation
//! - [`timeclock`] - Shift rules and hours worked
//! - [`reporting`] - Report windows, comparisons and rankings
//! - [`validation`] - Input validation and phone canonicalisation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use kleen_core::money::Percent;
//! use kleen_core::pricing::{compute, PricingInput};
//! use kleen_core::types::LineItem;
//!
//! let items = vec![LineItem::new(1, "Wash & Fold", 140, 20.0)];
//! let totals = compute(&PricingInput {
//!     items: &items,
//!     discount: Percent::zero(),
//!     adjustment_cents: 0,
//!     tax_rate: Percent::from_milli(8_875),
//! })
//! .unwrap();
//!
//! assert_eq!(totals.tax_cents, 249);
//! assert_eq!(totals.total_cents, 3049);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod drawer;
pub mod error;
pub mod lifecycle;
pub mod money;
pub mod pricing;
pub mod reporting;
pub mod timeclock;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, Percent};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Prefix of every human-readable order number (`KP00042`).
pub const ORDER_NUMBER_PREFIX: &str = "KP";

/// Digits the order counter is zero-padded to.
pub const ORDER_NUMBER_WIDTH: usize = 5;

/// Sales tax applied when the settings store has no `tax_rate` (8.875%).
pub const DEFAULT_TAX_RATE: Percent = Percent::from_milli(8_875);

/// Maximum line items on a single order.
pub const MAX_ORDER_ITEMS: usize = 100;

/// Largest single amount accepted from a client ($10,000,000): unit prices,
/// the size of an adjustment, loose change and expenses.
pub const MAX_AMOUNT_CENTS: i64 = 1_000_000_000;

/// Largest quantity on one line item.
pub const MAX_ITEM_QUANTITY: f64 = 100_000.0;

/// Largest count of any one bill denomination in a drawer count.
pub const MAX_DENOMINATION_COUNT: i64 = 1_000_000;

/// Formats the n-th order number: `format_order_number(42) == "KP00042"`.
pub fn format_order_number(sequence: i64) -> String {
    format!(
        "{}{:0width$}",
        ORDER_NUMBER_PREFIX,
        sequence,
        width = ORDER_NUMBER_WIDTH
    )
}
