//! # Order Pricing
//!
//! Turns line items, a discount, a manual adjustment and a tax rate into the
//! stored order totals.
//!
//! ## Calculation Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  subtotal   = Σ round(unit_price × quantity)                           │
//! │  discount   = round(subtotal × discount%)                              │
//! │  taxable    = subtotal − discount + adjustment     (may be negative)   │
//! │  tax        = round(taxable × tax%)                                    │
//! │  total      = max(0, taxable + tax)                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every rounding step is half away from zero to the cent. The calculator is
//! pure: callers resolve the current tax rate (settings store, default
//! [`DEFAULT_TAX_RATE`](crate::DEFAULT_TAX_RATE)) before calling.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreResult, ValidationError};
use crate::money::{Money, Percent};
use crate::types::{LineItem, Order};
use crate::{MAX_AMOUNT_CENTS, MAX_ITEM_QUANTITY, MAX_ORDER_ITEMS};

/// Inputs to [`compute`].
#[derive(Debug, Clone, Copy)]
pub struct PricingInput<'a> {
    pub items: &'a [LineItem],
    pub discount: Percent,
    pub adjustment_cents: i64,
    pub tax_rate: Percent,
}

/// Result of [`compute`], in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Totals {
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
}

/// Computes order totals.
///
/// ## Errors
/// - `ValidationError::InvalidFormat` for a non-finite quantity
/// - `ValidationError::MustNotBeNegative` for a negative quantity or unit price
/// - `ValidationError::OutOfRange` for a discount or tax rate outside 0–100%,
///   or a price, quantity or adjustment beyond the accepted limits
/// - `ValidationError::TooLong` for more than [`MAX_ORDER_ITEMS`] lines
///
/// ## Example
/// ```rust
/// use kleen_core::money::Percent;
/// use kleen_core::pricing::{compute, PricingInput};
/// use kleen_core::types::LineItem;
///
/// let items = vec![LineItem::new(1, "Wash & Fold", 1000, 1.0)];
/// let totals = compute(&PricingInput {
///     items: &items,
///     discount: Percent::zero(),
///     adjustment_cents: -10_000,
///     tax_rate: Percent::from_milli(8_875),
/// })
/// .unwrap();
///
/// // A large credit can never push the total below zero.
/// assert_eq!(totals.total_cents, 0);
/// ```
pub fn compute(input: &PricingInput<'_>) -> CoreResult<Totals> {
    validate_input(input)?;

    let subtotal: Money = input.items.iter().map(LineItem::line_total).sum();
    let discount = subtotal.percent_of(input.discount);
    let taxable = subtotal - discount + Money::from_cents(input.adjustment_cents);
    let tax = taxable.percent_of(input.tax_rate);
    let total = (taxable + tax).non_negative();

    Ok(Totals {
        subtotal_cents: subtotal.cents(),
        discount_cents: discount.cents(),
        tax_cents: tax.cents(),
        total_cents: total.cents(),
    })
}

fn validate_input(input: &PricingInput<'_>) -> CoreResult<()> {
    if input.items.len() > MAX_ORDER_ITEMS {
        return Err(ValidationError::TooLong {
            field: "items".to_string(),
            max: MAX_ORDER_ITEMS,
        }
        .into());
    }

    for item in input.items {
        if !item.quantity.is_finite() {
            return Err(ValidationError::invalid_format("quantity", "must be a finite number").into());
        }
        if item.quantity < 0.0 {
            return Err(ValidationError::MustNotBeNegative {
                field: "quantity".to_string(),
            }
            .into());
        }
        if item.quantity > MAX_ITEM_QUANTITY {
            return Err(ValidationError::OutOfRange {
                field: "quantity".to_string(),
                min: 0,
                max: MAX_ITEM_QUANTITY as i64,
            }
            .into());
        }
        if item.unit_price_cents < 0 {
            return Err(ValidationError::MustNotBeNegative {
                field: "unit_price_cents".to_string(),
            }
            .into());
        }
        if item.unit_price_cents > MAX_AMOUNT_CENTS {
            return Err(ValidationError::OutOfRange {
                field: "unit_price_cents".to_string(),
                min: 0,
                max: MAX_AMOUNT_CENTS,
            }
            .into());
        }
    }

    if !(-MAX_AMOUNT_CENTS..=MAX_AMOUNT_CENTS).contains(&input.adjustment_cents) {
        return Err(ValidationError::OutOfRange {
            field: "adjustment_cents".to_string(),
            min: -MAX_AMOUNT_CENTS,
            max: MAX_AMOUNT_CENTS,
        }
        .into());
    }

    if input.discount < Percent::zero() || input.discount > Percent::hundred() {
        return Err(ValidationError::OutOfRange {
            field: "discount_percent".to_string(),
            min: 0,
            max: 100,
        }
        .into());
    }

    if input.tax_rate < Percent::zero() {
        return Err(ValidationError::MustNotBeNegative {
            field: "tax_rate".to_string(),
        }
        .into());
    }
    if input.tax_rate > Percent::hundred() {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 100,
        }
        .into());
    }

    Ok(())
}

/// Recomputes an order's totals from its current items, discount and
/// adjustment at `tax_rate`, writing the result back onto the order.
pub fn reprice(order: &mut Order, tax_rate: Percent) -> CoreResult<()> {
    let totals = compute(&PricingInput {
        items: &order.items,
        discount: order.discount_percent,
        adjustment_cents: order.adjustment_cents,
        tax_rate,
    })?;

    order.subtotal_cents = totals.subtotal_cents;
    order.discount_cents = totals.discount_cents;
    order.tax_rate = tax_rate;
    order.tax_cents = totals.tax_cents;
    order.total_cents = totals.total_cents;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::DEFAULT_TAX_RATE;

    fn run(items: &[LineItem], discount: f64, adjustment_cents: i64) -> CoreResult<Totals> {
        compute(&PricingInput {
            items,
            discount: Percent::from_percentage(discount),
            adjustment_cents,
            tax_rate: DEFAULT_TAX_RATE,
        })
    }

    #[test]
    fn test_reference_order() {
        // 20 lb at $1.40/lb, 8.875% tax: 2.485 rounds to 2.49
        let items = vec![LineItem::new(1, "Wash & Fold", 140, 20.0)];
        let totals = run(&items, 0.0, 0).unwrap();

        assert_eq!(totals.subtotal_cents, 2800);
        assert_eq!(totals.discount_cents, 0);
        assert_eq!(totals.tax_cents, 249);
        assert_eq!(totals.total_cents, 3049);
    }

    #[test]
    fn test_total_never_negative() {
        let items = vec![LineItem::new(1, "Wash & Fold", 1000, 1.0)];
        let totals = run(&items, 0.0, -10_000).unwrap();

        assert_eq!(totals.subtotal_cents, 1000);
        assert_eq!(totals.total_cents, 0);
    }

    #[test]
    fn test_deterministic() {
        let items = vec![
            LineItem::new(1, "Wash & Fold", 140, 13.7),
            LineItem::new(7, "Shirt Press", 395, 4.0),
        ];
        let a = run(&items, 12.5, 250).unwrap();
        let b = run(&items, 12.5, 250).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_discount_then_adjustment_then_tax() {
        // subtotal 10000, 10% off → 9000, +500 adjustment → 9500
        // tax 9500 × 8.875% = 843.125 → 843
        let items = vec![LineItem::new(3, "Comforter", 5000, 2.0)];
        let totals = run(&items, 10.0, 500).unwrap();

        assert_eq!(totals.subtotal_cents, 10_000);
        assert_eq!(totals.discount_cents, 1000);
        assert_eq!(totals.tax_cents, 843);
        assert_eq!(totals.total_cents, 10_343);
    }

    #[test]
    fn test_empty_order_is_zero() {
        let totals = run(&[], 0.0, 0).unwrap();
        assert_eq!(totals.total_cents, 0);
        assert_eq!(totals.tax_cents, 0);
    }

    #[test]
    fn test_rejects_negative_quantity() {
        let items = vec![LineItem::new(1, "Wash & Fold", 140, -1.0)];
        let err = run(&items, 0.0, 0).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::MustNotBeNegative { .. })
        ));
    }

    #[test]
    fn test_rejects_non_finite_quantity() {
        let items = vec![LineItem::new(1, "Wash & Fold", 140, f64::NAN)];
        assert!(run(&items, 0.0, 0).is_err());

        let items = vec![LineItem::new(1, "Wash & Fold", 140, f64::INFINITY)];
        assert!(run(&items, 0.0, 0).is_err());
    }

    #[test]
    fn test_rejects_amounts_beyond_limits() {
        let items = vec![LineItem::new(1, "Wash & Fold", 140, 1.0)];
        for adjustment in [i64::MAX, i64::MIN, MAX_AMOUNT_CENTS + 1] {
            let err = run(&items, 0.0, adjustment).unwrap_err();
            assert!(matches!(
                err,
                CoreError::Validation(ValidationError::OutOfRange { .. })
            ));
        }
        assert!(run(&items, 0.0, -MAX_AMOUNT_CENTS).is_ok());

        let pricey = vec![LineItem::new(1, "Wash & Fold", i64::MAX, 1.0)];
        assert!(run(&pricey, 0.0, 0).is_err());

        let heavy = vec![LineItem::new(1, "Wash & Fold", 140, 1e300)];
        assert!(run(&heavy, 0.0, 0).is_err());

        // Every line at the limits still totals without overflow.
        let maxed = vec![LineItem::new(1, "Wash & Fold", MAX_AMOUNT_CENTS, MAX_ITEM_QUANTITY); MAX_ORDER_ITEMS];
        let totals = run(&maxed, 0.0, MAX_AMOUNT_CENTS).unwrap();
        assert!(totals.total_cents > 0);
    }

    #[test]
    fn test_rejects_discount_out_of_range() {
        let items = vec![LineItem::new(1, "Wash & Fold", 140, 1.0)];
        assert!(run(&items, 100.5, 0).is_err());
        assert!(run(&items, -1.0, 0).is_err());
        assert!(run(&items, 100.0, 0).is_ok());
    }

    #[test]
    fn test_full_discount_leaves_adjustment_taxed() {
        let items = vec![LineItem::new(1, "Wash & Fold", 140, 10.0)];
        let totals = run(&items, 100.0, 1000).unwrap();
        assert_eq!(totals.discount_cents, 1400);
        assert_eq!(totals.tax_cents, 89);
        assert_eq!(totals.total_cents, 1089);
    }
}
