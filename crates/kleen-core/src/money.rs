//! # Money Module
//!
//! Provides [`Money`] for monetary values and [`Percent`] for rates
//! (discounts, sales tax).
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents + Integer Rates                            │
//! │    Money   = i64 cents               $30.49  → 3049                    │
//! │    Percent = i64 thousandths of %    8.875%  → 8875                    │
//! │                                                                         │
//! │  amount × rate is computed in i128 and rounded once, half away from    │
//! │  zero, to the cent.                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use kleen_core::money::{Money, Percent};
//!
//! let subtotal = Money::from_cents(2800);
//! let tax = subtotal.percent_of(Percent::from_percentage(8.875));
//! assert_eq!(tax.cents(), 249); // 248.5 rounds away from zero
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Rounding
// =============================================================================

/// Divides `num / den` rounding half away from zero (`den` must be positive).
///
/// Integer division in Rust truncates toward zero, so pushing the numerator
/// half a denominator away from zero before dividing rounds the magnitude.
#[inline]
fn div_round_half_away(num: i128, den: i128) -> i128 {
    if num >= 0 {
        (num + den / 2) / den
    } else {
        (num - den / 2) / den
    }
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in cents.
///
/// Signed: adjustments and intermediate taxable amounts may be negative even
/// though a stored order total never is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from dollars and cents.
    ///
    /// For negative amounts only the major unit carries the sign:
    /// `from_major_minor(-5, 50)` is -$5.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the dollar portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the cents portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Clamps negative values to zero.
    ///
    /// ```rust
    /// use kleen_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(-9799).non_negative(), Money::zero());
    /// assert_eq!(Money::from_cents(120).non_negative().cents(), 120);
    /// ```
    #[inline]
    pub const fn non_negative(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            Money(self.0)
        }
    }

    /// Multiplies a unit price by a (possibly fractional) quantity.
    ///
    /// Laundry is sold by the pound, so quantities like `12.5` lb are normal.
    /// The product is rounded half away from zero to the cent. Callers are
    /// expected to have validated `quantity` as finite and non-negative.
    ///
    /// ```rust
    /// use kleen_core::money::Money;
    ///
    /// let per_lb = Money::from_cents(140);
    /// assert_eq!(per_lb.times_quantity(20.0).cents(), 2800);
    /// assert_eq!(Money::from_cents(595).times_quantity(1.5).cents(), 893);
    /// ```
    pub fn times_quantity(&self, quantity: f64) -> Money {
        Money((self.0 as f64 * quantity).round() as i64)
    }

    /// Returns `rate` of this amount, rounded half away from zero.
    ///
    /// ## Example
    /// ```text
    /// 2800¢ × 8.875% = 248.5¢ ──► 249¢
    /// -9000¢ × 8.875% = -798.75¢ ──► -799¢
    /// ```
    pub fn percent_of(&self, rate: Percent) -> Money {
        let scaled = self.0 as i128 * rate.milli() as i128;
        Money(div_round_half_away(scaled, Percent::SCALE as i128) as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-friendly rendering (`$10.99`, `-$5.50`). Frontends format for display.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Percent
// =============================================================================

/// A percentage stored in thousandths of a percent.
///
/// ## Why Thousandths?
/// New York City sales tax is 8.875%. Basis points (hundredths) cannot hold
/// it exactly; thousandths can: `8.875% → 8875`, `100% → 100_000`.
///
/// ## Wire Format
/// Serialized as the plain percentage number (`8.875`) so clients send and
/// receive the value they display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
pub struct Percent(i64);

impl Percent {
    /// Thousandths of a percent in one whole (100%).
    pub const SCALE: i64 = 100_000;

    /// Creates a rate from thousandths of a percent (8875 = 8.875%).
    #[inline]
    pub const fn from_milli(milli: i64) -> Self {
        Percent(milli)
    }

    /// Creates a rate from a percentage number, rounded to the nearest
    /// thousandth.
    pub fn from_percentage(pct: f64) -> Self {
        Percent((pct * 1000.0).round() as i64)
    }

    #[inline]
    pub const fn zero() -> Self {
        Percent(0)
    }

    #[inline]
    pub const fn hundred() -> Self {
        Percent(Self::SCALE)
    }

    /// Returns the rate in thousandths of a percent.
    #[inline]
    pub const fn milli(&self) -> i64 {
        self.0
    }

    /// Returns the rate as a percentage number (for display and JSON).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 1000.0
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for Percent {
    fn default() -> Self {
        Percent::zero()
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.percentage())
    }
}

impl Serialize for Percent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.percentage())
    }
}

impl<'de> Deserialize<'de> for Percent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let pct = f64::deserialize(deserializer)?;
        if !pct.is_finite() {
            return Err(serde::de::Error::custom("percentage must be a finite number"));
        }
        Ok(Percent::from_percentage(pct))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.dollars(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(3049).to_string(), "$30.49");
        assert_eq!(Money::from_cents(-550).to_string(), "-$5.50");
        assert_eq!(Money::zero().to_string(), "$0.00");
    }

    #[test]
    fn test_percent_of_rounds_half_away_from_zero() {
        let rate = Percent::from_milli(8_875);
        assert_eq!(Money::from_cents(2800).percent_of(rate).cents(), 249);
        assert_eq!(Money::from_cents(-9000).percent_of(rate).cents(), -799);
        assert_eq!(Money::from_cents(1000).percent_of(rate).cents(), 89);
    }

    #[test]
    fn test_percent_of_whole_and_zero() {
        let amount = Money::from_cents(12_345);
        assert_eq!(amount.percent_of(Percent::hundred()), amount);
        assert_eq!(amount.percent_of(Percent::zero()), Money::zero());
    }

    #[test]
    fn test_times_quantity_fractional() {
        assert_eq!(Money::from_cents(140).times_quantity(12.5).cents(), 1750);
        assert_eq!(Money::from_cents(333).times_quantity(0.5).cents(), 167);
        assert_eq!(Money::from_cents(999).times_quantity(0.0), Money::zero());
    }

    #[test]
    fn test_sum() {
        let total: Money = [100, 250, -50].iter().map(|c| Money::from_cents(*c)).sum();
        assert_eq!(total.cents(), 300);
    }

    #[test]
    fn test_percent_from_percentage() {
        assert_eq!(Percent::from_percentage(8.875).milli(), 8_875);
        assert_eq!(Percent::from_percentage(10.0).milli(), 10_000);
        assert!((Percent::from_milli(8_875).percentage() - 8.875).abs() < 1e-9);
    }

    #[test]
    fn test_percent_json_is_plain_number() {
        let json = serde_json::to_string(&Percent::from_milli(8_875)).unwrap();
        assert_eq!(json, "8.875");

        let parsed: Percent = serde_json::from_str("15").unwrap();
        assert_eq!(parsed.milli(), 15_000);
    }
}
