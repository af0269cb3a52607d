//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  0.1 + 0.2 = 0.30000000000000004  ❌                                    │
//! │                                                                         │
//! │  Splitting a charge across lines:                                       │
//! │    $10.00 tax over 3 equal lines = $3.33 each (×3 = $9.99)             │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    1000 cents → 333 + 333 + 334                                         │
//! │    The lost cent is known and assigned explicitly (see allocation)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use folio_core::money::Money;
//!
//! let price = Money::from_cents(2000); // 20.00
//! let line = price.multiply_quantity(3);
//! assert_eq!(line.cents(), 6000);
//! assert_eq!(line.format_in("USD"), "60.00 USD");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// Serializes as a bare integer, so `{"subtotal": 6000}` means 60.00.
///
/// ## Where Money Flows
/// ```text
/// Item.price_cents ──► line subtotal ──► checkout subtotal
///                                             │
///                         PricingPolicy ──────┤ tax, shipping
///                                             ▼
///                                allocation per line item
///                                             │
///                                             ▼
///                                 Order.final_amount_cents
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// ```rust
    /// use folio_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(78, 60).cents(), 7860);
    /// assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    /// ```
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion (truncated toward zero).
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
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

    /// Calculates tax at the given rate, rounding half up to the cent.
    ///
    /// ## Implementation
    /// Integer math in `i128`: `(amount * bps + 5000) / 10000`.
    ///
    /// ```rust
    /// use folio_core::money::Money;
    /// use folio_core::types::TaxRate;
    ///
    /// let subtotal = Money::from_cents(6000);
    /// assert_eq!(subtotal.calculate_tax(TaxRate::from_bps(600)).cents(), 360);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        let tax_cents = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(tax_cents as i64)
    }

    /// Multiplies money by a quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Returns `floor(self * part / whole)`, the proportional share of this
    /// amount that `part` represents out of `whole`.
    ///
    /// A zero (or negative) `whole` yields zero instead of dividing by zero.
    ///
    /// ```rust
    /// use folio_core::money::Money;
    ///
    /// let tax = Money::from_cents(1000);
    /// let share = tax.proportional_share(Money::from_cents(1), Money::from_cents(3));
    /// assert_eq!(share.cents(), 333);
    /// assert!(tax.proportional_share(Money::zero(), Money::zero()).is_zero());
    /// ```
    pub fn proportional_share(&self, part: Money, whole: Money) -> Money {
        if whole.0 <= 0 {
            return Money::zero();
        }
        let share = (self.0 as i128 * part.0 as i128).div_euclid(whole.0 as i128);
        Money::from_cents(share as i64)
    }

    /// Formats the amount with an ISO currency code for receipts and
    /// notification text.
    pub fn format_in(&self, currency: &str) -> String {
        format!("{} {}", self, currency)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain decimal rendering (`78.60`, `-5.50`). Currency is added by
/// [`Money::format_in`].
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
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

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
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
        let money = Money::from_cents(7860);
        assert_eq!(money.cents(), 7860);
        assert_eq!(money.major(), 78);
        assert_eq!(money.minor(), 60);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(7860).to_string(), "78.60");
        assert_eq!(Money::from_cents(500).to_string(), "5.00");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
        assert_eq!(Money::zero().to_string(), "0.00");
    }

    #[test]
    fn test_format_in_currency() {
        assert_eq!(Money::from_cents(12720).format_in("EUR"), "127.20 EUR");
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);

        let total: Money = [a, b, b].iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_tax_rounds_half_up() {
        // 10.00 at 8.25% = 0.825 → 0.83
        let tax = Money::from_cents(1000).calculate_tax(TaxRate::from_bps(825));
        assert_eq!(tax.cents(), 83);

        // 120.00 at 6% = 7.20 exactly
        let tax = Money::from_cents(12000).calculate_tax(TaxRate::from_bps(600));
        assert_eq!(tax.cents(), 720);
    }

    #[test]
    fn test_proportional_share_floors() {
        let aggregate = Money::from_cents(100);
        let whole = Money::from_cents(300);
        let share = aggregate.proportional_share(Money::from_cents(100), whole);
        assert_eq!(share.cents(), 33);
    }

    #[test]
    fn test_proportional_share_of_zero_whole_is_zero() {
        let aggregate = Money::from_cents(1500);
        let share = aggregate.proportional_share(Money::zero(), Money::zero());
        assert!(share.is_zero());
    }

    #[test]
    fn test_sign_checks() {
        assert!(Money::zero().is_zero());
        assert!(Money::from_cents(1).is_positive());
        assert!(Money::from_cents(-1).is_negative());
    }
}
