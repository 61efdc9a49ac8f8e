//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Mils?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THREE-DECIMAL CURRENCY                                                 │
//! │                                                                         │
//! │  The house currency is split into 1000 minor units, so a menu price    │
//! │  like 2.500 or 1.250 needs three decimals of EXACT precision.          │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.125 × 3 = 0.37499999999999994  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Mils (thousandths)                               │
//! │    125 mils × 3 = 375 mils → "0.375"  ✅                                │
//! │                                                                         │
//! │  Rounding only ever happens in ONE place: percentage discounts.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use bistro_core::money::Money;
//!
//! let price = Money::from_mils(2500); // 2.500
//! let line = price * 2;               // 5.000
//! assert_eq!(line.to_string(), "5.000");
//!
//! let parsed: Money = "1.25".parse().unwrap();
//! assert_eq!(parsed.mils(), 1250);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;

/// Minor units per major unit (three decimal places).
pub const MILS_PER_UNIT: i64 = 1000;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in thousandths of the currency unit.
///
/// ## Design Decisions
/// - **i64 (signed)**: differences like `subtotal - discount` may go negative
///   before being clamped
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Serialized as the raw mil count**: the UI formats for display
///
/// ## Where Money Flows
/// ```text
/// CatalogItem.price ──► OrderLine.unit_price ──┐
/// Addon.price ──────► OrderLine.addon_surcharge ┴─► OrderLine.line_total
///                                                        │
///                          Σ line_total ◄────────────────┘
///                               │
///                     Order.subtotal ─► − discount ─► + delivery fee
///                                                        │
///                                               Order.grand_total
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from mils (the smallest currency unit).
    #[inline]
    pub const fn from_mils(mils: i64) -> Self {
        Money(mils)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// ## Example
    /// ```rust
    /// use bistro_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(2, 500).mils(), 2500);
    /// assert_eq!(Money::from_major_minor(-1, 250).mils(), -1250);
    /// ```
    ///
    /// ## Note
    /// For negative amounts, only the major unit should be negative.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * MILS_PER_UNIT - minor)
        } else {
            Money(major * MILS_PER_UNIT + minor)
        }
    }

    /// Returns the value in mils.
    #[inline]
    pub const fn mils(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion (truncated toward zero).
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / MILS_PER_UNIT
    }

    /// Returns the minor unit portion (always 0-999).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % MILS_PER_UNIT).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Clamps negative values to zero.
    ///
    /// Used for `max(0, subtotal - discount)` when a fixed-amount promo is
    /// larger than the order.
    #[inline]
    pub const fn non_negative(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            Money(self.0)
        }
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use bistro_core::money::Money;
    ///
    /// let unit_price = Money::from_mils(1250);
    /// assert_eq!(unit_price.multiply_quantity(3).mils(), 3750);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Returns `rate` of this amount, rounded half-up to the nearest mil.
    ///
    /// ## Implementation
    /// Integer math in i128: `(amount * bps + 5000) / 10000`.
    /// The +5000 provides rounding (5000/10000 = 0.5).
    ///
    /// ## Example
    /// ```rust
    /// use bistro_core::money::{Money, Percentage};
    ///
    /// let subtotal = Money::from_mils(6250);     // 6.250
    /// let ten = Percentage::from_percent(10);    // 10%
    /// assert_eq!(subtotal.percentage(ten).mils(), 625); // 0.625
    /// ```
    pub fn percentage(&self, rate: Percentage) -> Money {
        let part = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_mils(part as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Renders exactly three decimals, e.g. `6.250` or `-1.250`.
///
/// ## Note
/// No currency symbol: the terminal UI owns localization.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:03}", sign, self.major().abs(), self.minor())
    }
}

/// Parses a decimal string with at most three fractional digits.
///
/// Accepts `"2"`, `"2.5"`, `"2.500"`, `"-0.125"`. Rejects anything that
/// would lose precision (`"1.2345"`).
impl FromStr for Money {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "amount".to_string(),
            reason: reason.to_string(),
        };

        let s = s.trim();
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let (major_str, minor_str) = match digits.split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (digits, ""),
        };

        if major_str.is_empty() && minor_str.is_empty() {
            return Err(invalid("empty amount"));
        }
        if minor_str.len() > 3 {
            return Err(invalid("at most three decimal places"));
        }
        if !major_str.chars().chain(minor_str.chars()).all(|c| c.is_ascii_digit()) {
            return Err(invalid("must be a decimal number"));
        }

        let major: i64 = if major_str.is_empty() {
            0
        } else {
            major_str.parse().map_err(|_| invalid("amount too large"))?
        };
        let minor: i64 = if minor_str.is_empty() {
            0
        } else {
            // "5" -> 500, "25" -> 250, "125" -> 125
            format!("{:0<3}", minor_str)
                .parse()
                .map_err(|_| invalid("must be a decimal number"))?
        };

        let mils = major
            .checked_mul(MILS_PER_UNIT)
            .and_then(|m| m.checked_add(minor))
            .ok_or_else(|| invalid("amount too large"))?;

        Ok(Money(if negative { -mils } else { mils }))
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

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Percentage
// =============================================================================

/// A rate in basis points (1 bps = 0.01%).
///
/// 1000 bps = 10%. Promo percentages are stored this way so the discount
/// math never touches floating point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Percentage(u32);

impl Percentage {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Percentage(bps)
    }

    /// Whole percent, e.g. `from_percent(10)` = 10%.
    #[inline]
    pub const fn from_percent(percent: u32) -> Self {
        Percentage(percent * 100)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// For display only.
    #[inline]
    pub fn as_percent(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_mils() {
        let money = Money::from_mils(2500);
        assert_eq!(money.mils(), 2500);
        assert_eq!(money.major(), 2);
        assert_eq!(money.minor(), 500);
    }

    #[test]
    fn test_from_major_minor() {
        assert_eq!(Money::from_major_minor(6, 250).mils(), 6250);
        assert_eq!(Money::from_major_minor(-5, 500).mils(), -5500);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_mils(6250).to_string(), "6.250");
        assert_eq!(Money::from_mils(625).to_string(), "0.625");
        assert_eq!(Money::from_mils(-1250).to_string(), "-1.250");
        assert_eq!(Money::zero().to_string(), "0.000");
        assert_eq!(Money::from_mils(7).to_string(), "0.007");
    }

    #[test]
    fn test_parse() {
        assert_eq!("2.500".parse::<Money>().unwrap().mils(), 2500);
        assert_eq!("2.5".parse::<Money>().unwrap().mils(), 2500);
        assert_eq!("1.25".parse::<Money>().unwrap().mils(), 1250);
        assert_eq!("3".parse::<Money>().unwrap().mils(), 3000);
        assert_eq!(".125".parse::<Money>().unwrap().mils(), 125);
        assert_eq!("-0.125".parse::<Money>().unwrap().mils(), -125);

        assert!("".parse::<Money>().is_err());
        assert!("1.2345".parse::<Money>().is_err());
        assert!("abc".parse::<Money>().is_err());
        assert!("1.2.3".parse::<Money>().is_err());
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_mils(2500);
        let b = Money::from_mils(1250);

        assert_eq!((a + b).mils(), 3750);
        assert_eq!((a - b).mils(), 1250);
        assert_eq!((a * 2).mils(), 5000);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.mils(), 5000);
    }

    #[test]
    fn test_non_negative() {
        assert_eq!(Money::from_mils(-300).non_negative(), Money::zero());
        assert_eq!(Money::from_mils(300).non_negative().mils(), 300);
    }

    #[test]
    fn test_percentage_exact() {
        let subtotal = Money::from_mils(6250);
        assert_eq!(subtotal.percentage(Percentage::from_percent(10)).mils(), 625);
    }

    #[test]
    fn test_percentage_rounds_half_up() {
        // 1.005 × 50% = 0.5025 → 0.503
        let amount = Money::from_mils(1005);
        assert_eq!(amount.percentage(Percentage::from_bps(5000)).mils(), 503);

        // 0.333 × 15% = 0.04995 → 0.050
        let amount = Money::from_mils(333);
        assert_eq!(amount.percentage(Percentage::from_percent(15)).mils(), 50);
    }

    #[test]
    fn test_percentage_conversions() {
        let rate = Percentage::from_percent(12);
        assert_eq!(rate.bps(), 1200);
        assert!((rate.as_percent() - 12.0).abs() < f64::EPSILON);
    }
}
