//! # Money Module
//!
//! The `Money` type: every monetary amount in the back office, held as an
//! integer count of hundredths.
//!
//! ## Storage Convention
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  AMOUNT              STORED AS            COLUMN                        │
//! │  ──────────────────  ───────────────────  ────────────────────────────  │
//! │  Sale total $100.00  10000                sales.total_cents             │
//! │  Item price $2.99    299                  sale_items.price_cents        │
//! │  Coupon 10% off      1000 (basis points)  coupons.discount_value        │
//! │  Coupon $5 off       500  (cents)         coupons.discount_value        │
//! │                                                                         │
//! │  No floats anywhere between the request and the database row.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use meridian_core::money::Money;
//!
//! let subtotal = Money::from_cents(2_500); // $25.00
//! let off = subtotal.percentage_of(1_000); // 10% => $2.50
//! assert_eq!((subtotal - off).cents(), 2_250);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use ts_rs::TS;

use crate::BPS_PER_WHOLE;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in hundredths of the currency unit.
///
/// Signed so that differences (e.g. `total - discount`) never wrap, even
/// though every stored amount in this domain is non-negative.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Whole-unit portion, truncated toward zero.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Cents portion, always 0-99.
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
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// The share of this amount given by `bps` basis points (1000 = 10%).
    ///
    /// Rounds half up: `(amount * bps + 5000) / 10000`, computed in i128.
    /// A share that does not fit in i64 saturates.
    ///
    /// ```rust
    /// use meridian_core::money::Money;
    ///
    /// // 8.25% of $10.00 = $0.825 -> $0.83
    /// assert_eq!(Money::from_cents(1000).percentage_of(825).cents(), 83);
    /// ```
    pub fn percentage_of(&self, bps: i64) -> Money {
        let whole = BPS_PER_WHOLE as i128;
        let share = (self.0 as i128 * bps as i128 + whole / 2) / whole;
        let cents = i64::try_from(share).unwrap_or(if share < 0 { i64::MIN } else { i64::MAX });
        Money::from_cents(cents)
    }

    /// Limits the value to the range `0..=ceiling`.
    pub fn clamp_to(self, ceiling: Money) -> Money {
        Money(self.0.clamp(0, ceiling.0.max(0)))
    }

    /// Line amount for `qty` units at this price, saturating at the i64 bounds.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-oriented rendering ("$10.99"); display formatting belongs to the UI.
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

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
