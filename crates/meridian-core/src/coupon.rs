//! # Coupon Rules
//!
//! Redemption eligibility and update consistency for coupons.
//!
//! ## Redemption Timeline
//! ```text
//!            start_date                       end_date
//!                │                                │
//!   NotYetValid  │        redeemable window       │  Expired
//!  ──────────────┼────────────────────────────────┼──────────────►  now
//!                │  (inclusive at both ends)      │
//!
//!  and also: is_active == true, used_count < max_uses
//! ```
//!
//! These functions only decide. Counting a redemption is a single atomic
//! store update done by the repository.

use chrono::{DateTime, Utc};

use crate::error::{CouponRejection, ValidationError};
use crate::types::{Coupon, CouponChanges};
use crate::validation::{validate_date_window, validate_discount_value, ValidationResult};

/// Decides whether `coupon` may be redeemed at `now`.
///
/// Checks run in a fixed order and the first failure is reported, so an
/// inactive coupon that is also expired reports `NotActive`.
pub fn check_redeemable(coupon: &Coupon, now: DateTime<Utc>) -> Result<(), CouponRejection> {
    if !coupon.is_active {
        return Err(CouponRejection::NotActive);
    }
    if now < coupon.start_date {
        return Err(CouponRejection::NotYetValid);
    }
    if now > coupon.end_date {
        return Err(CouponRejection::Expired);
    }
    if coupon.remaining_uses() == 0 {
        return Err(CouponRejection::ExhaustedUses);
    }
    Ok(())
}

/// The `(start_date, end_date)` the coupon would have after `changes`.
pub fn effective_window(
    coupon: &Coupon,
    changes: &CouponChanges,
) -> (DateTime<Utc>, DateTime<Utc>) {
    (
        changes.start_date.unwrap_or(coupon.start_date),
        changes.end_date.unwrap_or(coupon.end_date),
    )
}

/// Checks `changes` against the stored record: the merged window must stay
/// ordered, a percentage stays within 100%, and `max_uses` cannot drop below
/// redemptions already counted.
pub fn validate_changes(coupon: &Coupon, changes: &CouponChanges) -> ValidationResult<()> {
    let (start, end) = effective_window(coupon, changes);
    validate_date_window(start, end)?;

    if changes.discount_type.is_some() || changes.discount_value.is_some() {
        validate_discount_value(
            changes.discount_type.unwrap_or(coupon.discount_type),
            changes.discount_value.unwrap_or(coupon.discount_value),
        )?;
    }

    if let Some(max_uses) = changes.max_uses {
        if max_uses < coupon.used_count {
            return Err(ValidationError::OutOfRange {
                field: "max_uses".to_string(),
                min: coupon.used_count.max(1),
                max: i64::MAX,
            });
        }
    }
    Ok(())
}
