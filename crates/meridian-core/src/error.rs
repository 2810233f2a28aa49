//! # Error Types
//!
//! Domain-specific error types for meridian-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  meridian-core errors (this file)                                      │
//! │  ├── ValidationError  - Input validation failures (carries the field)  │
//! │  └── CouponRejection  - Why a coupon cannot be redeemed right now      │
//! │                                                                         │
//! │  meridian-db errors (separate crate)                                   │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  backoffice errors (app)                                               │
//! │  └── ServiceError     - What callers see (kind + message + details)    │
//! │                                                                         │
//! │  Flow: ValidationError / DbError → ServiceError → Caller               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

// =============================================================================
// Coupon Rejection
// =============================================================================

/// The reason a coupon failed redemption validation.
///
/// ## Check Order
/// ```text
/// is_active?  ──no──► NotActive
///     │
/// now >= start? ──no──► NotYetValid
///     │
/// now <= end?   ──no──► Expired
///     │
/// used < max?   ──no──► ExhaustedUses
///     │
///     ▼
///  redeemable
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, Error)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CouponRejection {
    #[error("Coupon is not active")]
    NotActive,

    #[error("Coupon is not yet valid")]
    NotYetValid,

    #[error("Coupon has expired")]
    Expired,

    #[error("Coupon has reached maximum usage limit")]
    ExhaustedUses,
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Every variant names the offending field so the caller can point at it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format (e.g., invalid UUID, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// End of a date range precedes its start.
    #[error("{field} must not be before the start of the range")]
    WindowInverted { field: String },

    /// Lookup matched more than one record; the field narrows it down.
    #[error("{field} is required: {reason}")]
    Ambiguous { field: String, reason: String },

    /// The value no longer fits the stored record it was checked against.
    #[error("{field} is inconsistent with the stored record")]
    Inconsistent { field: String },
}

impl ValidationError {
    /// The field the error refers to.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::Negative { field }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::NotAllowed { field, .. }
            | ValidationError::WindowInverted { field }
            | ValidationError::Ambiguous { field, .. }
            | ValidationError::Inconsistent { field } => field,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_messages() {
        assert_eq!(CouponRejection::Expired.to_string(), "Coupon has expired");
        assert_eq!(
            CouponRejection::ExhaustedUses.to_string(),
            "Coupon has reached maximum usage limit"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "code".to_string(),
        };
        assert_eq!(err.to_string(), "code is required");

        let err = ValidationError::WindowInverted {
            field: "end_date".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "end_date must not be before the start of the range"
        );
    }

    #[test]
    fn test_validation_error_field() {
        let err = ValidationError::NotAllowed {
            field: "status".to_string(),
            allowed: vec!["paid".to_string()],
        };
        assert_eq!(err.field(), "status");
    }

    #[test]
    fn test_rejection_serializes_snake_case() {
        let json = serde_json::to_string(&CouponRejection::NotYetValid).unwrap();
        assert_eq!(json, "\"not_yet_valid\"");
    }
}
