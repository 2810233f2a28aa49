//! # Service Error Type
//!
//! What callers of the coupon and sale services see when an operation fails.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Error Flow in the Back Office                       │
//! │                                                                         │
//! │  ValidationError (core) ─────────────────────────► Validation    400    │
//! │  CouponRejection (core) ─────────────────────────► CouponInvalid 422    │
//! │  DbError::NotFound ──────────────────────────────► NotFound      404    │
//! │  DbError::UniqueViolation ───────────────────────► Conflict      409    │
//! │  DbError::ForeignKeyViolation ───────────────────► NotFound      404    │
//! │  DbError::CheckViolation ── warn! ───────────────► Validation    400    │
//! │  anything else / deadline exceeded ── error! ───► Store         500    │
//! │                                                                         │
//! │  ServiceError::body() → ErrorBody { status, code, message, details }    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Store failures keep their detail in the log only; the caller gets the
//! name of the operation that failed.

use meridian_core::{CouponRejection, ValidationError};
use meridian_db::DbError;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, warn};

/// Service operation failures.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Input rejected before reaching the store.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A uniqueness rule was violated.
    #[error("{message}")]
    Conflict { field: String, message: String },

    /// The coupon exists but cannot be redeemed now.
    #[error("Coupon {code} cannot be redeemed: {reason}")]
    CouponInvalid {
        code: String,
        reason: CouponRejection,
    },

    /// The store failed or did not answer in time. Detail is in the log.
    #[error("Store operation failed: {operation}")]
    Store { operation: &'static str },
}

/// Convenience type alias for service results.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    NotFound,
    Conflict,
    CouponInvalid,
    StoreError,
}

/// Response envelope for a failed operation.
///
/// ```json
/// {
///   "status": 422,
///   "code": "COUPON_INVALID",
///   "message": "Coupon SUMMER10 cannot be redeemed: Coupon has expired",
///   "details": { "code": "SUMMER10", "reason": "expired" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub status: u16,
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ServiceError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        ServiceError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Maps a store failure, logging the ones the caller will not see.
    pub fn from_store(operation: &'static str, id: &str, err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ServiceError::NotFound { entity, id },
            DbError::UniqueViolation { field, value } => ServiceError::Conflict {
                message: format!("{field} '{value}' already exists"),
                field,
            },
            DbError::ForeignKeyViolation { message } => {
                error!(operation, id, %message, "Referenced record missing");
                ServiceError::not_found("Referenced record", id)
            }
            DbError::CheckViolation { field, message } => {
                warn!(operation, id, %message, "Write rejected by a stored constraint");
                ServiceError::Validation(ValidationError::Inconsistent { field })
            }
            other => {
                error!(operation, id, error = %other, "Store operation failed");
                ServiceError::Store { operation }
            }
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            ServiceError::Validation(_) => 400,
            ServiceError::NotFound { .. } => 404,
            ServiceError::Conflict { .. } => 409,
            ServiceError::CouponInvalid { .. } => 422,
            ServiceError::Store { .. } => 500,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ServiceError::Validation(_) => ErrorCode::ValidationError,
            ServiceError::NotFound { .. } => ErrorCode::NotFound,
            ServiceError::Conflict { .. } => ErrorCode::Conflict,
            ServiceError::CouponInvalid { .. } => ErrorCode::CouponInvalid,
            ServiceError::Store { .. } => ErrorCode::StoreError,
        }
    }

    /// The rejection reason when this is a coupon redemption failure.
    pub fn rejection(&self) -> Option<CouponRejection> {
        match self {
            ServiceError::CouponInvalid { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    pub fn body(&self) -> ErrorBody {
        let details = match self {
            ServiceError::Validation(e) => Some(json!({ "field": e.field() })),
            ServiceError::NotFound { entity, id } => Some(json!({ "entity": entity, "id": id })),
            ServiceError::Conflict { field, .. } => Some(json!({ "field": field })),
            ServiceError::CouponInvalid { code, reason } => {
                Some(json!({ "code": code, "reason": reason }))
            }
            ServiceError::Store { .. } => None,
        };

        ErrorBody {
            status: self.status(),
            code: self.code(),
            message: self.to_string(),
            details,
        }
    }
}

impl From<ServiceError> for ErrorBody {
    fn from(err: ServiceError) -> Self {
        err.body()
    }
}
