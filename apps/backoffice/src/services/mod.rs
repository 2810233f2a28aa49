//! # Services
//!
//! The coupon and sale operations. Each service owns a store handle and the
//! per-call deadline; every store call goes through [`guarded`].
//!
//! ```text
//!   request ──► validate ──► guarded(store call) ──► result
//!                  │                 │
//!                  ▼                 ├── timeout      → Store (error!)
//!              Validation            ├── NotFound     → NotFound
//!                                    ├── unique       → Conflict
//!                                    └── other        → Store (error!)
//! ```

use std::future::Future;
use std::time::Duration;

use meridian_db::DbResult;
use tracing::error;

use crate::error::{ServiceError, ServiceResult};

pub mod coupon_service;
pub mod sale_service;

pub use coupon_service::CouponService;
pub use sale_service::SaleService;

/// Runs one store call under `deadline`, translating its failure.
///
/// A call that overruns is dropped, which cancels it; single-statement
/// writes either committed before that point or not at all.
pub(crate) async fn guarded<T, F>(
    deadline: Duration,
    operation: &'static str,
    id: &str,
    call: F,
) -> ServiceResult<T>
where
    F: Future<Output = DbResult<T>>,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(ServiceError::from_store(operation, id, err)),
        Err(_) => {
            error!(operation, id, ?deadline, "Store operation timed out");
            Err(ServiceError::Store { operation })
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use meridian_db::DbError;

    #[tokio::test]
    async fn test_guarded_passes_success_through() {
        let value = guarded(Duration::from_secs(1), "noop", "-", async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_guarded_maps_not_found() {
        let err = guarded::<(), _>(Duration::from_secs(1), "delete_sale", "s-1", async {
            Err(DbError::not_found("Sale", "s-1"))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { ref entity, .. } if entity == "Sale"));
    }

    #[tokio::test]
    async fn test_guarded_times_out() {
        let err = guarded::<(), _>(Duration::from_millis(10), "slow", "-", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::Store { operation: "slow" }));
    }
}
