//! # Coupon Service
//!
//! Coupon lifecycle: create, look up, list, update, validate, redeem, delete.
//!
//! ## Redemption
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Redeeming a Coupon                                │
//! │                                                                         │
//! │  Two-step (checkout previews the discount first):                       │
//! │     validate_for_redemption(code, outlet, now) → Coupon | CouponInvalid │
//! │     redeem(id)                                 → used_count + 1         │
//! │                                                                         │
//! │  One-step:                                                              │
//! │     redeem_strict(code, outlet, now)                                    │
//! │        UPDATE ... WHERE redeemable   ──1 row──► Coupon                  │
//! │                                      ──0 rows─► re-read → rejection     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use meridian_core::coupon::{check_redeemable, validate_changes};
use meridian_core::validation::{validate_coupon_code, validate_optional_uuid, validate_uuid};
use meridian_core::{
    Coupon, CouponFilter, CouponPatch, NewCoupon, Page, PageRequest, ValidationError,
};
use tracing::{debug, info, warn};

use super::guarded;
use crate::error::{ServiceError, ServiceResult};
use crate::store::CouponStore;

/// Conditional redemption retries before giving up on a coupon that keeps
/// changing underneath.
const MAX_REDEEM_ATTEMPTS: usize = 3;

/// Coupon Lifecycle Manager.
#[derive(Debug, Clone)]
pub struct CouponService<S> {
    store: S,
    timeout: Duration,
}

impl<S: CouponStore> CouponService<S> {
    /// `timeout` bounds every individual store call.
    pub fn new(store: S, timeout: Duration) -> Self {
        CouponService { store, timeout }
    }

    /// Creates a coupon with `used_count` 0.
    ///
    /// ## Errors
    /// * `Validation` - malformed outlet id, empty code, unknown discount
    ///   type, negative value, `max_uses < 1`, or `end_date < start_date`
    /// * `Conflict` - the code already exists in the outlet
    pub async fn create(&self, request: NewCoupon) -> ServiceResult<Coupon> {
        let coupon = request.into_coupon(Utc::now())?;

        guarded(
            self.timeout,
            "create_coupon",
            &coupon.id,
            self.store.insert_coupon(&coupon),
        )
        .await?;

        info!(id = %coupon.id, code = %coupon.code, outlet_id = %coupon.outlet_id, "Coupon created");
        Ok(coupon)
    }

    pub async fn get_by_id(&self, id: &str) -> ServiceResult<Coupon> {
        validate_uuid("id", id)?;

        guarded(self.timeout, "get_coupon", id, self.store.coupon_by_id(id))
            .await?
            .ok_or_else(|| ServiceError::not_found("Coupon", id))
    }

    /// Looks a coupon up by code.
    ///
    /// Codes are unique per outlet only, so an unscoped lookup that matches
    /// coupons in several outlets is rejected and must be retried with
    /// `outlet_id`.
    pub async fn get_by_code(&self, code: &str, outlet_id: Option<&str>) -> ServiceResult<Coupon> {
        validate_coupon_code(code)?;
        validate_optional_uuid("outlet_id", outlet_id)?;

        let mut matches = guarded(
            self.timeout,
            "get_coupon_by_code",
            code,
            self.store.coupons_by_code(code, outlet_id),
        )
        .await?;

        match matches.len() {
            0 => Err(ServiceError::not_found("Coupon", code)),
            1 => Ok(matches.remove(0)),
            n => Err(ValidationError::Ambiguous {
                field: "outlet_id".to_string(),
                reason: format!("code {code} exists in {n} outlets"),
            }
            .into()),
        }
    }

    /// One page of coupons, newest first.
    pub async fn list(&self, page: &PageRequest, filter: &CouponFilter) -> ServiceResult<Page<Coupon>> {
        let page = page.validate()?;
        validate_optional_uuid("outlet_id", filter.outlet_id.as_deref())?;

        let (coupons, total) = guarded(
            self.timeout,
            "list_coupons",
            filter.outlet_id.as_deref().unwrap_or("*"),
            self.store.list_coupons(&page, filter),
        )
        .await?;

        Ok(Page::new(coupons, &page, total))
    }

    pub async fn list_by_outlet(&self, outlet_id: &str) -> ServiceResult<Vec<Coupon>> {
        validate_uuid("outlet_id", outlet_id)?;
        guarded(
            self.timeout,
            "list_coupons_by_outlet",
            outlet_id,
            self.store.coupons_by_outlet(outlet_id),
        )
        .await
    }

    /// Coupons of the outlet that would pass redemption validation at `now`.
    pub async fn list_active(&self, outlet_id: &str, now: DateTime<Utc>) -> ServiceResult<Vec<Coupon>> {
        validate_uuid("outlet_id", outlet_id)?;
        guarded(
            self.timeout,
            "list_active_coupons",
            outlet_id,
            self.store.active_coupons(outlet_id, now),
        )
        .await
    }

    /// Applies the supplied fields and leaves the rest alone.
    ///
    /// An empty patch returns the stored coupon without writing. The date
    /// window is checked after merging, so moving only `end_date` before the
    /// stored `start_date` is rejected. `used_count` is never written here.
    pub async fn update(&self, id: &str, patch: &CouponPatch) -> ServiceResult<Coupon> {
        validate_uuid("id", id)?;
        let changes = patch.validate()?;

        let current = self.get_by_id(id).await?;
        if changes.is_empty() {
            debug!(id = %id, "Empty coupon patch; nothing to write");
            return Ok(current);
        }
        validate_changes(&current, &changes)?;

        let updated = guarded(
            self.timeout,
            "update_coupon",
            id,
            self.store.update_coupon(id, &changes, Utc::now()),
        )
        .await?;

        info!(id = %id, code = %updated.code, "Coupon updated");
        Ok(updated)
    }

    /// Finds the outlet's coupon and checks it can be redeemed at `now`.
    ///
    /// Checks run in order: active, started, not expired, uses left.
    /// Nothing is written.
    pub async fn validate_for_redemption(
        &self,
        code: &str,
        outlet_id: &str,
        now: DateTime<Utc>,
    ) -> ServiceResult<Coupon> {
        validate_uuid("outlet_id", outlet_id)?;
        let coupon = self.get_by_code(code, Some(outlet_id)).await?;

        if let Err(reason) = check_redeemable(&coupon, now) {
            warn!(code = %code, outlet_id = %outlet_id, %reason, "Coupon rejected");
            return Err(ServiceError::CouponInvalid {
                code: coupon.code,
                reason,
            });
        }
        Ok(coupon)
    }

    /// Counts one use: a single atomic `used_count + 1`.
    ///
    /// No eligibility checks are repeated here. Callers pairing this with
    /// [`validate_for_redemption`](Self::validate_for_redemption) can race:
    /// two checkouts may both validate the last remaining use and both
    /// redeem, leaving `used_count` above `max_uses`. Use
    /// [`redeem_strict`](Self::redeem_strict) where that matters.
    pub async fn redeem(&self, id: &str) -> ServiceResult<Coupon> {
        validate_uuid("id", id)?;

        let coupon = guarded(
            self.timeout,
            "redeem_coupon",
            id,
            self.store.increment_coupon_use(id),
        )
        .await?;

        info!(id = %id, used_count = coupon.used_count, max_uses = coupon.max_uses, "Coupon redeemed");
        Ok(coupon)
    }

    /// Validates and counts one use in a single conditional update.
    ///
    /// When the update matches nothing the coupon is read again and the
    /// current rejection reason returned.
    pub async fn redeem_strict(
        &self,
        code: &str,
        outlet_id: &str,
        now: DateTime<Utc>,
    ) -> ServiceResult<Coupon> {
        validate_uuid("outlet_id", outlet_id)?;
        let coupon = self.get_by_code(code, Some(outlet_id)).await?;

        for attempt in 1..=MAX_REDEEM_ATTEMPTS {
            let redeemed = guarded(
                self.timeout,
                "redeem_coupon_strict",
                &coupon.id,
                self.store.redeem_coupon_if_eligible(&coupon.id, now),
            )
            .await?;

            if let Some(redeemed) = redeemed {
                info!(
                    id = %redeemed.id,
                    code = %redeemed.code,
                    used_count = redeemed.used_count,
                    "Coupon redeemed"
                );
                return Ok(redeemed);
            }

            let current = guarded(
                self.timeout,
                "get_coupon",
                &coupon.id,
                self.store.coupon_by_id(&coupon.id),
            )
            .await?
            .ok_or_else(|| ServiceError::not_found("Coupon", &coupon.id))?;

            if let Err(reason) = check_redeemable(&current, now) {
                warn!(code = %code, outlet_id = %outlet_id, %reason, "Coupon rejected");
                return Err(ServiceError::CouponInvalid {
                    code: current.code,
                    reason,
                });
            }
            debug!(id = %coupon.id, attempt, "Coupon changed during redemption; retrying");
        }

        Err(ServiceError::Conflict {
            field: "code".to_string(),
            message: format!("Coupon {code} changed during redemption"),
        })
    }

    /// Hard delete. Links from sales go with it.
    pub async fn delete(&self, id: &str) -> ServiceResult<()> {
        validate_uuid("id", id)?;
        guarded(self.timeout, "delete_coupon", id, self.store.delete_coupon(id)).await?;
        info!(id = %id, "Coupon deleted");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::doubles::BrokenStore;
    use chrono::Duration as ChronoDuration;
    use meridian_core::CouponRejection;
    use meridian_db::{Database, DbConfig};
    use uuid::Uuid;

    const TIMEOUT: Duration = Duration::from_secs(5);

    async fn service() -> CouponService<Database> {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        CouponService::new(db, TIMEOUT)
    }

    fn outlet() -> String {
        Uuid::new_v4().to_string()
    }

    /// 10% off, two uses, valid from yesterday until tomorrow.
    fn summer10(outlet_id: &str) -> NewCoupon {
        let now = Utc::now();
        NewCoupon {
            outlet_id: outlet_id.to_string(),
            code: "SUMMER10".to_string(),
            description: Some("Summer sale".to_string()),
            discount_type: "percentage".to_string(),
            discount_value: 1_000,
            max_uses: 2,
            start_date: now - ChronoDuration::days(1),
            end_date: now + ChronoDuration::days(1),
            is_active: Some(true),
        }
    }

    #[tokio::test]
    async fn test_create_then_get_by_code() {
        let service = service().await;
        let outlet = outlet();
        let request = summer10(&outlet);

        let created = service.create(request.clone()).await.unwrap();
        let fetched = service.get_by_code("SUMMER10", Some(&outlet)).await.unwrap();

        assert_eq!(fetched, created);
        assert_eq!(fetched.used_count, 0);
        assert_eq!(fetched.code, request.code);
        assert_eq!(fetched.description, request.description);
        assert_eq!(fetched.discount_value, request.discount_value);
        assert_eq!(fetched.max_uses, request.max_uses);
        assert_eq!(fetched.start_date, request.start_date);
        assert_eq!(fetched.end_date, request.end_date);
        assert!(fetched.is_active);
    }

    #[tokio::test]
    async fn test_validate_and_redeem_until_exhausted() {
        let service = service().await;
        let outlet = outlet();
        service.create(summer10(&outlet)).await.unwrap();

        for expected_uses in 1..=2 {
            let coupon = service
                .validate_for_redemption("SUMMER10", &outlet, Utc::now())
                .await
                .unwrap();
            let redeemed = service.redeem(&coupon.id).await.unwrap();
            assert_eq!(redeemed.used_count, expected_uses);
        }

        let err = service
            .validate_for_redemption("SUMMER10", &outlet, Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.rejection(), Some(CouponRejection::ExhaustedUses));
    }

    #[tokio::test]
    async fn test_not_yet_valid() {
        let service = service().await;
        let outlet = outlet();
        let mut request = summer10(&outlet);
        request.start_date = Utc::now() + ChronoDuration::days(1);
        request.end_date = Utc::now() + ChronoDuration::days(7);
        service.create(request).await.unwrap();

        let err = service
            .validate_for_redemption("SUMMER10", &outlet, Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.rejection(), Some(CouponRejection::NotYetValid));
        assert_eq!(err.status(), 422);
    }

    #[tokio::test]
    async fn test_inactive_and_expired() {
        let service = service().await;
        let outlet = outlet();

        let mut inactive = summer10(&outlet);
        inactive.code = "OFF".to_string();
        inactive.is_active = Some(false);
        service.create(inactive).await.unwrap();

        let mut expired = summer10(&outlet);
        expired.code = "OLD".to_string();
        expired.start_date = Utc::now() - ChronoDuration::days(10);
        expired.end_date = Utc::now() - ChronoDuration::days(3);
        service.create(expired).await.unwrap();

        let now = Utc::now();
        let err = service.validate_for_redemption("OFF", &outlet, now).await.unwrap_err();
        assert_eq!(err.rejection(), Some(CouponRejection::NotActive));
        let err = service.validate_for_redemption("OLD", &outlet, now).await.unwrap_err();
        assert_eq!(err.rejection(), Some(CouponRejection::Expired));
    }

    #[tokio::test]
    async fn test_inverted_window_persists_nothing() {
        let service = service().await;
        let outlet = outlet();
        let mut request = summer10(&outlet);
        request.end_date = request.start_date - ChronoDuration::hours(1);

        let err = service.create(request).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref e) if e.field() == "end_date"));
        assert!(service.list_by_outlet(&outlet).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_bad_input() {
        let service = service().await;
        let outlet = outlet();

        let mut bad_type = summer10(&outlet);
        bad_type.discount_type = "bogus".to_string();
        let mut negative = summer10(&outlet);
        negative.discount_value = -1;
        let mut no_uses = summer10(&outlet);
        no_uses.max_uses = 0;
        let mut bad_outlet = summer10(&outlet);
        bad_outlet.outlet_id = "outlet-1".to_string();

        for (request, field) in [
            (bad_type, "discount_type"),
            (negative, "discount_value"),
            (no_uses, "max_uses"),
            (bad_outlet, "outlet_id"),
        ] {
            let err = service.create(request).await.unwrap_err();
            assert!(
                matches!(err, ServiceError::Validation(ref e) if e.field() == field),
                "expected validation error on {field}, got {err:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_duplicate_code_conflicts_within_outlet_only() {
        let service = service().await;
        let (home, elsewhere) = (outlet(), outlet());
        service.create(summer10(&home)).await.unwrap();

        let err = service.create(summer10(&home)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict { .. }));
        assert_eq!(err.status(), 409);

        service.create(summer10(&elsewhere)).await.unwrap();
    }

    #[tokio::test]
    async fn test_unscoped_lookup_across_outlets_is_ambiguous() {
        let service = service().await;
        let (a, b) = (outlet(), outlet());
        service.create(summer10(&a)).await.unwrap();
        service.create(summer10(&b)).await.unwrap();

        let err = service.get_by_code("SUMMER10", None).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref e) if e.field() == "outlet_id"));

        let scoped = service.get_by_code("SUMMER10", Some(&b)).await.unwrap();
        assert_eq!(scoped.outlet_id, b);

        let err = service.get_by_code("WINTER", None).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_sparse_update_keeps_other_fields() {
        let service = service().await;
        let created = service.create(summer10(&outlet())).await.unwrap();

        let patch = CouponPatch {
            description: Some("new text".to_string()),
            ..Default::default()
        };
        let updated = service.update(&created.id, &patch).await.unwrap();

        assert_eq!(updated.description.as_deref(), Some("new text"));
        assert_eq!(updated.code, created.code);
        assert_eq!(updated.discount_type, created.discount_type);
        assert_eq!(updated.discount_value, created.discount_value);
        assert_eq!(updated.max_uses, created.max_uses);
        assert_eq!(updated.used_count, created.used_count);
        assert_eq!(updated.start_date, created.start_date);
        assert_eq!(updated.end_date, created.end_date);
        assert_eq!(updated.is_active, created.is_active);
    }

    #[tokio::test]
    async fn test_empty_update_is_a_no_op() {
        let service = service().await;
        let created = service.create(summer10(&outlet())).await.unwrap();

        let unchanged = service
            .update(&created.id, &CouponPatch::default())
            .await
            .unwrap();
        assert_eq!(unchanged, created);
    }

    #[tokio::test]
    async fn test_update_checks_merged_window() {
        let service = service().await;
        let created = service.create(summer10(&outlet())).await.unwrap();

        let patch = CouponPatch {
            end_date: Some(created.start_date - ChronoDuration::days(1)),
            ..Default::default()
        };
        let err = service.update(&created.id, &patch).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref e) if e.field() == "end_date"));

        let stored = service.get_by_id(&created.id).await.unwrap();
        assert_eq!(stored.end_date, created.end_date);
    }

    #[tokio::test]
    async fn test_update_code_collision_conflicts() {
        let service = service().await;
        let outlet = outlet();
        service.create(summer10(&outlet)).await.unwrap();
        let mut other = summer10(&outlet);
        other.code = "AUTUMN".to_string();
        let other = service.create(other).await.unwrap();

        let patch = CouponPatch {
            code: Some("SUMMER10".to_string()),
            ..Default::default()
        };
        let err = service.update(&other.id, &patch).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_missing_coupon_is_not_found() {
        let service = service().await;
        let id = Uuid::new_v4().to_string();

        assert!(matches!(
            service.get_by_id(&id).await.unwrap_err(),
            ServiceError::NotFound { .. }
        ));
        assert!(matches!(
            service.redeem(&id).await.unwrap_err(),
            ServiceError::NotFound { .. }
        ));
        assert!(matches!(
            service.delete(&id).await.unwrap_err(),
            ServiceError::NotFound { .. }
        ));
        assert!(matches!(
            service.update(&id, &CouponPatch::default()).await.unwrap_err(),
            ServiceError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_malformed_id_rejected_before_store() {
        let service = CouponService::new(BrokenStore::default(), TIMEOUT);
        let err = service.get_by_id("not-a-uuid").await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref e) if e.field() == "id"));
    }

    #[tokio::test]
    async fn test_get_by_id_is_idempotent() {
        let service = service().await;
        let created = service.create(summer10(&outlet())).await.unwrap();

        let first = service.get_by_id(&created.id).await.unwrap();
        let second = service.get_by_id(&created.id).await.unwrap();
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }

    #[tokio::test]
    async fn test_redeem_strict_stops_at_max_uses() {
        let service = service().await;
        let outlet = outlet();
        service.create(summer10(&outlet)).await.unwrap();

        let now = Utc::now();
        assert_eq!(
            service.redeem_strict("SUMMER10", &outlet, now).await.unwrap().used_count,
            1
        );
        assert_eq!(
            service.redeem_strict("SUMMER10", &outlet, now).await.unwrap().used_count,
            2
        );
        let err = service
            .redeem_strict("SUMMER10", &outlet, now)
            .await
            .unwrap_err();
        assert_eq!(err.rejection(), Some(CouponRejection::ExhaustedUses));

        let stored = service.get_by_code("SUMMER10", Some(&outlet)).await.unwrap();
        assert_eq!(stored.used_count, 2);
    }

    #[tokio::test]
    async fn test_concurrent_strict_redemptions_never_overshoot() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let service = CouponService::new(db, TIMEOUT);
        let outlet = outlet();
        service.create(summer10(&outlet)).await.unwrap();

        let now = Utc::now();
        let mut handles = Vec::new();
        for _ in 0..6 {
            let service = service.clone();
            let outlet = outlet.clone();
            handles.push(tokio::spawn(async move {
                service.redeem_strict("SUMMER10", &outlet, now).await
            }));
        }

        let mut redeemed = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                redeemed += 1;
            }
        }
        assert_eq!(redeemed, 2);
    }

    #[tokio::test]
    async fn test_list_pages_and_searches() {
        let service = service().await;
        let outlet = outlet();
        for code in ["SUMMER10", "SUMMER20", "WINTER5"] {
            let mut request = summer10(&outlet);
            request.code = code.to_string();
            request.description = None;
            service.create(request).await.unwrap();
        }
        let filter = CouponFilter {
            outlet_id: Some(outlet.clone()),
        };

        let page = service
            .list(&PageRequest::new(1, 2), &filter)
            .await
            .unwrap();
        assert_eq!(page.results.len(), 2);
        assert_eq!(page.total_results, 3);
        assert_eq!(page.total_pages, 2);

        let page = service
            .list(&PageRequest::default().with_search("summer"), &filter)
            .await
            .unwrap();
        assert_eq!(page.total_results, 2);

        let err = service
            .list(&PageRequest::new(0, 10), &filter)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_list_active_excludes_unredeemable() {
        let service = service().await;
        let outlet = outlet();
        service.create(summer10(&outlet)).await.unwrap();
        let mut off = summer10(&outlet);
        off.code = "OFF".to_string();
        off.is_active = Some(false);
        service.create(off).await.unwrap();

        let active = service.list_active(&outlet, Utc::now()).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].code, "SUMMER10");
    }

    #[tokio::test]
    async fn test_delete_removes_coupon() {
        let service = service().await;
        let created = service.create(summer10(&outlet())).await.unwrap();

        service.delete(&created.id).await.unwrap();
        assert!(matches!(
            service.get_by_id(&created.id).await.unwrap_err(),
            ServiceError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_store_failure_is_opaque() {
        let service = CouponService::new(BrokenStore::default(), TIMEOUT);
        let err = service.create(summer10(&outlet())).await.unwrap_err();

        assert!(matches!(err, ServiceError::Store { operation: "create_coupon" }));
        let body = err.body();
        assert_eq!(body.status, 500);
        assert!(!body.message.contains("locked"));
    }

    #[tokio::test]
    async fn test_stalled_store_hits_deadline() {
        let store = BrokenStore::stalled(Duration::from_secs(30));
        let service = CouponService::new(store, Duration::from_millis(20));

        let err = service
            .get_by_id(&Uuid::new_v4().to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Store { operation: "get_coupon" }));
    }
}
