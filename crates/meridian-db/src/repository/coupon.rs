//! # Coupon Repository
//!
//! Database operations for coupons.
//!
//! ## Redemption Counting
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  increment_used(id)                                                    │
//! │    UPDATE coupons SET used_count = used_count + 1 WHERE id = ?         │
//! │    One statement: concurrent redemptions never lose an increment.      │
//! │    Does not look at the validity window.                               │
//! │                                                                         │
//! │  redeem_if_eligible(id, now)                                           │
//! │    Same increment, but the WHERE clause also requires                  │
//! │      is_active AND start_date <= now <= end_date                       │
//! │      AND used_count < max_uses                                         │
//! │    Zero rows touched → not eligible (or not found). Never overshoots.  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::like_pattern;
use meridian_core::{Coupon, CouponChanges, CouponFilter, PageRequest};

const COUPON_COLUMNS: &str = "id, outlet_id, code, description, discount_type, discount_value, \
     max_uses, used_count, start_date, end_date, is_active, created_at, updated_at";

/// Repository for coupon database operations.
#[derive(Debug, Clone)]
pub struct CouponRepository {
    pool: SqlitePool,
}

impl CouponRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CouponRepository { pool }
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Inserts a fully built coupon.
    ///
    /// ## Errors
    /// `UniqueViolation` when the outlet already has a coupon with this code.
    pub async fn insert(&self, coupon: &Coupon) -> DbResult<()> {
        debug!(id = %coupon.id, outlet_id = %coupon.outlet_id, code = %coupon.code, "Inserting coupon");

        sqlx::query(
            r#"
            INSERT INTO coupons (
                id, outlet_id, code, description,
                discount_type, discount_value, max_uses, used_count,
                start_date, end_date, is_active,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&coupon.id)
        .bind(&coupon.outlet_id)
        .bind(&coupon.code)
        .bind(&coupon.description)
        .bind(coupon.discount_type)
        .bind(coupon.discount_value)
        .bind(coupon.max_uses)
        .bind(coupon.used_count)
        .bind(coupon.start_date)
        .bind(coupon.end_date)
        .bind(coupon.is_active)
        .bind(coupon.created_at)
        .bind(coupon.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_value(&coupon.code))?;

        Ok(())
    }

    /// Applies only the supplied columns, plus `updated_at`.
    ///
    /// `used_count` is never written here, so a concurrent redemption
    /// cannot be overwritten by an edit.
    ///
    /// ## Returns
    /// The coupon as stored after the update.
    pub async fn update_fields(
        &self,
        id: &str,
        changes: &CouponChanges,
        now: DateTime<Utc>,
    ) -> DbResult<Coupon> {
        debug!(id = %id, ?changes, "Updating coupon");

        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new("UPDATE coupons SET ");
        {
            let mut set = qb.separated(", ");
            if let Some(code) = &changes.code {
                set.push("code = ").push_bind_unseparated(code.clone());
            }
            if let Some(description) = &changes.description {
                set.push("description = ")
                    .push_bind_unseparated(description.clone());
            }
            if let Some(discount_type) = changes.discount_type {
                set.push("discount_type = ")
                    .push_bind_unseparated(discount_type);
            }
            if let Some(value) = changes.discount_value {
                set.push("discount_value = ").push_bind_unseparated(value);
            }
            if let Some(max_uses) = changes.max_uses {
                set.push("max_uses = ").push_bind_unseparated(max_uses);
            }
            if let Some(start) = changes.start_date {
                set.push("start_date = ").push_bind_unseparated(start);
            }
            if let Some(end) = changes.end_date {
                set.push("end_date = ").push_bind_unseparated(end);
            }
            if let Some(active) = changes.is_active {
                set.push("is_active = ").push_bind_unseparated(active);
            }
            set.push("updated_at = ").push_bind_unseparated(now);
        }
        qb.push(" WHERE id = ").push_bind(id.to_string());
        qb.push(format!(" RETURNING {COUPON_COLUMNS}"));

        let updated = qb
            .build_query_as::<Coupon>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                DbError::from(e).with_value(changes.code.clone().unwrap_or_default())
            })?;

        updated.ok_or_else(|| DbError::not_found("Coupon", id))
    }

    /// Counts one redemption with a single atomic increment.
    ///
    /// ## Returns
    /// The coupon with its new `used_count`.
    pub async fn increment_used(&self, id: &str) -> DbResult<Coupon> {
        debug!(id = %id, "Incrementing coupon used_count");

        let sql = format!(
            "UPDATE coupons SET used_count = used_count + 1, updated_at = ?1 \
             WHERE id = ?2 RETURNING {COUPON_COLUMNS}"
        );
        let coupon: Option<Coupon> = sqlx::query_as(&sql)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        coupon.ok_or_else(|| DbError::not_found("Coupon", id))
    }

    /// Counts one redemption only if the coupon is redeemable at `now`,
    /// deciding and incrementing in one statement.
    ///
    /// ## Returns
    /// * `Some(coupon)` - redeemed; `used_count` already incremented
    /// * `None` - missing, inactive, outside its window, or exhausted
    pub async fn redeem_if_eligible(
        &self,
        id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<Option<Coupon>> {
        debug!(id = %id, %now, "Conditionally redeeming coupon");

        let sql = format!(
            r#"
            UPDATE coupons
            SET used_count = used_count + 1, updated_at = ?1
            WHERE id = ?2
              AND is_active = 1
              AND start_date <= ?1
              AND end_date >= ?1
              AND used_count < max_uses
            RETURNING {COUPON_COLUMNS}
            "#
        );
        let coupon = sqlx::query_as(&sql)
            .bind(now)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(coupon)
    }

    /// Hard delete. Links to sales go with it (ON DELETE CASCADE).
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting coupon");

        let result = sqlx::query("DELETE FROM coupons WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Coupon", id));
        }
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Coupon>> {
        let sql = format!("SELECT {COUPON_COLUMNS} FROM coupons WHERE id = ?1");
        let coupon = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(coupon)
    }

    /// Coupons with this code, in one outlet or across all of them.
    ///
    /// Codes are only unique per outlet, so an unscoped lookup can return
    /// several rows; the caller decides what that means.
    pub async fn find_by_code(&self, code: &str, outlet_id: Option<&str>) -> DbResult<Vec<Coupon>> {
        debug!(code = %code, outlet_id = ?outlet_id, "Finding coupon by code");

        let mut qb: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT {COUPON_COLUMNS} FROM coupons WHERE code = "));
        qb.push_bind(code.to_string());
        if let Some(outlet_id) = outlet_id {
            qb.push(" AND outlet_id = ").push_bind(outlet_id.to_string());
        }
        qb.push(" ORDER BY created_at, id");

        let coupons = qb.build_query_as::<Coupon>().fetch_all(&self.pool).await?;
        Ok(coupons)
    }

    /// One page of coupons plus the total matching count.
    ///
    /// `page.search` matches code or description, case-insensitively.
    pub async fn list(
        &self,
        page: &PageRequest,
        filter: &CouponFilter,
    ) -> DbResult<(Vec<Coupon>, i64)> {
        debug!(page = page.page, limit = page.limit, ?filter, "Listing coupons");

        let search = page.search.as_deref();

        let mut count: QueryBuilder<'_, Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM coupons");
        push_filters(&mut count, filter, search);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT {COUPON_COLUMNS} FROM coupons"));
        push_filters(&mut qb, filter, search);
        qb.push(" ORDER BY created_at DESC, id LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(page.offset());

        let coupons = qb.build_query_as::<Coupon>().fetch_all(&self.pool).await?;
        Ok((coupons, total))
    }

    pub async fn list_by_outlet(&self, outlet_id: &str) -> DbResult<Vec<Coupon>> {
        let sql = format!(
            "SELECT {COUPON_COLUMNS} FROM coupons WHERE outlet_id = ?1 ORDER BY created_at DESC, id"
        );
        let coupons = sqlx::query_as(&sql)
            .bind(outlet_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(coupons)
    }

    /// Coupons of the outlet that are redeemable at `now`.
    pub async fn list_active(&self, outlet_id: &str, now: DateTime<Utc>) -> DbResult<Vec<Coupon>> {
        let sql = format!(
            r#"
            SELECT {COUPON_COLUMNS} FROM coupons
            WHERE outlet_id = ?1
              AND is_active = 1
              AND start_date <= ?2
              AND end_date >= ?2
              AND used_count < max_uses
            ORDER BY end_date, id
            "#
        );
        let coupons = sqlx::query_as(&sql)
            .bind(outlet_id)
            .bind(now)
            .fetch_all(&self.pool)
            .await?;
        Ok(coupons)
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &CouponFilter, search: Option<&str>) {
    qb.push(" WHERE 1 = 1");
    if let Some(outlet_id) = &filter.outlet_id {
        qb.push(" AND outlet_id = ").push_bind(outlet_id.clone());
    }
    if let Some(term) = search {
        let pattern = like_pattern(term);
        qb.push(" AND (LOWER(code) LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR LOWER(COALESCE(description, '')) LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
