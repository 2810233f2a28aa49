//! # Sale Coupon Repository
//!
//! The junction between sales and the coupons applied to them.
//!
//! ```text
//!   sales.id ◄── sale_coupons(sale_id, coupon_id) ──► coupons.id
//!                  UNIQUE (sale_id, coupon_id)
//! ```
//!
//! Navigation runs through ids in both directions: `coupons_for_sale` joins
//! to resolve the coupon rows, `list_for_coupon` goes the other way.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use meridian_core::{Coupon, SaleCoupon};

const LINK_COLUMNS: &str = "id, sale_id, coupon_id, created_at";

/// Repository for sale/coupon links.
#[derive(Debug, Clone)]
pub struct SaleCouponRepository {
    pool: SqlitePool,
}

impl SaleCouponRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleCouponRepository { pool }
    }

    /// Links a coupon to a sale.
    ///
    /// ## Errors
    /// * `UniqueViolation` - the pair is already linked
    /// * `ForeignKeyViolation` - the sale or coupon is missing
    pub async fn insert(&self, link: &SaleCoupon) -> DbResult<()> {
        debug!(sale_id = %link.sale_id, coupon_id = %link.coupon_id, "Linking coupon to sale");

        sqlx::query(
            "INSERT INTO sale_coupons (id, sale_id, coupon_id, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&link.id)
        .bind(&link.sale_id)
        .bind(&link.coupon_id)
        .bind(link.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DbError::from(e).with_value(format!("{}/{}", link.sale_id, link.coupon_id))
        })?;

        Ok(())
    }

    pub async fn list_for_sale(&self, sale_id: &str) -> DbResult<Vec<SaleCoupon>> {
        let sql = format!(
            "SELECT {LINK_COLUMNS} FROM sale_coupons WHERE sale_id = ?1 ORDER BY created_at, id"
        );
        let links = sqlx::query_as(&sql)
            .bind(sale_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(links)
    }

    pub async fn list_for_coupon(&self, coupon_id: &str) -> DbResult<Vec<SaleCoupon>> {
        let sql = format!(
            "SELECT {LINK_COLUMNS} FROM sale_coupons WHERE coupon_id = ?1 ORDER BY created_at, id"
        );
        let links = sqlx::query_as(&sql)
            .bind(coupon_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(links)
    }

    /// The coupons applied to a sale, in the order they were attached.
    pub async fn coupons_for_sale(&self, sale_id: &str) -> DbResult<Vec<Coupon>> {
        let coupons = sqlx::query_as(
            r#"
            SELECT
                c.id, c.outlet_id, c.code, c.description,
                c.discount_type, c.discount_value, c.max_uses, c.used_count,
                c.start_date, c.end_date, c.is_active,
                c.created_at, c.updated_at
            FROM sale_coupons sc
            JOIN coupons c ON c.id = sc.coupon_id
            WHERE sc.sale_id = ?1
            ORDER BY sc.created_at, sc.id
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(coupons)
    }
}
