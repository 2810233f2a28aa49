//! # Sale Repository
//!
//! Database operations for sale headers.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. CREATE                                                             │
//! │     └── insert() → Sale { status as requested, totals as given }       │
//! │                                                                         │
//! │  2. ATTACH (any order, append-only)                                    │
//! │     └── sale_items().insert()   → SaleItem                             │
//! │     └── sale_coupons().insert() → SaleCoupon                           │
//! │                                                                         │
//! │  3. CHANGE                                                             │
//! │     └── update_status()  → any status to any status                    │
//! │     └── update_fields()  → only the supplied columns                   │
//! │                                                                         │
//! │  4. DELETE                                                             │
//! │     └── delete() → header row; items and links cascade in SQLite       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Totals are stored exactly as the caller computed them.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::like_pattern;
use meridian_core::report::day_bounds;
use meridian_core::{PageRequest, ReportFilter, Sale, SaleChanges, SaleFilter, SaleStatus};

const SALE_COLUMNS: &str = "id, outlet_id, staff_id, customer_id, payment_method_id, table_id, \
     invoice_number, total_cents, discount_cents, tax_cents, grand_total_cents, status, \
     sale_date, note, created_at, updated_at";

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Inserts a fully built sale.
    ///
    /// ## Errors
    /// `UniqueViolation` when the invoice number is taken (in any outlet).
    pub async fn insert(&self, sale: &Sale) -> DbResult<()> {
        debug!(id = %sale.id, invoice_number = %sale.invoice_number, "Inserting sale");

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, outlet_id, staff_id, customer_id, payment_method_id, table_id,
                invoice_number, total_cents, discount_cents, tax_cents, grand_total_cents,
                status, sale_date, note, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9, ?10, ?11,
                ?12, ?13, ?14, ?15, ?16
            )
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.outlet_id)
        .bind(&sale.staff_id)
        .bind(&sale.customer_id)
        .bind(&sale.payment_method_id)
        .bind(&sale.table_id)
        .bind(&sale.invoice_number)
        .bind(sale.total_cents)
        .bind(sale.discount_cents)
        .bind(sale.tax_cents)
        .bind(sale.grand_total_cents)
        .bind(sale.status)
        .bind(sale.sale_date)
        .bind(&sale.note)
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_value(&sale.invoice_number))?;

        Ok(())
    }

    /// Applies only the supplied columns, plus `updated_at`.
    pub async fn update_fields(
        &self,
        id: &str,
        changes: &SaleChanges,
        now: DateTime<Utc>,
    ) -> DbResult<Sale> {
        debug!(id = %id, ?changes, "Updating sale");

        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new("UPDATE sales SET ");
        {
            let mut set = qb.separated(", ");
            let text_columns = [
                ("outlet_id", &changes.outlet_id),
                ("staff_id", &changes.staff_id),
                ("customer_id", &changes.customer_id),
                ("payment_method_id", &changes.payment_method_id),
                ("table_id", &changes.table_id),
                ("invoice_number", &changes.invoice_number),
                ("note", &changes.note),
            ];
            for (column, value) in text_columns {
                if let Some(v) = value {
                    set.push(format!("{column} = "))
                        .push_bind_unseparated(v.clone());
                }
            }
            let money_columns = [
                ("total_cents", changes.total_cents),
                ("discount_cents", changes.discount_cents),
                ("tax_cents", changes.tax_cents),
                ("grand_total_cents", changes.grand_total_cents),
            ];
            for (column, value) in money_columns {
                if let Some(v) = value {
                    set.push(format!("{column} = ")).push_bind_unseparated(v);
                }
            }
            if let Some(status) = changes.status {
                set.push("status = ").push_bind_unseparated(status);
            }
            if let Some(sale_date) = changes.sale_date {
                set.push("sale_date = ").push_bind_unseparated(sale_date);
            }
            set.push("updated_at = ").push_bind_unseparated(now);
        }
        qb.push(" WHERE id = ").push_bind(id.to_string());
        qb.push(format!(" RETURNING {SALE_COLUMNS}"));

        let updated = qb
            .build_query_as::<Sale>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                DbError::from(e).with_value(changes.invoice_number.clone().unwrap_or_default())
            })?;

        updated.ok_or_else(|| DbError::not_found("Sale", id))
    }

    /// Overwrites the status. No transition rules.
    pub async fn update_status(&self, id: &str, status: SaleStatus) -> DbResult<Sale> {
        debug!(id = %id, status = %status, "Updating sale status");

        let sql = format!(
            "UPDATE sales SET status = ?1, updated_at = ?2 WHERE id = ?3 RETURNING {SALE_COLUMNS}"
        );
        let sale: Option<Sale> = sqlx::query_as(&sql)
            .bind(status)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        sale.ok_or_else(|| DbError::not_found("Sale", id))
    }

    /// Hard delete of the header row.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting sale");

        let result = sqlx::query("DELETE FROM sales WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", id));
        }
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1");
        let sale = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(sale)
    }

    pub async fn get_by_invoice_number(&self, invoice_number: &str) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE invoice_number = ?1");
        let sale = sqlx::query_as(&sql)
            .bind(invoice_number)
            .fetch_optional(&self.pool)
            .await?;
        Ok(sale)
    }

    /// `true` when a sale with this id exists.
    pub async fn exists(&self, id: &str) -> DbResult<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM sales WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    /// One page of sales (newest first) plus the total matching count.
    ///
    /// `page.search` matches invoice number or note, case-insensitively.
    pub async fn list(&self, page: &PageRequest, filter: &SaleFilter) -> DbResult<(Vec<Sale>, i64)> {
        debug!(page = page.page, limit = page.limit, ?filter, "Listing sales");

        let search = page.search.as_deref();

        let mut count: QueryBuilder<'_, Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM sales");
        push_filters(&mut count, filter, search);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT {SALE_COLUMNS} FROM sales"));
        push_filters(&mut qb, filter, search);
        qb.push(" ORDER BY sale_date DESC, id LIMIT ")
            .push_bind(i64::from(page.limit))
            .push(" OFFSET ")
            .push_bind(page.offset());

        let sales = qb.build_query_as::<Sale>().fetch_all(&self.pool).await?;
        Ok((sales, total))
    }

    pub async fn list_by_outlet(&self, outlet_id: &str) -> DbResult<Vec<Sale>> {
        let sql = format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE outlet_id = ?1 ORDER BY sale_date DESC, id"
        );
        let sales = sqlx::query_as(&sql)
            .bind(outlet_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(sales)
    }

    /// Sales of the outlet dated within `from..=to` (whole days, UTC).
    pub async fn list_by_date_range(
        &self,
        outlet_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<Vec<Sale>> {
        let filter = SaleFilter {
            outlet_id: Some(outlet_id.to_string()),
            date_from: Some(from),
            date_to: Some(to),
            ..Default::default()
        };

        let mut qb: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT {SALE_COLUMNS} FROM sales"));
        push_filters(&mut qb, &filter, None);
        qb.push(" ORDER BY sale_date, id");

        let sales = qb.build_query_as::<Sale>().fetch_all(&self.pool).await?;
        Ok(sales)
    }

    /// Every sale matching a report filter, oldest first. Void sales included.
    pub async fn list_for_report(&self, report: &ReportFilter) -> DbResult<Vec<Sale>> {
        debug!(?report, "Loading sales for report");

        let filter = SaleFilter {
            outlet_id: report.outlet_id.clone(),
            date_from: report.date_from,
            date_to: report.date_to,
            ..Default::default()
        };

        let mut qb: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT {SALE_COLUMNS} FROM sales"));
        push_filters(&mut qb, &filter, None);
        qb.push(" ORDER BY sale_date, id");

        let sales = qb.build_query_as::<Sale>().fetch_all(&self.pool).await?;
        Ok(sales)
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &SaleFilter, search: Option<&str>) {
    qb.push(" WHERE 1 = 1");

    let id_columns = [
        ("outlet_id", &filter.outlet_id),
        ("customer_id", &filter.customer_id),
        ("payment_method_id", &filter.payment_method_id),
    ];
    for (column, value) in id_columns {
        if let Some(v) = value {
            qb.push(format!(" AND {column} = ")).push_bind(v.clone());
        }
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status);
    }

    let (from, until) = day_bounds(filter.date_from, filter.date_to);
    if let Some(from) = from {
        qb.push(" AND sale_date >= ").push_bind(from);
    }
    if let Some(until) = until {
        qb.push(" AND sale_date < ").push_bind(until);
    }

    if let Some(term) = search {
        let pattern = like_pattern(term);
        qb.push(" AND (LOWER(invoice_number) LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR LOWER(COALESCE(note, '')) LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
