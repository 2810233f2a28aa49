//! # Sale Item Repository
//!
//! Sale lines. Append-only: lines are inserted and read, never edited here.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use meridian_core::SaleItem;

const ITEM_COLUMNS: &str = "id, sale_id, product_id, quantity, price_cents, discount_cents, \
     total_cents, created_at, updated_at";

/// Repository for sale item database operations.
#[derive(Debug, Clone)]
pub struct SaleItemRepository {
    pool: SqlitePool,
}

impl SaleItemRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleItemRepository { pool }
    }

    /// Appends a line. `total_cents` is stored as given.
    ///
    /// ## Errors
    /// `ForeignKeyViolation` when the sale does not exist.
    pub async fn insert(&self, item: &SaleItem) -> DbResult<()> {
        debug!(sale_id = %item.sale_id, product_id = %item.product_id, "Adding sale item");

        sqlx::query(
            r#"
            INSERT INTO sale_items (
                id, sale_id, product_id, quantity,
                price_cents, discount_cents, total_cents,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&item.id)
        .bind(&item.sale_id)
        .bind(&item.product_id)
        .bind(item.quantity)
        .bind(item.price_cents)
        .bind(item.discount_cents)
        .bind(item.total_cents)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<SaleItem>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM sale_items WHERE id = ?1");
        let item = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }

    /// Lines of a sale in the order they were added.
    pub async fn list_for_sale(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM sale_items WHERE sale_id = ?1 ORDER BY created_at, id"
        );
        let items = sqlx::query_as(&sql)
            .bind(sale_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }
}
