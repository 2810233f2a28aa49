//! # Database Migrations
//!
//! Embedded SQL migrations for the back-office store.
//!
//! ## Schema
//! ```text
//! ┌──────────────┐        ┌───────────────┐        ┌──────────────┐
//! │   coupons    │◄───────┤ sale_coupons  ├───────►│    sales     │
//! │ UNIQUE       │        │ UNIQUE        │        │ UNIQUE       │
//! │ (outlet,code)│        │ (sale,coupon) │        │ invoice_no   │
//! └──────────────┘        └───────────────┘        └──────▲───────┘
//!                                                         │
//!                                                  ┌──────┴───────┐
//!                                                  │  sale_items  │
//!                                                  └──────────────┘
//! ```
//!
//! ## Adding New Migrations
//!
//! 1. Create a new file in `migrations/sqlite/` with the next sequence number
//! 2. Name format: `NNN_description.sql`
//! 3. **NEVER** modify an applied migration; add a new one

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

/// Migrations embedded from `migrations/sqlite` at compile time.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Runs all pending database migrations. Safe to call repeatedly.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    info!(
        embedded = MIGRATOR.migrations.len(),
        "Checking for pending migrations"
    );

    MIGRATOR.run(pool).await?;

    info!("All migrations applied successfully");
    Ok(())
}

/// `(embedded, applied)` migration counts, for diagnostics.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await?;

    Ok((total, applied as usize))
}
