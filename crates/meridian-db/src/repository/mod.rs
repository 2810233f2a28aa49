//! # Repository Module
//!
//! Database repository implementations for the back office.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Layout                                    │
//! │                                                                         │
//! │  Service                                                               │
//! │       │  db.coupons().increment_used(id)                               │
//! │       ▼                                                                 │
//! │  CouponRepository ─────── coupons                                      │
//! │  SaleRepository ───────── sales                                        │
//! │  SaleItemRepository ───── sale_items                                   │
//! │  SaleCouponRepository ─── sale_coupons (+ join to coupons)             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite                                                                │
//! │                                                                         │
//! │  Rules:                                                                 │
//! │  • One SQL statement per write; no read-modify-write                   │
//! │  • Sparse updates touch only the supplied columns                      │
//! │  • Lookups return Option; writes on a missing row → DbError::NotFound  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`CouponRepository`](coupon::CouponRepository) - Coupon CRUD, listing, redemption counting
//! - [`SaleRepository`](sale::SaleRepository) - Sale headers, listing, reports
//! - [`SaleItemRepository`](sale_item::SaleItemRepository) - Sale lines
//! - [`SaleCouponRepository`](sale_coupon::SaleCouponRepository) - Coupons applied to sales

pub mod coupon;
pub mod sale;
pub mod sale_coupon;
pub mod sale_item;

/// Case-insensitive substring pattern for `LOWER(col) LIKE ? ESCAPE '\'`.
///
/// SQLite's `LOWER` folds ASCII only, so the term is folded the same way.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.to_ascii_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}
