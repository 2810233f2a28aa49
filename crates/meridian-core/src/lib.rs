//! # meridian-core: Pure Business Logic for the Meridian Back Office
//!
//! This crate contains the domain rules of the back office as pure functions
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Meridian Back Office Architecture                   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 apps/backoffice (services)                      │   │
//! │  │    CouponService ──► validate / redeem                          │   │
//! │  │    SaleService   ──► create / items / coupons / report          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ meridian-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌──────────┐ ┌────────┐ │   │
//! │  │   │  types  │ │  money  │ │  coupon  │ │validation│ │ report │ │   │
//! │  │   │ Coupon  │ │  Money  │ │ redeem   │ │  rules   │ │buckets │ │   │
//! │  │   │  Sale   │ │  bps    │ │ checks   │ │  checks  │ │        │ │   │
//! │  │   └─────────┘ └─────────┘ └──────────┘ └──────────┘ └────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 meridian-db (Database Layer)                    │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (Coupon, Sale, SaleItem, SaleCoupon) and inputs
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`coupon`] - Redemption eligibility rules
//! - [`pagination`] - Page requests and page envelopes
//! - [`report`] - Sales report bucketing
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation rules
//!
//! ## Example Usage
//!
//! ```rust
//! use meridian_core::money::Money;
//!
//! // 10% off $100.00
//! let subtotal = Money::from_cents(10_000);
//! assert_eq!(subtotal.percentage_of(1000).cents(), 1_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod coupon;
pub mod error;
pub mod money;
pub mod pagination;
pub mod report;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CouponRejection, ValidationError};
pub use money::Money;
pub use pagination::{Page, PageRequest};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default page number when the caller does not supply one.
pub const DEFAULT_PAGE: u32 = 1;

/// Default page size when the caller does not supply one.
pub const DEFAULT_PAGE_LIMIT: u32 = 10;

/// Largest page a list operation will return.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Maximum length of a coupon code.
pub const MAX_COUPON_CODE_LEN: usize = 100;

/// Maximum length of an invoice number.
pub const MAX_INVOICE_NUMBER_LEN: usize = 50;

/// Latest year a report date may name.
pub const MAX_REPORT_YEAR: i32 = 9999;

/// Basis points in 100%.
pub const BPS_PER_WHOLE: i64 = 10_000;
