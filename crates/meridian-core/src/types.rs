//! # Domain Types
//!
//! Records and request shapes for the coupon and sale aggregates.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Coupon      │   │      Sale       │   │    SaleItem     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  outlet_id      │   │  invoice_number │   │  sale_id        │       │
//! │  │  code           │   │  status         │   │  product_id     │       │
//! │  │  used_count     │   │  grand_total    │   │  total_cents    │       │
//! │  └────────▲────────┘   └────────▲────────┘   └─────────────────┘       │
//! │           │      ┌──────────────┴───┐                                   │
//! │           └──────┤   SaleCoupon     │  (sale_id, coupon_id) unique      │
//! │                  └──────────────────┘                                   │
//! │                                                                         │
//! │  Requests (raw, validated before use)    Change sets (validated)       │
//! │  NewCoupon, CouponPatch                  CouponChanges                 │
//! │  NewSale, SalePatch, NewSaleItem         SaleChanges                   │
//! │  ReportQuery                             ReportFilter                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Relations are by id only. A `SaleDetail` is assembled by looking the
//! children up, never by holding pointers between records.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

fn not_allowed(field: &str, allowed: &[&str]) -> ValidationError {
    ValidationError::NotAllowed {
        field: field.to_string(),
        allowed: allowed.iter().map(|s| s.to_string()).collect(),
    }
}

// =============================================================================
// Discount Type
// =============================================================================

/// How a coupon's `discount_value` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    /// Basis points of the subtotal (1000 = 10%).
    Percentage,
    /// Flat amount in cents.
    Fixed,
}

impl DiscountType {
    pub const ALLOWED: [&'static str; 2] = ["percentage", "fixed"];

    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::Percentage => "percentage",
            DiscountType::Fixed => "fixed",
        }
    }
}

impl FromStr for DiscountType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage" => Ok(DiscountType::Percentage),
            "fixed" => Ok(DiscountType::Fixed),
            _ => Err(not_allowed("discount_type", &Self::ALLOWED)),
        }
    }
}

impl fmt::Display for DiscountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Sale Status
// =============================================================================

/// The status of a sale. Any status may follow any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    Paid,
    Unpaid,
    Void,
    Hold,
}

impl SaleStatus {
    pub const ALLOWED: [&'static str; 4] = ["paid", "unpaid", "void", "hold"];

    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Paid => "paid",
            SaleStatus::Unpaid => "unpaid",
            SaleStatus::Void => "void",
            SaleStatus::Hold => "hold",
        }
    }
}

impl FromStr for SaleStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "paid" => Ok(SaleStatus::Paid),
            "unpaid" => Ok(SaleStatus::Unpaid),
            "void" => Ok(SaleStatus::Void),
            "hold" => Ok(SaleStatus::Hold),
            _ => Err(not_allowed("status", &Self::ALLOWED)),
        }
    }
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Report Grouping
// =============================================================================

/// Bucket width for sales reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum ReportGroupBy {
    Day,
    Month,
    Year,
}

impl ReportGroupBy {
    pub const ALLOWED: [&'static str; 3] = ["day", "month", "year"];
}

impl FromStr for ReportGroupBy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(ReportGroupBy::Day),
            "month" => Ok(ReportGroupBy::Month),
            "year" => Ok(ReportGroupBy::Year),
            _ => Err(not_allowed("group_by", &Self::ALLOWED)),
        }
    }
}

// =============================================================================
// Coupon
// =============================================================================

/// A discount coupon owned by one outlet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Coupon {
    pub id: String,
    pub outlet_id: String,
    /// Unique within the outlet.
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    /// Basis points for `percentage`, cents for `fixed`.
    pub discount_value: i64,
    pub max_uses: i64,
    /// Incremented once per redemption, never decremented.
    pub used_count: i64,
    #[ts(as = "String")]
    pub start_date: DateTime<Utc>,
    #[ts(as = "String")]
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Coupon {
    /// The discount this coupon grants on `subtotal`, never more than the
    /// subtotal itself.
    ///
    /// ```rust
    /// # use chrono::Utc;
    /// # use meridian_core::{Coupon, DiscountType, Money};
    /// # let now = Utc::now();
    /// let coupon = Coupon {
    ///     id: "c1".into(), outlet_id: "o1".into(), code: "SUMMER10".into(),
    ///     description: None, discount_type: DiscountType::Percentage,
    ///     discount_value: 1_000, max_uses: 5, used_count: 0,
    ///     start_date: now, end_date: now, is_active: true,
    ///     created_at: now, updated_at: now,
    /// };
    /// assert_eq!(coupon.discount_for(Money::from_cents(10_000)).cents(), 1_000);
    /// ```
    pub fn discount_for(&self, subtotal: Money) -> Money {
        let raw = match self.discount_type {
            DiscountType::Percentage => subtotal.percentage_of(self.discount_value),
            DiscountType::Fixed => Money::from_cents(self.discount_value),
        };
        raw.clamp_to(subtotal)
    }

    /// Redemptions left before the coupon is exhausted.
    #[inline]
    pub fn remaining_uses(&self) -> i64 {
        (self.max_uses - self.used_count).max(0)
    }
}

/// Request to create a coupon.
///
/// `discount_type` stays a string here so an unknown value surfaces as a
/// `ValidationError` naming the field.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCoupon {
    pub outlet_id: String,
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
    pub discount_type: String,
    pub discount_value: i64,
    pub max_uses: i64,
    #[ts(as = "String")]
    pub start_date: DateTime<Utc>,
    #[ts(as = "String")]
    pub end_date: DateTime<Utc>,
    /// Defaults to `true`.
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Sparse coupon update. `None` leaves the stored value unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct CouponPatch {
    pub code: Option<String>,
    pub description: Option<String>,
    pub discount_type: Option<String>,
    pub discount_value: Option<i64>,
    pub max_uses: Option<i64>,
    #[ts(as = "Option<String>")]
    pub start_date: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub end_date: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

impl CouponPatch {
    pub fn is_empty(&self) -> bool {
        self.code.is_none()
            && self.description.is_none()
            && self.discount_type.is_none()
            && self.discount_value.is_none()
            && self.max_uses.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && self.is_active.is_none()
    }
}

/// A validated [`CouponPatch`], ready for the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CouponChanges {
    pub code: Option<String>,
    pub description: Option<String>,
    pub discount_type: Option<DiscountType>,
    pub discount_value: Option<i64>,
    pub max_uses: Option<i64>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

impl CouponChanges {
    pub fn is_empty(&self) -> bool {
        *self == CouponChanges::default()
    }
}

/// Narrows a coupon listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct CouponFilter {
    pub outlet_id: Option<String>,
}

// =============================================================================
// Sale
// =============================================================================

/// A sale header. Monetary fields are caller-computed and stored as given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub outlet_id: String,
    pub staff_id: String,
    pub customer_id: Option<String>,
    pub payment_method_id: Option<String>,
    pub table_id: String,
    /// Unique across all outlets.
    pub invoice_number: String,
    /// Sum of line items before discount and tax.
    pub total_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    /// `total - discount + tax`, as supplied by the caller.
    pub grand_total_cents: i64,
    pub status: SaleStatus,
    #[ts(as = "String")]
    pub sale_date: DateTime<Utc>,
    pub note: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn grand_total(&self) -> Money {
        Money::from_cents(self.grand_total_cents)
    }

    /// Whether `grand_total == total - discount + tax`. Informational only;
    /// nothing rejects a sale for failing this.
    pub fn totals_balance(&self) -> bool {
        self.total_cents - self.discount_cents + self.tax_cents == self.grand_total_cents
    }
}

/// Request to create a sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewSale {
    pub outlet_id: String,
    pub staff_id: String,
    pub table_id: String,
    pub invoice_number: String,
    pub total_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub grand_total_cents: i64,
    pub status: String,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub payment_method_id: Option<String>,
    /// Defaults to the creation time.
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub sale_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Sparse sale update. `None` leaves the stored value unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct SalePatch {
    pub outlet_id: Option<String>,
    pub staff_id: Option<String>,
    pub customer_id: Option<String>,
    pub payment_method_id: Option<String>,
    pub table_id: Option<String>,
    pub invoice_number: Option<String>,
    pub total_cents: Option<i64>,
    pub discount_cents: Option<i64>,
    pub tax_cents: Option<i64>,
    pub grand_total_cents: Option<i64>,
    pub status: Option<String>,
    #[ts(as = "Option<String>")]
    pub sale_date: Option<DateTime<Utc>>,
    pub note: Option<String>,
}

/// A validated [`SalePatch`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaleChanges {
    pub outlet_id: Option<String>,
    pub staff_id: Option<String>,
    pub customer_id: Option<String>,
    pub payment_method_id: Option<String>,
    pub table_id: Option<String>,
    pub invoice_number: Option<String>,
    pub total_cents: Option<i64>,
    pub discount_cents: Option<i64>,
    pub tax_cents: Option<i64>,
    pub grand_total_cents: Option<i64>,
    pub status: Option<SaleStatus>,
    pub sale_date: Option<DateTime<Utc>>,
    pub note: Option<String>,
}

impl SaleChanges {
    pub fn is_empty(&self) -> bool {
        *self == SaleChanges::default()
    }
}

/// Narrows a sale listing. Dates are inclusive calendar days (UTC).
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct SaleFilter {
    pub outlet_id: Option<String>,
    pub customer_id: Option<String>,
    pub payment_method_id: Option<String>,
    pub status: Option<SaleStatus>,
    #[ts(as = "Option<String>")]
    pub date_from: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub date_to: Option<NaiveDate>,
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line on a sale. `total_cents` is supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    pub quantity: i64,
    /// Unit price.
    pub price_cents: i64,
    pub discount_cents: i64,
    /// `quantity * price - discount`, as supplied by the caller.
    pub total_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl SaleItem {
    /// What the line should total given its quantity, price, and discount.
    pub fn expected_total(&self) -> Money {
        Money::from_cents(self.price_cents).multiply_quantity(self.quantity)
            - Money::from_cents(self.discount_cents)
    }
}

/// Request to append a line to a sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewSaleItem {
    pub product_id: String,
    pub quantity: i64,
    pub price_cents: i64,
    #[serde(default)]
    pub discount_cents: i64,
    pub total_cents: i64,
}

// =============================================================================
// Sale Coupon
// =============================================================================

/// Junction row: a coupon applied to a sale. One per (sale, coupon) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleCoupon {
    pub id: String,
    pub sale_id: String,
    pub coupon_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Sale Detail
// =============================================================================

/// A sale with its items and applied coupons resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleDetail {
    #[serde(flatten)]
    pub sale: Sale,
    pub items: Vec<SaleItem>,
    pub coupons: Vec<Coupon>,
}

// =============================================================================
// Reports
// =============================================================================

/// Raw report parameters. Dates are `YYYY-MM-DD`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct ReportQuery {
    pub outlet_id: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub group_by: Option<String>,
}

/// A validated [`ReportQuery`]. `date_to` covers that whole day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFilter {
    pub outlet_id: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub group_by: Option<ReportGroupBy>,
}

/// Aggregates for one day, month, or year.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReportBucket {
    /// `YYYY-MM-DD`, `YYYY-MM`, or `YYYY`.
    pub key: String,
    /// Sales in the bucket, void ones included.
    pub sale_count: i64,
    pub void_count: i64,
    // Sums below exclude void sales.
    pub total_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub grand_total_cents: i64,
}

/// Report result: the matching sales plus per-bucket aggregates when a
/// grouping was requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalesReport {
    pub group_by: Option<ReportGroupBy>,
    pub sales: Vec<Sale>,
    pub buckets: Vec<ReportBucket>,
}

// =============================================================================
// Unit Tests
// =============================================================================
