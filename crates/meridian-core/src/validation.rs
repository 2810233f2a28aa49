//! # Validation Module
//!
//! Input validation for coupon and sale requests.
//!
//! ## Where Validation Happens
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Request shape (serde)                                        │
//! │  └── Types, required keys                                              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Ids are UUIDs, codes/invoices present and bounded                 │
//! │  ├── Money non-negative, quantities and max_uses >= 1                  │
//! │  ├── Enum strings parse (discount_type, status, group_by)              │
//! │  └── end_date >= start_date                                            │
//! │           │        (nothing has touched the store yet)                 │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── UNIQUE(outlet_id, code), UNIQUE(invoice_number)                   │
//! │  ├── UNIQUE(sale_id, coupon_id)                                        │
//! │  └── CHECK constraints                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use meridian_core::validation::{validate_coupon_code, validate_quantity};
//!
//! assert!(validate_coupon_code("SUMMER10").is_ok());
//! assert!(validate_quantity(0).is_err());
//! ```

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::types::{
    Coupon, CouponChanges, CouponPatch, DiscountType, NewCoupon, NewSale, NewSaleItem,
    ReportFilter, ReportGroupBy, ReportQuery, Sale, SaleChanges, SaleItem, SalePatch, SaleStatus,
};
use crate::{BPS_PER_WHOLE, MAX_COUPON_CODE_LEN, MAX_INVOICE_NUMBER_LEN, MAX_REPORT_YEAR};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest free-text search accepted by list operations.
pub const MAX_SEARCH_LEN: usize = 100;

// =============================================================================
// Identifier Validators
// =============================================================================

/// Validates that `value` is a UUID in lowercase hyphenated form, the only
/// form ids are stored in.
///
/// ```rust
/// use meridian_core::validation::validate_uuid;
///
/// assert!(validate_uuid("outlet_id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("outlet_id", "550e8400e29b41d4a716446655440000").is_err());
/// assert!(validate_uuid("outlet_id", "not-a-uuid").is_err());
/// ```
pub fn validate_uuid(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    let canonical = Uuid::parse_str(value)
        .map(|id| id.hyphenated().to_string() == value)
        .unwrap_or(false);
    if !canonical {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must be a lowercase hyphenated UUID".to_string(),
        });
    }

    Ok(())
}

/// Like [`validate_uuid`] but an absent value passes.
pub fn validate_optional_uuid(field: &str, value: Option<&str>) -> ValidationResult<()> {
    match value {
        Some(v) => validate_uuid(field, v),
        None => Ok(()),
    }
}

// =============================================================================
// String Validators
// =============================================================================

fn validate_bounded(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Coupon code: required, at most 100 characters.
pub fn validate_coupon_code(code: &str) -> ValidationResult<()> {
    validate_bounded("code", code, MAX_COUPON_CODE_LEN)
}

/// Invoice number: required, at most 50 characters.
pub fn validate_invoice_number(invoice_number: &str) -> ValidationResult<()> {
    validate_bounded("invoice_number", invoice_number, MAX_INVOICE_NUMBER_LEN)
}

/// Validates a search query.
///
/// ## Returns
/// The trimmed query, or `None` when it is blank.
pub fn validate_search_query(query: &str) -> ValidationResult<Option<String>> {
    let query = query.trim();

    if query.chars().count() > MAX_SEARCH_LEN {
        return Err(ValidationError::TooLong {
            field: "search".to_string(),
            max: MAX_SEARCH_LEN,
        });
    }

    Ok(if query.is_empty() {
        None
    } else {
        Some(query.to_string())
    })
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Monetary amounts (and coupon values) must be zero or more.
pub fn validate_non_negative(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Coupon value: basis points up to 100% for percentage coupons, any
/// non-negative amount of cents for fixed ones.
pub fn validate_discount_value(discount_type: DiscountType, value: i64) -> ValidationResult<()> {
    validate_non_negative("discount_value", value)?;
    if discount_type == DiscountType::Percentage && value > BPS_PER_WHOLE {
        return Err(ValidationError::OutOfRange {
            field: "discount_value".to_string(),
            min: 0,
            max: BPS_PER_WHOLE,
        });
    }
    Ok(())
}

/// Line quantity: at least 1.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty < 1 {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Coupon usage ceiling: at least 1.
pub fn validate_max_uses(max_uses: i64) -> ValidationResult<()> {
    if max_uses < 1 {
        return Err(ValidationError::OutOfRange {
            field: "max_uses".to_string(),
            min: 1,
            max: i64::MAX,
        });
    }
    Ok(())
}

// =============================================================================
// Date Validators
// =============================================================================

/// `end` may equal `start` but not precede it.
pub fn validate_date_window(start: DateTime<Utc>, end: DateTime<Utc>) -> ValidationResult<()> {
    if end < start {
        return Err(ValidationError::WindowInverted {
            field: "end_date".to_string(),
        });
    }
    Ok(())
}

/// Parses a `YYYY-MM-DD` report date with a four-digit year.
pub fn parse_report_date(field: &str, value: &str) -> ValidationResult<NaiveDate> {
    let date = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must be a date in YYYY-MM-DD format".to_string(),
        }
    })?;

    if !(1..=MAX_REPORT_YEAR).contains(&date.year()) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: i64::from(MAX_REPORT_YEAR),
        });
    }
    Ok(date)
}

/// `date_to` may equal `date_from` but not precede it.
pub fn validate_date_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> ValidationResult<()> {
    if let (Some(from), Some(to)) = (from, to) {
        if to < from {
            return Err(ValidationError::WindowInverted {
                field: "date_to".to_string(),
            });
        }
    }
    Ok(())
}

// =============================================================================
// Coupon Requests
// =============================================================================

impl NewCoupon {
    /// Checks every field, in declaration order.
    pub fn validate(&self) -> ValidationResult<DiscountType> {
        validate_uuid("outlet_id", &self.outlet_id)?;
        validate_coupon_code(&self.code)?;
        let discount_type: DiscountType = self.discount_type.parse()?;
        validate_discount_value(discount_type, self.discount_value)?;
        validate_max_uses(self.max_uses)?;
        validate_date_window(self.start_date, self.end_date)?;
        Ok(discount_type)
    }

    /// Validates and builds the record to insert: fresh id, `used_count` 0,
    /// `is_active` defaulting to true.
    pub fn into_coupon(self, now: DateTime<Utc>) -> ValidationResult<Coupon> {
        let discount_type = self.validate()?;

        Ok(Coupon {
            id: Uuid::new_v4().to_string(),
            outlet_id: self.outlet_id,
            code: self.code,
            description: self.description,
            discount_type,
            discount_value: self.discount_value,
            max_uses: self.max_uses,
            used_count: 0,
            start_date: self.start_date,
            end_date: self.end_date,
            is_active: self.is_active.unwrap_or(true),
            created_at: now,
            updated_at: now,
        })
    }
}

impl CouponPatch {
    /// Validates the supplied fields only.
    ///
    /// When both dates are present their order is checked here; when only
    /// one is, the caller checks it against the stored record
    /// (see [`crate::coupon::validate_changes`]).
    pub fn validate(&self) -> ValidationResult<CouponChanges> {
        if let Some(code) = &self.code {
            validate_coupon_code(code)?;
        }
        let discount_type = self
            .discount_type
            .as_deref()
            .map(str::parse::<DiscountType>)
            .transpose()?;
        match (discount_type, self.discount_value) {
            (Some(discount_type), Some(value)) => validate_discount_value(discount_type, value)?,
            (None, Some(value)) => validate_non_negative("discount_value", value)?,
            _ => {}
        }
        if let Some(max_uses) = self.max_uses {
            validate_max_uses(max_uses)?;
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            validate_date_window(start, end)?;
        }

        Ok(CouponChanges {
            code: self.code.clone(),
            description: self.description.clone(),
            discount_type,
            discount_value: self.discount_value,
            max_uses: self.max_uses,
            start_date: self.start_date,
            end_date: self.end_date,
            is_active: self.is_active,
        })
    }
}

// =============================================================================
// Sale Requests
// =============================================================================

impl NewSale {
    pub fn validate(&self) -> ValidationResult<SaleStatus> {
        validate_uuid("outlet_id", &self.outlet_id)?;
        validate_uuid("staff_id", &self.staff_id)?;
        validate_uuid("table_id", &self.table_id)?;
        validate_optional_uuid("customer_id", self.customer_id.as_deref())?;
        validate_optional_uuid("payment_method_id", self.payment_method_id.as_deref())?;
        validate_invoice_number(&self.invoice_number)?;
        validate_non_negative("total", self.total_cents)?;
        validate_non_negative("discount", self.discount_cents)?;
        validate_non_negative("tax", self.tax_cents)?;
        validate_non_negative("grand_total", self.grand_total_cents)?;
        self.status.parse()
    }

    /// Validates and builds the record to insert. Totals are copied as given.
    pub fn into_sale(self, now: DateTime<Utc>) -> ValidationResult<Sale> {
        let status = self.validate()?;

        Ok(Sale {
            id: Uuid::new_v4().to_string(),
            outlet_id: self.outlet_id,
            staff_id: self.staff_id,
            customer_id: self.customer_id,
            payment_method_id: self.payment_method_id,
            table_id: self.table_id,
            invoice_number: self.invoice_number,
            total_cents: self.total_cents,
            discount_cents: self.discount_cents,
            tax_cents: self.tax_cents,
            grand_total_cents: self.grand_total_cents,
            status,
            sale_date: self.sale_date.unwrap_or(now),
            note: self.note,
            created_at: now,
            updated_at: now,
        })
    }
}

impl SalePatch {
    pub fn validate(&self) -> ValidationResult<SaleChanges> {
        validate_optional_uuid("outlet_id", self.outlet_id.as_deref())?;
        validate_optional_uuid("staff_id", self.staff_id.as_deref())?;
        validate_optional_uuid("table_id", self.table_id.as_deref())?;
        validate_optional_uuid("customer_id", self.customer_id.as_deref())?;
        validate_optional_uuid("payment_method_id", self.payment_method_id.as_deref())?;
        if let Some(invoice_number) = &self.invoice_number {
            validate_invoice_number(invoice_number)?;
        }
        for (field, value) in [
            ("total", self.total_cents),
            ("discount", self.discount_cents),
            ("tax", self.tax_cents),
            ("grand_total", self.grand_total_cents),
        ] {
            if let Some(v) = value {
                validate_non_negative(field, v)?;
            }
        }
        let status = self
            .status
            .as_deref()
            .map(str::parse::<SaleStatus>)
            .transpose()?;

        Ok(SaleChanges {
            outlet_id: self.outlet_id.clone(),
            staff_id: self.staff_id.clone(),
            customer_id: self.customer_id.clone(),
            payment_method_id: self.payment_method_id.clone(),
            table_id: self.table_id.clone(),
            invoice_number: self.invoice_number.clone(),
            total_cents: self.total_cents,
            discount_cents: self.discount_cents,
            tax_cents: self.tax_cents,
            grand_total_cents: self.grand_total_cents,
            status,
            sale_date: self.sale_date,
            note: self.note.clone(),
        })
    }
}

impl NewSaleItem {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_uuid("product_id", &self.product_id)?;
        validate_quantity(self.quantity)?;
        validate_non_negative("price", self.price_cents)?;
        validate_non_negative("discount", self.discount_cents)?;
        validate_non_negative("total", self.total_cents)?;
        Ok(())
    }

    /// Validates and builds the line for `sale_id`. The total is stored as given.
    pub fn into_item(self, sale_id: &str, now: DateTime<Utc>) -> ValidationResult<SaleItem> {
        validate_uuid("sale_id", sale_id)?;
        self.validate()?;

        Ok(SaleItem {
            id: Uuid::new_v4().to_string(),
            sale_id: sale_id.to_string(),
            product_id: self.product_id,
            quantity: self.quantity,
            price_cents: self.price_cents,
            discount_cents: self.discount_cents,
            total_cents: self.total_cents,
            created_at: now,
            updated_at: now,
        })
    }
}

// =============================================================================
// Report Requests
// =============================================================================

impl ReportQuery {
    pub fn validate(&self) -> ValidationResult<ReportFilter> {
        validate_optional_uuid("outlet_id", self.outlet_id.as_deref())?;
        let date_from = self
            .date_from
            .as_deref()
            .map(|d| parse_report_date("date_from", d))
            .transpose()?;
        let date_to = self
            .date_to
            .as_deref()
            .map(|d| parse_report_date("date_to", d))
            .transpose()?;
        validate_date_range(date_from, date_to)?;
        let group_by = self
            .group_by
            .as_deref()
            .map(str::parse::<ReportGroupBy>)
            .transpose()?;

        Ok(ReportFilter {
            outlet_id: self.outlet_id.clone(),
            date_from,
            date_to,
            group_by,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
