//! # Entity Store
//!
//! The persistence seam the services are written against. [`Database`]
//! implements both traits by delegating to its repositories; tests substitute
//! their own implementations to simulate store failures.
//!
//! Every method is a single store call and an await point. Lookups return
//! `Option`; writes against a missing row return `DbError::NotFound`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use meridian_core::{
    Coupon, CouponChanges, CouponFilter, PageRequest, ReportFilter, Sale, SaleChanges,
    SaleCoupon, SaleFilter, SaleItem, SaleStatus,
};
use meridian_db::{Database, DbResult};

/// Coupon persistence.
#[async_trait]
pub trait CouponStore: Send + Sync {
    async fn insert_coupon(&self, coupon: &Coupon) -> DbResult<()>;

    async fn coupon_by_id(&self, id: &str) -> DbResult<Option<Coupon>>;

    /// Every coupon with `code`, restricted to `outlet_id` when given.
    async fn coupons_by_code(&self, code: &str, outlet_id: Option<&str>)
        -> DbResult<Vec<Coupon>>;

    async fn list_coupons(
        &self,
        page: &PageRequest,
        filter: &CouponFilter,
    ) -> DbResult<(Vec<Coupon>, i64)>;

    async fn coupons_by_outlet(&self, outlet_id: &str) -> DbResult<Vec<Coupon>>;

    async fn active_coupons(&self, outlet_id: &str, now: DateTime<Utc>) -> DbResult<Vec<Coupon>>;

    /// Writes only the supplied columns.
    async fn update_coupon(
        &self,
        id: &str,
        changes: &CouponChanges,
        now: DateTime<Utc>,
    ) -> DbResult<Coupon>;

    /// `used_count + 1` in one statement.
    async fn increment_coupon_use(&self, id: &str) -> DbResult<Coupon>;

    /// Increments only if redeemable at `now`; `None` when nothing changed.
    async fn redeem_coupon_if_eligible(
        &self,
        id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<Option<Coupon>>;

    async fn delete_coupon(&self, id: &str) -> DbResult<()>;
}

/// Sale, sale item and sale/coupon link persistence.
#[async_trait]
pub trait SaleStore: Send + Sync {
    async fn insert_sale(&self, sale: &Sale) -> DbResult<()>;

    async fn sale_by_id(&self, id: &str) -> DbResult<Option<Sale>>;

    async fn sale_by_invoice_number(&self, invoice_number: &str) -> DbResult<Option<Sale>>;

    async fn sale_exists(&self, id: &str) -> DbResult<bool>;

    async fn list_sales(&self, page: &PageRequest, filter: &SaleFilter)
        -> DbResult<(Vec<Sale>, i64)>;

    async fn sales_by_outlet(&self, outlet_id: &str) -> DbResult<Vec<Sale>>;

    async fn sales_by_date_range(
        &self,
        outlet_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<Vec<Sale>>;

    async fn sales_for_report(&self, filter: &ReportFilter) -> DbResult<Vec<Sale>>;

    async fn update_sale(
        &self,
        id: &str,
        changes: &SaleChanges,
        now: DateTime<Utc>,
    ) -> DbResult<Sale>;

    async fn update_sale_status(&self, id: &str, status: SaleStatus) -> DbResult<Sale>;

    async fn delete_sale(&self, id: &str) -> DbResult<()>;

    async fn insert_sale_item(&self, item: &SaleItem) -> DbResult<()>;

    async fn sale_item_by_id(&self, id: &str) -> DbResult<Option<SaleItem>>;

    async fn items_for_sale(&self, sale_id: &str) -> DbResult<Vec<SaleItem>>;

    async fn insert_sale_coupon(&self, link: &SaleCoupon) -> DbResult<()>;

    async fn sale_coupon_links(&self, sale_id: &str) -> DbResult<Vec<SaleCoupon>>;

    async fn coupon_sale_links(&self, coupon_id: &str) -> DbResult<Vec<SaleCoupon>>;

    /// Coupons applied to the sale, in attach order.
    async fn coupons_for_sale(&self, sale_id: &str) -> DbResult<Vec<Coupon>>;
}

#[async_trait]
impl CouponStore for Database {
    async fn insert_coupon(&self, coupon: &Coupon) -> DbResult<()> {
        self.coupons().insert(coupon).await
    }

    async fn coupon_by_id(&self, id: &str) -> DbResult<Option<Coupon>> {
        self.coupons().get_by_id(id).await
    }

    async fn coupons_by_code(
        &self,
        code: &str,
        outlet_id: Option<&str>,
    ) -> DbResult<Vec<Coupon>> {
        self.coupons().find_by_code(code, outlet_id).await
    }

    async fn list_coupons(
        &self,
        page: &PageRequest,
        filter: &CouponFilter,
    ) -> DbResult<(Vec<Coupon>, i64)> {
        self.coupons().list(page, filter).await
    }

    async fn coupons_by_outlet(&self, outlet_id: &str) -> DbResult<Vec<Coupon>> {
        self.coupons().list_by_outlet(outlet_id).await
    }

    async fn active_coupons(&self, outlet_id: &str, now: DateTime<Utc>) -> DbResult<Vec<Coupon>> {
        self.coupons().list_active(outlet_id, now).await
    }

    async fn update_coupon(
        &self,
        id: &str,
        changes: &CouponChanges,
        now: DateTime<Utc>,
    ) -> DbResult<Coupon> {
        self.coupons().update_fields(id, changes, now).await
    }

    async fn increment_coupon_use(&self, id: &str) -> DbResult<Coupon> {
        self.coupons().increment_used(id).await
    }

    async fn redeem_coupon_if_eligible(
        &self,
        id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<Option<Coupon>> {
        self.coupons().redeem_if_eligible(id, now).await
    }

    async fn delete_coupon(&self, id: &str) -> DbResult<()> {
        self.coupons().delete(id).await
    }
}

#[async_trait]
impl SaleStore for Database {
    async fn insert_sale(&self, sale: &Sale) -> DbResult<()> {
        self.sales().insert(sale).await
    }

    async fn sale_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        self.sales().get_by_id(id).await
    }

    async fn sale_by_invoice_number(&self, invoice_number: &str) -> DbResult<Option<Sale>> {
        self.sales().get_by_invoice_number(invoice_number).await
    }

    async fn sale_exists(&self, id: &str) -> DbResult<bool> {
        self.sales().exists(id).await
    }

    async fn list_sales(
        &self,
        page: &PageRequest,
        filter: &SaleFilter,
    ) -> DbResult<(Vec<Sale>, i64)> {
        self.sales().list(page, filter).await
    }

    async fn sales_by_outlet(&self, outlet_id: &str) -> DbResult<Vec<Sale>> {
        self.sales().list_by_outlet(outlet_id).await
    }

    async fn sales_by_date_range(
        &self,
        outlet_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<Vec<Sale>> {
        self.sales().list_by_date_range(outlet_id, from, to).await
    }

    async fn sales_for_report(&self, filter: &ReportFilter) -> DbResult<Vec<Sale>> {
        self.sales().list_for_report(filter).await
    }

    async fn update_sale(
        &self,
        id: &str,
        changes: &SaleChanges,
        now: DateTime<Utc>,
    ) -> DbResult<Sale> {
        self.sales().update_fields(id, changes, now).await
    }

    async fn update_sale_status(&self, id: &str, status: SaleStatus) -> DbResult<Sale> {
        self.sales().update_status(id, status).await
    }

    async fn delete_sale(&self, id: &str) -> DbResult<()> {
        self.sales().delete(id).await
    }

    async fn insert_sale_item(&self, item: &SaleItem) -> DbResult<()> {
        self.sale_items().insert(item).await
    }

    async fn sale_item_by_id(&self, id: &str) -> DbResult<Option<SaleItem>> {
        self.sale_items().get_by_id(id).await
    }

    async fn items_for_sale(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        self.sale_items().list_for_sale(sale_id).await
    }

    async fn insert_sale_coupon(&self, link: &SaleCoupon) -> DbResult<()> {
        self.sale_coupons().insert(link).await
    }

    async fn sale_coupon_links(&self, sale_id: &str) -> DbResult<Vec<SaleCoupon>> {
        self.sale_coupons().list_for_sale(sale_id).await
    }

    async fn coupon_sale_links(&self, coupon_id: &str) -> DbResult<Vec<SaleCoupon>> {
        self.sale_coupons().list_for_coupon(coupon_id).await
    }

    async fn coupons_for_sale(&self, sale_id: &str) -> DbResult<Vec<Coupon>> {
        self.sale_coupons().coupons_for_sale(sale_id).await
    }
}
