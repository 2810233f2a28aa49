//! # Sale Service
//!
//! Builds and reads the sale aggregate: the sale header, its lines, and the
//! coupons applied to it.
//!
//! ```text
//!              ┌──────────── Sale (aggregate root) ────────────┐
//!              │                                               │
//!   add_item ──┼──► SaleItem*         attach_coupon ──► SaleCoupon* ──► Coupon
//!              │                                               │
//!   get_by_id / get_by_invoice_number → SaleDetail { sale, items, coupons }
//!              └───────────────────────────────────────────────┘
//! ```
//!
//! Totals are taken as given; nothing here recomputes them from the lines.
//! Lines and coupon links are append-only and go away with their sale.

use std::time::Duration;

use chrono::{NaiveDate, Utc};
use meridian_core::report::summarize;
use meridian_core::validation::{
    validate_date_range, validate_invoice_number, validate_optional_uuid, validate_uuid,
};
use meridian_core::{
    Coupon, NewSale, NewSaleItem, Page, PageRequest, ReportQuery, Sale, SaleCoupon, SaleDetail,
    SaleFilter, SaleItem, SalePatch, SaleStatus, SalesReport,
};
use tracing::{debug, info};
use uuid::Uuid;

use super::guarded;
use crate::error::{ServiceError, ServiceResult};
use crate::store::{CouponStore, SaleStore};

/// Sale Aggregate Builder.
#[derive(Debug, Clone)]
pub struct SaleService<S> {
    store: S,
    timeout: Duration,
}

impl<S: SaleStore + CouponStore> SaleService<S> {
    pub fn new(store: S, timeout: Duration) -> Self {
        SaleService { store, timeout }
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Records a sale. `grand_total` is stored exactly as supplied.
    ///
    /// ## Errors
    /// * `Validation` - malformed ids, negative money fields, unknown status,
    ///   missing or oversized invoice number
    /// * `Conflict` - the invoice number is already used
    pub async fn create(&self, request: NewSale) -> ServiceResult<Sale> {
        let sale = request.into_sale(Utc::now())?;

        guarded(self.timeout, "create_sale", &sale.id, self.store.insert_sale(&sale)).await?;

        info!(
            id = %sale.id,
            invoice_number = %sale.invoice_number,
            grand_total = %sale.grand_total(),
            balanced = sale.totals_balance(),
            "Sale created"
        );
        Ok(sale)
    }

    /// Links a coupon to a sale. Does not redeem it.
    ///
    /// ## Errors
    /// * `NotFound` - the sale or the coupon does not exist
    /// * `Conflict` - the coupon is already attached to this sale
    pub async fn attach_coupon(&self, sale_id: &str, coupon_id: &str) -> ServiceResult<SaleCoupon> {
        validate_uuid("sale_id", sale_id)?;
        validate_uuid("coupon_id", coupon_id)?;

        self.ensure_sale(sale_id).await?;
        guarded(
            self.timeout,
            "get_coupon",
            coupon_id,
            self.store.coupon_by_id(coupon_id),
        )
        .await?
        .ok_or_else(|| ServiceError::not_found("Coupon", coupon_id))?;

        let link = SaleCoupon {
            id: Uuid::new_v4().to_string(),
            sale_id: sale_id.to_string(),
            coupon_id: coupon_id.to_string(),
            created_at: Utc::now(),
        };
        guarded(
            self.timeout,
            "attach_coupon",
            sale_id,
            self.store.insert_sale_coupon(&link),
        )
        .await?;

        info!(sale_id = %sale_id, coupon_id = %coupon_id, "Coupon attached to sale");
        Ok(link)
    }

    /// Appends a line. The line total is stored as given.
    pub async fn add_item(&self, sale_id: &str, request: NewSaleItem) -> ServiceResult<SaleItem> {
        let item = request.into_item(sale_id, Utc::now())?;

        self.ensure_sale(sale_id).await?;
        guarded(
            self.timeout,
            "add_sale_item",
            sale_id,
            self.store.insert_sale_item(&item),
        )
        .await?;

        info!(
            sale_id = %sale_id,
            item_id = %item.id,
            product_id = %item.product_id,
            quantity = item.quantity,
            "Sale item added"
        );
        Ok(item)
    }

    /// Overwrites the status. Any status may follow any other.
    pub async fn update_status(&self, sale_id: &str, status: &str) -> ServiceResult<Sale> {
        validate_uuid("sale_id", sale_id)?;
        let status: SaleStatus = status.parse()?;

        let sale = guarded(
            self.timeout,
            "update_sale_status",
            sale_id,
            self.store.update_sale_status(sale_id, status),
        )
        .await?;

        info!(sale_id = %sale_id, status = %status, "Sale status updated");
        Ok(sale)
    }

    /// Applies the supplied fields and leaves the rest alone. An empty patch
    /// returns the stored sale without writing.
    pub async fn update(&self, sale_id: &str, patch: &SalePatch) -> ServiceResult<Sale> {
        validate_uuid("sale_id", sale_id)?;
        let changes = patch.validate()?;

        if changes.is_empty() {
            debug!(sale_id = %sale_id, "Empty sale patch; nothing to write");
            return self.fetch_sale(sale_id).await;
        }

        let sale = guarded(
            self.timeout,
            "update_sale",
            sale_id,
            self.store.update_sale(sale_id, &changes, Utc::now()),
        )
        .await?;

        info!(sale_id = %sale_id, "Sale updated");
        Ok(sale)
    }

    /// Hard delete. Lines and coupon links go with the sale; coupon usage
    /// counts are left as they are.
    pub async fn delete(&self, sale_id: &str) -> ServiceResult<()> {
        validate_uuid("sale_id", sale_id)?;
        guarded(self.timeout, "delete_sale", sale_id, self.store.delete_sale(sale_id)).await?;
        info!(sale_id = %sale_id, "Sale deleted");
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// The sale with its lines and applied coupons.
    pub async fn get_by_id(&self, sale_id: &str) -> ServiceResult<SaleDetail> {
        validate_uuid("sale_id", sale_id)?;
        let sale = self.fetch_sale(sale_id).await?;
        self.load_detail(sale).await
    }

    pub async fn get_by_invoice_number(&self, invoice_number: &str) -> ServiceResult<SaleDetail> {
        validate_invoice_number(invoice_number)?;

        let sale = guarded(
            self.timeout,
            "get_sale_by_invoice_number",
            invoice_number,
            self.store.sale_by_invoice_number(invoice_number),
        )
        .await?
        .ok_or_else(|| ServiceError::not_found("Sale", invoice_number))?;

        self.load_detail(sale).await
    }

    /// One page of sales, newest first.
    pub async fn list(&self, page: &PageRequest, filter: &SaleFilter) -> ServiceResult<Page<Sale>> {
        let page = page.validate()?;
        validate_optional_uuid("outlet_id", filter.outlet_id.as_deref())?;
        validate_optional_uuid("customer_id", filter.customer_id.as_deref())?;
        validate_optional_uuid("payment_method_id", filter.payment_method_id.as_deref())?;
        validate_date_range(filter.date_from, filter.date_to)?;

        let (sales, total) = guarded(
            self.timeout,
            "list_sales",
            filter.outlet_id.as_deref().unwrap_or("*"),
            self.store.list_sales(&page, filter),
        )
        .await?;

        Ok(Page::new(sales, &page, total))
    }

    pub async fn list_by_outlet(&self, outlet_id: &str) -> ServiceResult<Vec<Sale>> {
        validate_uuid("outlet_id", outlet_id)?;
        guarded(
            self.timeout,
            "list_sales_by_outlet",
            outlet_id,
            self.store.sales_by_outlet(outlet_id),
        )
        .await
    }

    /// Sales of the outlet from `from` through the whole of `to`.
    pub async fn list_by_date_range(
        &self,
        outlet_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ServiceResult<Vec<Sale>> {
        validate_uuid("outlet_id", outlet_id)?;
        validate_date_range(Some(from), Some(to))?;
        guarded(
            self.timeout,
            "list_sales_by_date_range",
            outlet_id,
            self.store.sales_by_date_range(outlet_id, from, to),
        )
        .await
    }

    pub async fn get_items(&self, sale_id: &str) -> ServiceResult<Vec<SaleItem>> {
        validate_uuid("sale_id", sale_id)?;
        self.ensure_sale(sale_id).await?;
        guarded(
            self.timeout,
            "list_sale_items",
            sale_id,
            self.store.items_for_sale(sale_id),
        )
        .await
    }

    pub async fn get_item(&self, item_id: &str) -> ServiceResult<SaleItem> {
        validate_uuid("item_id", item_id)?;
        guarded(
            self.timeout,
            "get_sale_item",
            item_id,
            self.store.sale_item_by_id(item_id),
        )
        .await?
        .ok_or_else(|| ServiceError::not_found("SaleItem", item_id))
    }

    pub async fn get_applied_coupons(&self, sale_id: &str) -> ServiceResult<Vec<Coupon>> {
        validate_uuid("sale_id", sale_id)?;
        self.ensure_sale(sale_id).await?;
        guarded(
            self.timeout,
            "list_sale_coupons",
            sale_id,
            self.store.coupons_for_sale(sale_id),
        )
        .await
    }

    /// Links to every sale the coupon was applied to.
    pub async fn sales_for_coupon(&self, coupon_id: &str) -> ServiceResult<Vec<SaleCoupon>> {
        validate_uuid("coupon_id", coupon_id)?;
        guarded(
            self.timeout,
            "list_coupon_sales",
            coupon_id,
            self.store.coupon_sale_links(coupon_id),
        )
        .await
    }

    /// Matching sales plus, when `group_by` is set, per-period totals.
    ///
    /// `date_to` includes that whole day. Void sales are listed and counted
    /// but left out of the bucket sums.
    pub async fn report(&self, query: &ReportQuery) -> ServiceResult<SalesReport> {
        let filter = query.validate()?;

        let sales = guarded(
            self.timeout,
            "sales_report",
            filter.outlet_id.as_deref().unwrap_or("*"),
            self.store.sales_for_report(&filter),
        )
        .await?;

        let buckets = filter
            .group_by
            .map(|group_by| summarize(&sales, group_by))
            .transpose()?
            .unwrap_or_default();

        debug!(
            sales = sales.len(),
            buckets = buckets.len(),
            group_by = ?filter.group_by,
            "Sales report built"
        );
        Ok(SalesReport {
            group_by: filter.group_by,
            sales,
            buckets,
        })
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn fetch_sale(&self, sale_id: &str) -> ServiceResult<Sale> {
        guarded(self.timeout, "get_sale", sale_id, self.store.sale_by_id(sale_id))
            .await?
            .ok_or_else(|| ServiceError::not_found("Sale", sale_id))
    }

    async fn ensure_sale(&self, sale_id: &str) -> ServiceResult<()> {
        let exists = guarded(
            self.timeout,
            "sale_exists",
            sale_id,
            self.store.sale_exists(sale_id),
        )
        .await?;

        if exists {
            Ok(())
        } else {
            Err(ServiceError::not_found("Sale", sale_id))
        }
    }

    async fn load_detail(&self, sale: Sale) -> ServiceResult<SaleDetail> {
        let items = guarded(
            self.timeout,
            "list_sale_items",
            &sale.id,
            self.store.items_for_sale(&sale.id),
        )
        .await?;
        let coupons = guarded(
            self.timeout,
            "list_sale_coupons",
            &sale.id,
            self.store.coupons_for_sale(&sale.id),
        )
        .await?;

        Ok(SaleDetail {
            sale,
            items,
            coupons,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::doubles::BrokenStore;
    use crate::services::CouponService;
    use chrono::{DateTime, Duration as ChronoDuration, TimeZone};
    use meridian_core::{NewCoupon, ReportGroupBy};
    use meridian_db::{Database, DbConfig};

    const TIMEOUT: Duration = Duration::from_secs(5);

    struct Fixture {
        sales: SaleService<Database>,
        coupons: CouponService<Database>,
        outlet_id: String,
    }

    async fn fixture() -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        Fixture {
            sales: SaleService::new(db.clone(), TIMEOUT),
            coupons: CouponService::new(db, TIMEOUT),
            outlet_id: id(),
        }
    }

    fn id() -> String {
        Uuid::new_v4().to_string()
    }

    /// total 100.00, discount 10.00, tax 5.00, grand total 95.00, unpaid.
    fn new_sale(outlet_id: &str, invoice_number: &str) -> NewSale {
        NewSale {
            outlet_id: outlet_id.to_string(),
            staff_id: id(),
            table_id: id(),
            invoice_number: invoice_number.to_string(),
            total_cents: 10_000,
            discount_cents: 1_000,
            tax_cents: 500,
            grand_total_cents: 9_500,
            status: "unpaid".to_string(),
            customer_id: None,
            payment_method_id: None,
            sale_date: None,
            note: None,
        }
    }

    fn new_coupon(outlet_id: &str, code: &str) -> NewCoupon {
        let now = Utc::now();
        NewCoupon {
            outlet_id: outlet_id.to_string(),
            code: code.to_string(),
            description: None,
            discount_type: "fixed".to_string(),
            discount_value: 500,
            max_uses: 10,
            start_date: now - ChronoDuration::days(1),
            end_date: now + ChronoDuration::days(1),
            is_active: None,
        }
    }

    fn line(price_cents: i64, quantity: i64) -> NewSaleItem {
        NewSaleItem {
            product_id: id(),
            quantity,
            price_cents,
            discount_cents: 0,
            total_cents: price_cents * quantity,
        }
    }

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_create_then_get_round_trips_scalars() {
        let f = fixture().await;
        let created = f.sales.create(new_sale(&f.outlet_id, "INV-001")).await.unwrap();

        let detail = f.sales.get_by_id(&created.id).await.unwrap();
        let sale = &detail.sale;
        assert_eq!(sale.total_cents, 10_000);
        assert_eq!(sale.discount_cents, 1_000);
        assert_eq!(sale.tax_cents, 500);
        assert_eq!(sale.grand_total_cents, 9_500);
        assert_eq!(sale.status, SaleStatus::Unpaid);
        assert_eq!(sale.invoice_number, "INV-001");
        assert_eq!(sale, &created);
        assert!(detail.items.is_empty());
        assert!(detail.coupons.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_invoice_number_conflicts() {
        let f = fixture().await;
        f.sales.create(new_sale(&f.outlet_id, "INV-001")).await.unwrap();

        let err = f
            .sales
            .create(new_sale(&f.outlet_id, "INV-001"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_create_rejects_bad_input() {
        let f = fixture().await;

        let mut negative = new_sale(&f.outlet_id, "INV-NEG");
        negative.tax_cents = -1;
        let mut bad_status = new_sale(&f.outlet_id, "INV-STATUS");
        bad_status.status = "refunded".to_string();
        let blank_invoice = new_sale(&f.outlet_id, "");
        let long_invoice = new_sale(&f.outlet_id, &"X".repeat(51));
        let mut bad_staff = new_sale(&f.outlet_id, "INV-STAFF");
        bad_staff.staff_id = "cashier-1".to_string();

        for (request, field) in [
            (negative, "tax"),
            (bad_status, "status"),
            (blank_invoice, "invoice_number"),
            (long_invoice, "invoice_number"),
            (bad_staff, "staff_id"),
        ] {
            let err = f.sales.create(request).await.unwrap_err();
            assert!(
                matches!(err, ServiceError::Validation(ref e) if e.field() == field),
                "expected validation error on {field}, got {err:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_grand_total_stored_as_given() {
        let f = fixture().await;
        let mut request = new_sale(&f.outlet_id, "INV-ODD");
        request.grand_total_cents = 1;

        let created = f.sales.create(request).await.unwrap();
        assert!(!created.totals_balance());
        let stored = f.sales.get_by_id(&created.id).await.unwrap();
        assert_eq!(stored.sale.grand_total_cents, 1);
    }

    #[tokio::test]
    async fn test_attach_coupon_twice_conflicts() {
        let f = fixture().await;
        let sale = f.sales.create(new_sale(&f.outlet_id, "INV-001")).await.unwrap();
        let coupon = f.coupons.create(new_coupon(&f.outlet_id, "TAKE5")).await.unwrap();

        f.sales.attach_coupon(&sale.id, &coupon.id).await.unwrap();
        let err = f.sales.attach_coupon(&sale.id, &coupon.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict { .. }));

        let detail = f.sales.get_by_id(&sale.id).await.unwrap();
        assert_eq!(detail.coupons, vec![coupon]);
    }

    #[tokio::test]
    async fn test_attach_missing_coupon_or_sale_is_not_found() {
        let f = fixture().await;
        let sale = f.sales.create(new_sale(&f.outlet_id, "INV-001")).await.unwrap();
        let coupon = f.coupons.create(new_coupon(&f.outlet_id, "TAKE5")).await.unwrap();

        let err = f.sales.attach_coupon(&sale.id, &id()).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { ref entity, .. } if entity == "Coupon"));

        let err = f.sales.attach_coupon(&id(), &coupon.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { ref entity, .. } if entity == "Sale"));
    }

    #[tokio::test]
    async fn test_add_items_and_eager_load() {
        let f = fixture().await;
        let sale = f.sales.create(new_sale(&f.outlet_id, "INV-ITEMS")).await.unwrap();

        let first = f.sales.add_item(&sale.id, line(2_500, 2)).await.unwrap();
        let second = f.sales.add_item(&sale.id, line(5_000, 1)).await.unwrap();
        assert_eq!(first.total_cents, 5_000);
        assert_eq!(first.expected_total().cents(), first.total_cents);

        let detail = f.sales.get_by_invoice_number("INV-ITEMS").await.unwrap();
        assert_eq!(detail.sale.id, sale.id);
        assert_eq!(detail.items.len(), 2);
        assert_eq!(f.sales.get_items(&sale.id).await.unwrap().len(), 2);
        assert_eq!(f.sales.get_item(&second.id).await.unwrap(), second);
    }

    #[tokio::test]
    async fn test_add_item_to_missing_sale_is_not_found() {
        let f = fixture().await;
        let err = f.sales.add_item(&id(), line(100, 1)).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { ref entity, .. } if entity == "Sale"));
    }

    #[tokio::test]
    async fn test_add_item_rejects_zero_quantity() {
        let f = fixture().await;
        let sale = f.sales.create(new_sale(&f.outlet_id, "INV-QTY")).await.unwrap();
        let err = f.sales.add_item(&sale.id, line(100, 0)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref e) if e.field() == "quantity"));
    }

    #[tokio::test]
    async fn test_update_status_any_to_any() {
        let f = fixture().await;
        let sale = f.sales.create(new_sale(&f.outlet_id, "INV-ST")).await.unwrap();

        for status in ["void", "paid", "hold", "unpaid"] {
            let updated = f.sales.update_status(&sale.id, status).await.unwrap();
            assert_eq!(updated.status.as_str(), status);
        }

        let err = f.sales.update_status(&sale.id, "refunded").await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref e) if e.field() == "status"));
        let err = f.sales.update_status(&id(), "paid").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_sparse_update_and_empty_patch() {
        let f = fixture().await;
        let sale = f.sales.create(new_sale(&f.outlet_id, "INV-UPD")).await.unwrap();

        let unchanged = f.sales.update(&sale.id, &SalePatch::default()).await.unwrap();
        assert_eq!(unchanged, sale);

        let patch = SalePatch {
            note: Some("Split bill".to_string()),
            status: Some("paid".to_string()),
            ..Default::default()
        };
        let updated = f.sales.update(&sale.id, &patch).await.unwrap();
        assert_eq!(updated.note.as_deref(), Some("Split bill"));
        assert_eq!(updated.status, SaleStatus::Paid);
        assert_eq!(updated.invoice_number, sale.invoice_number);
        assert_eq!(updated.grand_total_cents, sale.grand_total_cents);
        assert_eq!(updated.staff_id, sale.staff_id);
    }

    #[tokio::test]
    async fn test_update_to_taken_invoice_conflicts() {
        let f = fixture().await;
        f.sales.create(new_sale(&f.outlet_id, "INV-A")).await.unwrap();
        let b = f.sales.create(new_sale(&f.outlet_id, "INV-B")).await.unwrap();

        let patch = SalePatch {
            invoice_number: Some("INV-A".to_string()),
            ..Default::default()
        };
        let err = f.sales.update(&b.id, &patch).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_get_by_id_is_idempotent() {
        let f = fixture().await;
        let sale = f.sales.create(new_sale(&f.outlet_id, "INV-IDEM")).await.unwrap();
        f.sales.add_item(&sale.id, line(300, 3)).await.unwrap();

        let first = f.sales.get_by_id(&sale.id).await.unwrap();
        let second = f.sales.get_by_id(&sale.id).await.unwrap();
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }

    #[tokio::test]
    async fn test_delete_takes_lines_and_links() {
        let f = fixture().await;
        let sale = f.sales.create(new_sale(&f.outlet_id, "INV-DEL")).await.unwrap();
        let item = f.sales.add_item(&sale.id, line(100, 1)).await.unwrap();
        let coupon = f.coupons.create(new_coupon(&f.outlet_id, "TAKE5")).await.unwrap();
        f.sales.attach_coupon(&sale.id, &coupon.id).await.unwrap();

        f.sales.delete(&sale.id).await.unwrap();

        assert!(matches!(
            f.sales.get_by_id(&sale.id).await.unwrap_err(),
            ServiceError::NotFound { .. }
        ));
        assert!(matches!(
            f.sales.get_item(&item.id).await.unwrap_err(),
            ServiceError::NotFound { .. }
        ));
        assert!(f.sales.sales_for_coupon(&coupon.id).await.unwrap().is_empty());
        assert!(f.coupons.get_by_id(&coupon.id).await.is_ok());
        assert!(matches!(
            f.sales.delete(&sale.id).await.unwrap_err(),
            ServiceError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_applied_coupons_and_reverse_links() {
        let f = fixture().await;
        let a = f.sales.create(new_sale(&f.outlet_id, "INV-A")).await.unwrap();
        let b = f.sales.create(new_sale(&f.outlet_id, "INV-B")).await.unwrap();
        let coupon = f.coupons.create(new_coupon(&f.outlet_id, "TAKE5")).await.unwrap();
        f.sales.attach_coupon(&a.id, &coupon.id).await.unwrap();
        f.sales.attach_coupon(&b.id, &coupon.id).await.unwrap();

        assert_eq!(
            f.sales.get_applied_coupons(&a.id).await.unwrap(),
            vec![coupon.clone()]
        );
        let links = f.sales.sales_for_coupon(&coupon.id).await.unwrap();
        assert_eq!(links.len(), 2);
    }

    #[tokio::test]
    async fn test_list_filters_and_pages() {
        let f = fixture().await;
        for (n, status) in [(1, "paid"), (2, "unpaid"), (3, "paid")] {
            let mut request = new_sale(&f.outlet_id, &format!("INV-L{n}"));
            request.status = status.to_string();
            f.sales.create(request).await.unwrap();
        }
        f.sales.create(new_sale(&id(), "INV-ELSEWHERE")).await.unwrap();

        let filter = SaleFilter {
            outlet_id: Some(f.outlet_id.clone()),
            status: Some(SaleStatus::Paid),
            ..Default::default()
        };
        let page = f.sales.list(&PageRequest::new(1, 1), &filter).await.unwrap();
        assert_eq!(page.total_results, 2);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.results.len(), 1);

        assert_eq!(f.sales.list_by_outlet(&f.outlet_id).await.unwrap().len(), 3);

        let bad = SaleFilter {
            customer_id: Some("walk-in".to_string()),
            ..Default::default()
        };
        let err = f.sales.list(&PageRequest::default(), &bad).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref e) if e.field() == "customer_id"));
    }

    #[tokio::test]
    async fn test_list_by_date_range_is_inclusive() {
        let f = fixture().await;
        for (invoice, date) in [
            ("INV-JAN", at(2024, 1, 31)),
            ("INV-FEB", at(2024, 2, 1)),
            ("INV-MAR", at(2024, 3, 1)),
        ] {
            let mut request = new_sale(&f.outlet_id, invoice);
            request.sale_date = Some(date);
            f.sales.create(request).await.unwrap();
        }

        let d = |m, day| NaiveDate::from_ymd_opt(2024, m, day).unwrap();
        let sales = f
            .sales
            .list_by_date_range(&f.outlet_id, d(1, 31), d(2, 1))
            .await
            .unwrap();
        let invoices: Vec<_> = sales.iter().map(|s| s.invoice_number.as_str()).collect();
        assert_eq!(invoices, vec!["INV-JAN", "INV-FEB"]);

        let err = f
            .sales
            .list_by_date_range(&f.outlet_id, d(2, 1), d(1, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref e) if e.field() == "date_to"));
    }

    #[tokio::test]
    async fn test_report_groups_by_month() {
        let f = fixture().await;
        for (invoice, date, status) in [
            ("INV-1", at(2024, 1, 5), "paid"),
            ("INV-2", at(2024, 1, 20), "paid"),
            ("INV-3", at(2024, 1, 21), "void"),
            ("INV-4", at(2024, 2, 2), "paid"),
        ] {
            let mut request = new_sale(&f.outlet_id, invoice);
            request.sale_date = Some(date);
            request.status = status.to_string();
            f.sales.create(request).await.unwrap();
        }

        let report = f
            .sales
            .report(&ReportQuery {
                outlet_id: Some(f.outlet_id.clone()),
                date_from: Some("2024-01-01".to_string()),
                date_to: Some("2024-02-29".to_string()),
                group_by: Some("month".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(report.group_by, Some(ReportGroupBy::Month));
        assert_eq!(report.sales.len(), 4);
        assert_eq!(report.buckets.len(), 2);

        let january = &report.buckets[0];
        assert_eq!(january.key, "2024-01");
        assert_eq!(january.sale_count, 3);
        assert_eq!(january.void_count, 1);
        assert_eq!(january.grand_total_cents, 2 * 9_500);
        assert_eq!(report.buckets[1].key, "2024-02");
    }

    #[tokio::test]
    async fn test_report_without_grouping_has_no_buckets() {
        let f = fixture().await;
        f.sales.create(new_sale(&f.outlet_id, "INV-1")).await.unwrap();

        let report = f
            .sales
            .report(&ReportQuery {
                outlet_id: Some(f.outlet_id.clone()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(report.sales.len(), 1);
        assert!(report.buckets.is_empty());

        let err = f
            .sales
            .report(&ReportQuery {
                group_by: Some("week".to_string()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref e) if e.field() == "group_by"));
    }

    #[tokio::test]
    async fn test_report_sum_overflow_is_rejected() {
        let f = fixture().await;
        let big = i64::MAX / 2 + 1;
        for invoice in ["INV-1", "INV-2"] {
            let mut request = new_sale(&f.outlet_id, invoice);
            request.sale_date = Some(at(2024, 6, 1));
            request.status = "paid".to_string();
            request.total_cents = big;
            request.grand_total_cents = big;
            f.sales.create(request).await.unwrap();
        }

        let err = f
            .sales
            .report(&ReportQuery {
                outlet_id: Some(f.outlet_id.clone()),
                group_by: Some("day".to_string()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref e) if e.field() == "total"));
    }

    #[tokio::test]
    async fn test_report_handles_extreme_date_to() {
        let f = fixture().await;
        let mut request = new_sale(&f.outlet_id, "INV-1");
        request.sale_date = Some(at(2024, 6, 1));
        f.sales.create(request).await.unwrap();

        let report = f
            .sales
            .report(&ReportQuery {
                outlet_id: Some(f.outlet_id.clone()),
                date_to: Some("9999-12-31".to_string()),
                group_by: Some("year".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(report.sales.len(), 1);
        assert_eq!(report.buckets[0].key, "2024");

        let err = f
            .sales
            .report(&ReportQuery {
                date_to: Some("+262142-12-31".to_string()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref e) if e.field() == "date_to"));
    }

    #[tokio::test]
    async fn test_store_failure_is_opaque() {
        let service = SaleService::new(BrokenStore::default(), TIMEOUT);

        let err = service.create(new_sale(&id(), "INV-001")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Store { operation: "create_sale" }));

        let err = service.get_by_id(&id()).await.unwrap_err();
        assert_eq!(err.status(), 500);
    }

    #[tokio::test]
    async fn test_stalled_store_hits_deadline() {
        let service = SaleService::new(
            BrokenStore::stalled(Duration::from_secs(30)),
            Duration::from_millis(20),
        );
        let err = service.report(&ReportQuery::default()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Store { operation: "sales_report" }));
    }
}
