//! # Seed Data Generator
//!
//! Populates a back-office database with one outlet's worth of coupons and
//! sales, then prints a sales report.
//!
//! ## Usage
//! ```bash
//! # 90 sales over the last 90 days, into the configured database
//! cargo run -p meridian-backoffice --bin seed
//!
//! # Custom amount and database path
//! cargo run -p meridian-backoffice --bin seed -- --count 500 --db ./data/meridian.db
//!
//! # Report grouped by day instead of month
//! cargo run -p meridian-backoffice --bin seed -- --group-by day
//! ```
//!
//! Everything goes through the services, so validation, coupon redemption
//! counting and conflict handling behave exactly as they do for real callers.

use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::{Duration, Utc};
use meridian_backoffice::{logging, AppConfig, CouponService, SaleService, ServiceError};
use meridian_core::{
    Money, NewCoupon, NewSale, NewSaleItem, PageRequest, ReportQuery, SaleFilter,
};
use meridian_db::Database;
use tracing::warn;
use uuid::Uuid;

/// (code, description, discount type, value, max uses)
///
/// Percentage values are basis points, fixed values are cents.
const COUPONS: &[(&str, &str, &str, i64, i64)] = &[
    ("WELCOME10", "10% off for new customers", "percentage", 1_000, 500),
    ("LUNCH5", "5.00 off lunch orders", "fixed", 500, 200),
    ("VIP25", "25% off for members", "percentage", 2_500, 50),
    ("LASTCALL", "15% off, nearly used up", "percentage", 1_500, 3),
];

/// Menu items: (name, price in cents)
const MENU: &[(&str, i64)] = &[
    ("Flat White", 450),
    ("Croissant", 375),
    ("Club Sandwich", 1_150),
    ("Caesar Salad", 1_090),
    ("Sparkling Water", 300),
    ("Cheesecake", 650),
];

/// Tax in basis points.
const TAX_RATE_BPS: i64 = 800;

const STATUSES: &[&str] = &["paid", "paid", "paid", "unpaid", "hold", "void"];

struct Args {
    count: usize,
    db_path: Option<PathBuf>,
    group_by: String,
}

fn parse_args() -> anyhow::Result<Option<Args>> {
    let mut args = Args {
        count: 90,
        db_path: None,
        group_by: "month".to_string(),
    };

    let mut iter = env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--count" | "-c" => {
                let value = iter.next().context("--count needs a value")?;
                args.count = value
                    .parse()
                    .with_context(|| format!("invalid --count: {value}"))?;
            }
            "--db" | "-d" => {
                args.db_path = Some(iter.next().context("--db needs a path")?.into());
            }
            "--group-by" | "-g" => {
                args.group_by = iter.next().context("--group-by needs day|month|year")?;
            }
            "--help" | "-h" => {
                println!("Meridian Back Office Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>         Number of sales to generate (default: 90)");
                println!("  -d, --db <PATH>         Database file path (default: from meridian.toml)");
                println!("  -g, --group-by <UNIT>   Report grouping: day, month, year (default: month)");
                println!("  -h, --help              Show this help message");
                return Ok(None);
            }
            other => bail!("unknown argument: {other}"),
        }
    }
    Ok(Some(args))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Some(args) = parse_args()? else {
        return Ok(());
    };

    let mut config = AppConfig::load().context("loading configuration")?;
    if let Some(path) = args.db_path {
        config.database_path = path;
    }
    logging::init(&config.log_filter);

    println!("Meridian Back Office Seed Data Generator");
    println!("========================================");
    println!("Database: {}", config.database_path.display());
    println!("Sales:    {}", args.count);
    println!();

    let db = Database::new(config.db_config())
        .await
        .context("opening database")?;
    let coupons = CouponService::new(db.clone(), config.operation_timeout());
    let sales = SaleService::new(db.clone(), config.operation_timeout());

    let existing = sales
        .list(&PageRequest::new(1, 1), &SaleFilter::default())
        .await?
        .total_results;
    if existing > 0 {
        println!("Database already has {existing} sales; skipping seed.");
        println!("Delete the database file to regenerate.");
        return Ok(());
    }

    let outlet_id = Uuid::new_v4().to_string();
    let now = Utc::now();
    let days = args.count.max(1) as i64;

    let mut coupon_codes = Vec::new();
    for (code, description, discount_type, value, max_uses) in COUPONS {
        let coupon = coupons
            .create(NewCoupon {
                outlet_id: outlet_id.clone(),
                code: code.to_string(),
                description: Some(description.to_string()),
                discount_type: discount_type.to_string(),
                discount_value: *value,
                max_uses: *max_uses,
                start_date: now - Duration::days(days + 1),
                end_date: now + Duration::days(30),
                is_active: Some(true),
            })
            .await?;
        coupon_codes.push(coupon.code);
    }
    println!("Created {} coupons for outlet {outlet_id}", coupon_codes.len());

    let staff_id = Uuid::new_v4().to_string();
    let start = std::time::Instant::now();
    let mut rejected = 0;

    for n in 0..args.count {
        let lines: Vec<(i64, i64)> = (0..1 + n % 3)
            .map(|k| {
                let (_, price) = MENU[(n + k * 2) % MENU.len()];
                (price, 1 + ((n + k) % 2) as i64)
            })
            .collect();
        let subtotal: Money = lines
            .iter()
            .map(|(price, qty)| Money::from_cents(*price).multiply_quantity(*qty))
            .sum();

        // every third sale tries a coupon
        let coupon = if n % 3 == 0 {
            let code = &coupon_codes[n % coupon_codes.len()];
            match coupons.redeem_strict(code, &outlet_id, now).await {
                Ok(coupon) => Some(coupon),
                Err(ServiceError::CouponInvalid { reason, .. }) => {
                    warn!(code = %code, %reason, "Seed coupon not applied");
                    rejected += 1;
                    None
                }
                Err(e) => return Err(e.into()),
            }
        } else {
            None
        };

        let discount = coupon
            .as_ref()
            .map(|c| c.discount_for(subtotal))
            .unwrap_or_default();
        let taxable = subtotal - discount;
        let tax = taxable.percentage_of(TAX_RATE_BPS);

        let sale = sales
            .create(NewSale {
                outlet_id: outlet_id.clone(),
                staff_id: staff_id.clone(),
                table_id: Uuid::new_v4().to_string(),
                invoice_number: format!("INV-{:06}", n + 1),
                total_cents: subtotal.cents(),
                discount_cents: discount.cents(),
                tax_cents: tax.cents(),
                grand_total_cents: (taxable + tax).cents(),
                status: STATUSES[n % STATUSES.len()].to_string(),
                customer_id: None,
                payment_method_id: None,
                sale_date: Some(now - Duration::days((n as i64) % days)),
                note: None,
            })
            .await?;

        for (price, qty) in &lines {
            sales
                .add_item(
                    &sale.id,
                    NewSaleItem {
                        product_id: Uuid::new_v4().to_string(),
                        quantity: *qty,
                        price_cents: *price,
                        discount_cents: 0,
                        total_cents: price * qty,
                    },
                )
                .await?;
        }
        if let Some(coupon) = coupon {
            sales.attach_coupon(&sale.id, &coupon.id).await?;
        }
    }

    println!(
        "Created {} sales in {:?} ({rejected} coupon attempts rejected)",
        args.count,
        start.elapsed()
    );

    let report = sales
        .report(&ReportQuery {
            outlet_id: Some(outlet_id),
            group_by: Some(args.group_by),
            ..Default::default()
        })
        .await?;

    println!();
    println!("{:<12} {:>6} {:>6} {:>12}", "Period", "Sales", "Void", "Grand total");
    for bucket in &report.buckets {
        println!(
            "{:<12} {:>6} {:>6} {:>12}",
            bucket.key,
            bucket.sale_count,
            bucket.void_count,
            Money::from_cents(bucket.grand_total_cents).to_string()
        );
    }

    db.close().await;
    println!();
    println!("Seed complete.");
    Ok(())
}
