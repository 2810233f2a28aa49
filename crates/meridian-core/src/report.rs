//! # Sales Report Bucketing
//!
//! Groups sales into day, month, or year buckets and sums their money.
//!
//! ```text
//!  sale_date 2024-03-14T09:12Z ──► day   "2024-03-14"
//!                               ──► month "2024-03"
//!                               ──► year  "2024"
//! ```
//!
//! Void sales are counted (`sale_count`, `void_count`) but their amounts are
//! left out of every sum.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use std::collections::BTreeMap;

use crate::error::ValidationError;
use crate::types::{ReportBucket, ReportGroupBy, Sale, SaleStatus};
use crate::validation::ValidationResult;
use crate::MAX_REPORT_YEAR;

/// The bucket a timestamp falls in.
pub fn bucket_key(date: DateTime<Utc>, group_by: ReportGroupBy) -> String {
    let fmt = match group_by {
        ReportGroupBy::Day => "%Y-%m-%d",
        ReportGroupBy::Month => "%Y-%m",
        ReportGroupBy::Year => "%Y",
    };
    date.format(fmt).to_string()
}

fn accumulate(sum: &mut i64, amount: i64, field: &str) -> ValidationResult<()> {
    *sum = sum
        .checked_add(amount)
        .ok_or_else(|| ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        })?;
    Ok(())
}

/// Aggregates `sales` per bucket, ordered by bucket key.
///
/// ## Errors
/// `OutOfRange` naming the amount whose bucket sum does not fit in i64.
pub fn summarize(sales: &[Sale], group_by: ReportGroupBy) -> ValidationResult<Vec<ReportBucket>> {
    let mut buckets: BTreeMap<String, ReportBucket> = BTreeMap::new();

    for sale in sales {
        let key = bucket_key(sale.sale_date, group_by);
        let bucket = buckets.entry(key.clone()).or_insert_with(|| ReportBucket {
            key,
            ..Default::default()
        });

        bucket.sale_count += 1;
        if sale.status == SaleStatus::Void {
            bucket.void_count += 1;
            continue;
        }
        accumulate(&mut bucket.total_cents, sale.total_cents, "total")?;
        accumulate(&mut bucket.discount_cents, sale.discount_cents, "discount")?;
        accumulate(&mut bucket.tax_cents, sale.tax_cents, "tax")?;
        accumulate(&mut bucket.grand_total_cents, sale.grand_total_cents, "grand_total")?;
    }

    Ok(buckets.into_values().collect())
}

/// Converts inclusive calendar days into a half-open `[from, to)` instant
/// range: `to` becomes midnight after `date_to`.
///
/// Stored timestamps only order correctly as text up to year 9999, so when
/// the day after `date_to` falls beyond that the range stays open-ended.
pub fn day_bounds(
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    let start_of = |d: NaiveDate| d.and_time(NaiveTime::MIN).and_utc();
    (
        date_from.map(start_of),
        date_to
            .and_then(|d| d.succ_opt())
            .filter(|next| next.year() <= MAX_REPORT_YEAR)
            .map(start_of),
    )
}
