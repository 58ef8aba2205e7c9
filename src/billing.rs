//! Redshift billing lookup over a fixed dataset
//!
//! Stands in for a real billing API; only the filtering contract matters.

use crate::error::GatewayError;
use crate::types::BillingEntry;
use chrono::NaiveDate;
use std::collections::BTreeMap;

const DAILY_USAGE: &[(&str, f64, f64)] = &[
    ("2024-01-01", 120.50, 24.0),
    ("2024-01-02", 98.75, 20.5),
    ("2024-01-03", 143.10, 24.0),
    ("2024-01-04", 110.00, 22.0),
    ("2024-01-05", 87.25, 18.0),
    ("2024-01-06", 64.40, 12.5),
    ("2024-01-07", 59.90, 11.0),
];

/// Entries whose date lies in `[start_date, end_date]`
///
/// # Errors
/// Returns `InvalidDate` when either bound is not `YYYY-MM-DD`.
pub fn analyze(start_date: &str, end_date: &str) -> Result<BTreeMap<String, BillingEntry>, GatewayError> {
    let start = parse_date(start_date)?;
    let end = parse_date(end_date)?;

    Ok(DAILY_USAGE
        .iter()
        .filter(|(day, _, _)| *day >= start.as_str() && *day <= end.as_str())
        .map(|(day, cost, usage_hours)| {
            (
                (*day).to_string(),
                BillingEntry {
                    cost: *cost,
                    usage_hours: *usage_hours,
                },
            )
        })
        .collect())
}

/// Validate and normalize to the zero-padded form used by the dataset
fn parse_date(value: &str) -> Result<String, GatewayError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map(|d| d.format("%Y-%m-%d").to_string())
        .map_err(|_| GatewayError::InvalidDate(value.to_string()))
}
