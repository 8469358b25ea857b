// Copyright (c) The pypi-package-stats Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Aggregation of raw download time series into ranked breakdowns.

use crate::client::{CategoryRow, DailyRow};
use crate::report::CategoryBreakdown;
use chrono::{Datelike, NaiveDate};
use std::collections::HashMap;

/// Total downloads across all rows of an overall-stats series.
///
/// Rows missing the downloads field contribute 0.
pub fn total_downloads(rows: &[DailyRow]) -> u64 {
    rows.iter().map(|row| row.downloads).sum()
}

/// Filter rows to the trailing window: from the first day of the current
/// calendar month through `today` inclusive.
///
/// ISO dates compare lexicographically, so the raw date strings are matched
/// against the cutoff directly. Rows without a date are excluded.
fn month_to_date(rows: &[CategoryRow], today: NaiveDate) -> Vec<&CategoryRow> {
    let cutoff = today.with_day(1).unwrap_or(today).to_string();
    rows.iter().filter(|row| row.date >= cutoff).collect()
}

/// Sum downloads per raw category label.
fn sum_by_category<'a>(rows: &[&'a CategoryRow]) -> HashMap<&'a str, u64> {
    let mut totals: HashMap<&str, u64> = HashMap::new();
    for row in rows {
        *totals.entry(row.category.as_str()).or_insert(0) += row.downloads;
    }
    totals
}

/// Fold raw `{date, category, downloads}` rows into a ranked breakdown over
/// the month-to-date window.
///
/// Categories are ranked by summed downloads descending (ties broken by
/// label ascending for determinism) and truncated to `limit`. Percentages
/// are each category's share of the whole filtered window, so truncated
/// output sums to less than 100. The sentinel label `"null"` is rewritten
/// to `"Unknown"` after aggregation, so that `"null"` rows group together
/// under the raw label first.
pub fn category_breakdown(
    rows: &[CategoryRow],
    today: NaiveDate,
    limit: usize,
) -> Vec<CategoryBreakdown> {
    let recent = month_to_date(rows, today);
    let totals = sum_by_category(&recent);
    let total: u64 = totals.values().sum();

    let mut ranked: Vec<(&str, u64)> = totals.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.truncate(limit);

    ranked
        .into_iter()
        .map(|(category, downloads)| CategoryBreakdown {
            category: if category == "null" {
                "Unknown".to_string()
            } else {
                category.to_string()
            },
            downloads,
            percentage: percentage_of(downloads, total),
        })
        .collect()
}

/// Share of `total`, as a percentage rounded to one decimal place.
/// Defined as 0.0 when the total is 0.
fn percentage_of(downloads: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (100.0 * downloads as f64 / total as f64 * 10.0).round() / 10.0
}
