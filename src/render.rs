// Copyright (c) The pypi-package-stats Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Text and JSON rendering of assembled reports.

use crate::report::{CategoryBreakdown, Report};
use anyhow::Result;

/// Print the report as pretty JSON to stdout.
pub fn print_json(report: &Report) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

/// Print the report as human-readable text to stdout.
pub fn print_report(report: &Report) {
    let package = &report.package;

    println!(
        "\n{} {} ({})",
        package.name,
        package.version,
        package.upload_time.as_deref().unwrap_or("unknown")
    );
    println!(
        "Description : {}",
        package.description.as_deref().unwrap_or("(none)")
    );
    println!(
        "Author      : {}",
        package.author.as_deref().unwrap_or("(unknown)")
    );
    println!(
        "License     : {}",
        package.license.as_deref().unwrap_or("(not specified)")
    );
    println!(
        "Home page   : {}",
        package.home_page.as_deref().unwrap_or("(none)")
    );
    println!(
        "PyPI        : {}",
        package.pypi_url.as_deref().unwrap_or("(none)")
    );

    println!("\nDownloads");
    println!("  Last day   : {:>12}", format_number(report.downloads.last_day));
    println!("  Last week  : {:>12}", format_number(report.downloads.last_week));
    println!("  Last month : {:>12}", format_number(report.downloads.last_month));
    println!("  Last 180d  : {:>12}", format_number(report.downloads.last_180d));

    print_breakdown("Python versions (month to date)", &report.python_versions);
    print_breakdown("Operating systems (month to date)", &report.operating_systems);
}

fn print_breakdown(title: &str, breakdown: &[CategoryBreakdown]) {
    println!("\n{title}");
    if breakdown.is_empty() {
        println!("  (no data)");
        return;
    }

    for entry in breakdown {
        println!(
            "  {:<12} {:>12} {:>6.1}%",
            entry.category,
            format_number(entry.downloads),
            entry.percentage
        );
    }
}

/// Format a number with thousands separators.
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    let mut count = 0;

    for c in s.chars().rev() {
        if count > 0 && count % 3 == 0 {
            result.push(',');
        }
        result.push(c);
        count += 1;
    }

    result.chars().rev().collect()
}
