// Copyright (c) The pypi-package-stats Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Report assembly: orchestrates the five fetches and folds the raw
//! responses into one immutable report.

use crate::aggregate;
use crate::client::{CategoryRow, DailyRow, StatsClient};
use crate::error::{Result, StatsError};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;

/// Length of the date prefix of an ISO-8601 timestamp (YYYY-MM-DD).
const DATE_PREFIX_LEN: usize = 10;

/// Snapshot of the package metadata fields the report exposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageInfo {
    pub name: String,
    pub version: String,
    pub upload_time: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub license: Option<String>,
    pub home_page: Option<String>,
    pub pypi_url: Option<String>,
}

/// Download counts over the standard windows. The first three come from the
/// recent resource verbatim; `last_180d` is derived from the overall series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DownloadStats {
    pub last_day: u64,
    pub last_week: u64,
    pub last_month: u64,
    pub last_180d: u64,
}

/// One entry of a ranked category breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryBreakdown {
    pub category: String,
    pub downloads: u64,
    pub percentage: f64,
}

/// The assembled per-query report. Constructed fresh for every query and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub package: PackageInfo,
    pub downloads: DownloadStats,
    pub python_versions: Vec<CategoryBreakdown>,
    pub operating_systems: Vec<CategoryBreakdown>,
}

/// Fetch all five resources for `package` and assemble the report.
///
/// The name is validated and normalized (trimmed, lower-cased) before any
/// network call. Any fetch failure propagates unchanged; there is no
/// partial report.
pub async fn build_report(
    client: &StatsClient,
    package: &str,
    python_limit: usize,
    os_limit: usize,
) -> Result<Report> {
    let package = package.trim();
    if package.is_empty() {
        return Err(StatsError::InvalidPackageName);
    }
    let package = package.to_lowercase();

    let info_doc = client.package_info(&package).await?;
    let recent = client.recent_stats(&package).await?;
    let overall = client.overall_stats(&package).await?;
    let python_rows = client.python_minor_stats(&package).await?;
    let system_rows = client.system_stats(&package).await?;

    let today = Utc::now().date_naive();
    Ok(assemble(
        &info_doc,
        &recent,
        &overall,
        &python_rows,
        &system_rows,
        today,
        python_limit,
        os_limit,
    ))
}

/// Pure assembly of the report from already-fetched resources.
#[allow(clippy::too_many_arguments)]
fn assemble(
    info_doc: &Value,
    recent: &Value,
    overall: &[DailyRow],
    python_rows: &[CategoryRow],
    system_rows: &[CategoryRow],
    today: NaiveDate,
    python_limit: usize,
    os_limit: usize,
) -> Report {
    Report {
        package: package_info(info_doc),
        downloads: DownloadStats {
            last_day: count_field(recent, "last_day"),
            last_week: count_field(recent, "last_week"),
            last_month: count_field(recent, "last_month"),
            last_180d: aggregate::total_downloads(overall),
        },
        python_versions: aggregate::category_breakdown(python_rows, today, python_limit),
        operating_systems: aggregate::category_breakdown(system_rows, today, os_limit),
    }
}

/// Extract the metadata snapshot from the package document.
///
/// Fallback chains mirror the upstream field precedence: `author` falls back
/// to `author_email`, and `home_page` to `project_url` and then
/// `project_urls.Homepage`. Empty strings count as absent throughout.
fn package_info(doc: &Value) -> PackageInfo {
    let info = doc.get("info").unwrap_or(&Value::Null);

    let author = non_empty_str(info, "author").or_else(|| non_empty_str(info, "author_email"));
    let home_page = non_empty_str(info, "home_page")
        .or_else(|| non_empty_str(info, "project_url"))
        .or_else(|| {
            info.get("project_urls")
                .and_then(|urls| non_empty_str(urls, "Homepage"))
        });

    PackageInfo {
        name: non_empty_str(info, "name").unwrap_or_default(),
        version: non_empty_str(info, "version").unwrap_or_default(),
        upload_time: upload_time(doc),
        description: non_empty_str(info, "summary"),
        author,
        license: non_empty_str(info, "license"),
        home_page,
        pypi_url: non_empty_str(info, "package_url"),
    }
}

/// Upload timestamp of the current version, truncated to its date prefix.
///
/// Read from the first release file of `releases[info.version]`, preferring
/// `upload_time` and falling back to `upload_time_iso_8601`. Absent when the
/// version has no release entry or neither field is set.
fn upload_time(doc: &Value) -> Option<String> {
    let version = doc
        .get("info")
        .and_then(|info| info.get("version"))
        .and_then(Value::as_str)?;

    let first_file = doc.get("releases")?.get(version)?.get(0)?;

    let raw = [
        first_file.get("upload_time"),
        first_file.get("upload_time_iso_8601"),
    ]
    .into_iter()
    .flatten()
    .filter_map(Value::as_str)
    .find(|s| !s.is_empty())?;

    Some(raw.chars().take(DATE_PREFIX_LEN).collect())
}

/// A string field, with empty strings normalized to absent.
fn non_empty_str(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// A non-negative count field, defaulting to 0 when missing.
fn count_field(value: &Value, key: &str) -> u64 {
    value.get(key).and_then(Value::as_u64).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_doc() -> Value {
        json!({
            "info": {
                "name": "requests",
                "version": "2.31.0",
                "summary": "Python HTTP for Humans.",
                "author": "Kenneth Reitz",
                "author_email": "me@kennethreitz.org",
                "license": "Apache 2.0",
                "home_page": "https://requests.readthedocs.io",
                "package_url": "https://pypi.org/project/requests/"
            },
            "releases": {
                "2.31.0": [
                    {"upload_time": "2023-05-22T15:12:42", "upload_time_iso_8601": "2023-05-22T15:12:42.313790Z"}
                ]
            }
        })
    }

    #[test]
    fn test_package_info_extraction() {
        let info = package_info(&sample_doc());

        assert_eq!(info.name, "requests");
        assert_eq!(info.version, "2.31.0");
        assert_eq!(info.upload_time.as_deref(), Some("2023-05-22"));
        assert_eq!(info.description.as_deref(), Some("Python HTTP for Humans."));
        assert_eq!(info.author.as_deref(), Some("Kenneth Reitz"));
        assert_eq!(info.license.as_deref(), Some("Apache 2.0"));
        assert_eq!(
            info.home_page.as_deref(),
            Some("https://requests.readthedocs.io")
        );
        assert_eq!(
            info.pypi_url.as_deref(),
            Some("https://pypi.org/project/requests/")
        );
    }

    #[test]
    fn test_author_falls_back_to_email() {
        let mut doc = sample_doc();
        doc["info"]["author"] = json!("");

        let info = package_info(&doc);
        assert_eq!(info.author.as_deref(), Some("me@kennethreitz.org"));
    }

    #[test]
    fn test_home_page_fallback_chain() {
        let mut doc = sample_doc();
        doc["info"]["home_page"] = json!(null);
        doc["info"]["project_url"] = json!("");
        doc["info"]["project_urls"] = json!({"Homepage": "https://example.org"});

        let info = package_info(&doc);
        assert_eq!(info.home_page.as_deref(), Some("https://example.org"));

        doc["info"]["project_url"] = json!("https://pypi.org/project/requests/");
        let info = package_info(&doc);
        assert_eq!(
            info.home_page.as_deref(),
            Some("https://pypi.org/project/requests/")
        );
    }

    #[test]
    fn test_upload_time_falls_back_to_iso_8601() {
        let mut doc = sample_doc();
        doc["releases"]["2.31.0"][0]["upload_time"] = json!(null);

        let info = package_info(&doc);
        assert_eq!(info.upload_time.as_deref(), Some("2023-05-22"));
    }

    #[test]
    fn test_upload_time_absent_without_release_entry() {
        let mut doc = sample_doc();
        doc["releases"] = json!({});
        assert_eq!(package_info(&doc).upload_time, None);

        let mut doc = sample_doc();
        doc["releases"]["2.31.0"] = json!([]);
        assert_eq!(package_info(&doc).upload_time, None);
    }

    #[test]
    fn test_empty_strings_are_absent() {
        let doc = json!({
            "info": {
                "name": "pkg",
                "version": "1.0",
                "summary": "",
                "author": "",
                "author_email": "",
                "license": ""
            },
            "releases": {}
        });

        let info = package_info(&doc);
        assert_eq!(info.description, None);
        assert_eq!(info.author, None);
        assert_eq!(info.license, None);
        assert_eq!(info.home_page, None);
    }

    #[test]
    fn test_assemble_merges_everything() {
        let recent = json!({"last_day": 10, "last_week": 70, "last_month": 300});
        let overall = vec![
            DailyRow {
                date: "2024-01-01".to_string(),
                downloads: 500,
            },
            DailyRow {
                date: "2024-01-02".to_string(),
                downloads: 600,
            },
        ];
        let python_rows = vec![
            CategoryRow {
                date: "2024-01-15".to_string(),
                category: "3.11".to_string(),
                downloads: 300,
            },
            CategoryRow {
                date: "2024-01-15".to_string(),
                category: "3.10".to_string(),
                downloads: 200,
            },
        ];
        let today = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();

        let report = assemble(&sample_doc(), &recent, &overall, &python_rows, &[], today, 5, 4);

        assert_eq!(report.downloads.last_day, 10);
        assert_eq!(report.downloads.last_180d, 1100);
        assert_eq!(report.python_versions.len(), 2);
        assert_eq!(report.python_versions[0].category, "3.11");
        assert_eq!(report.python_versions[0].percentage, 60.0);
        assert!(report.operating_systems.is_empty());
    }

    #[test]
    fn test_missing_recent_fields_default_to_zero() {
        let report = assemble(
            &sample_doc(),
            &json!({}),
            &[],
            &[],
            &[],
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            5,
            4,
        );

        assert_eq!(report.downloads.last_day, 0);
        assert_eq!(report.downloads.last_week, 0);
        assert_eq!(report.downloads.last_month, 0);
        assert_eq!(report.downloads.last_180d, 0);
    }

    #[tokio::test]
    async fn test_empty_name_rejected_before_any_call() {
        let client = StatsClient::new(None, Some(0)).unwrap();

        let err = build_report(&client, "   ", 5, 4).await.unwrap_err();
        assert!(matches!(err, StatsError::InvalidPackageName));
    }
}
