// Copyright (c) The pypi-package-stats Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! API client for fetching package metadata and download statistics.
//!
//! Five resources per query: the package metadata document from pypi.org and
//! four download-statistics resources from pypistats.org. Every successful
//! response is written into the [`ResponseCache`] keyed by request URL, and
//! subsequent lookups within the TTL are served from disk.

use crate::cache::ResponseCache;
use crate::config::DEFAULT_CACHE_TTL;
use crate::error::{Result, StatsError};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const PYPI_API_BASE: &str = "https://pypi.org/pypi";
const PYPISTATS_API_BASE: &str = "https://pypistats.org/api/packages";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Total attempts per request, including the first.
const MAX_ATTEMPTS: u32 = 4;
/// Multiplier for the exponential backoff delay between attempts.
const BACKOFF_FACTOR: u64 = 1;
/// Statuses that signal a transient condition worth retrying.
const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// One `{date, downloads}` row of the 180-day overall series.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DailyRow {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub downloads: u64,
}

/// One `{date, category, downloads}` row of a breakdown series.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryRow {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub downloads: u64,
}

/// Client for the pypi.org and pypistats.org APIs.
///
/// Each instance owns its own connection pool, so concurrent queries running
/// on separate clients never contend for connections. The cache is the only
/// shared resource and is safe to hand to many clients at once.
pub struct StatsClient {
    http: reqwest::Client,
    cache: Option<Arc<ResponseCache>>,
    cache_ttl: u64,
    pypi_base: String,
    stats_base: String,
}

impl StatsClient {
    /// Create a client backed by `cache`.
    ///
    /// A TTL of `None` uses the default of 3600 seconds. A TTL of exactly 0
    /// disables caching for this instance: every fetch bypasses both the
    /// read and write paths and goes straight to the network.
    pub fn new(cache: Option<Arc<ResponseCache>>, cache_ttl: Option<u64>) -> Result<Self> {
        Self::with_bases(
            cache,
            cache_ttl,
            PYPI_API_BASE.to_string(),
            PYPISTATS_API_BASE.to_string(),
        )
    }

    fn with_bases(
        cache: Option<Arc<ResponseCache>>,
        cache_ttl: Option<u64>,
        pypi_base: String,
        stats_base: String,
    ) -> Result<Self> {
        let cache_ttl = cache_ttl.unwrap_or(DEFAULT_CACHE_TTL);
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(READ_TIMEOUT)
            .user_agent(concat!("pypi-package-stats/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            cache: if cache_ttl == 0 { None } else { cache },
            cache_ttl,
            pypi_base,
            stats_base,
        })
    }

    /// Fetch the package metadata document.
    pub async fn package_info(&self, package: &str) -> Result<Value> {
        let url = format!("{}/{}/json", self.pypi_base, package.to_lowercase());
        self.get_json(&url, package).await
    }

    /// Fetch the short-window download counts (`last_day` / `last_week` /
    /// `last_month`, aggregated server-side). Returns `{}` when the response
    /// lacks the `data` wrapper.
    pub async fn recent_stats(&self, package: &str) -> Result<Value> {
        let url = format!("{}/{}/recent", self.stats_base, package.to_lowercase());
        let value = self.get_json(&url, package).await?;
        Ok(value
            .get("data")
            .cloned()
            .unwrap_or_else(|| Value::Object(serde_json::Map::new())))
    }

    /// Fetch the 180-day daily download series, mirror traffic excluded.
    pub async fn overall_stats(&self, package: &str) -> Result<Vec<DailyRow>> {
        let url = format!(
            "{}/{}/overall?mirrors=false",
            self.stats_base,
            package.to_lowercase()
        );
        let value = self.get_json(&url, package).await?;
        data_rows(&value)
    }

    /// Fetch the per-Python-minor-version download series.
    pub async fn python_minor_stats(&self, package: &str) -> Result<Vec<CategoryRow>> {
        let url = format!("{}/{}/python_minor", self.stats_base, package.to_lowercase());
        let value = self.get_json(&url, package).await?;
        data_rows(&value)
    }

    /// Fetch the per-operating-system download series.
    pub async fn system_stats(&self, package: &str) -> Result<Vec<CategoryRow>> {
        let url = format!("{}/{}/system", self.stats_base, package.to_lowercase());
        let value = self.get_json(&url, package).await?;
        data_rows(&value)
    }

    /// GET a JSON resource, consulting the cache first and writing the
    /// decoded body back on a successful network fetch.
    async fn get_json(&self, url: &str, package: &str) -> Result<Value> {
        if let Some(cache) = &self.cache {
            if let Some(value) = cache
                .get(url)
                .map_err(|e| StatsError::Unexpected(e.to_string()))?
            {
                return Ok(value);
            }
        }

        let value = self.fetch_with_retry(url, package).await?;

        if let Some(cache) = &self.cache {
            cache
                .set(url, &value, self.cache_ttl)
                .map_err(|e| StatsError::Unexpected(e.to_string()))?;
        }

        Ok(value)
    }

    /// Issue the GET, retrying transient statuses with exponential backoff.
    ///
    /// A server-supplied `Retry-After` header takes precedence over the
    /// computed delay. Requests here are all idempotent GETs, so every
    /// retryable status is in fact retried.
    async fn fetch_with_retry(&self, url: &str, package: &str) -> Result<Value> {
        let mut last_status = 0u16;
        let mut retry_after: Option<Duration> = None;

        for attempt in 1..=MAX_ATTEMPTS {
            if attempt > 1 {
                let delay = retry_after.take().unwrap_or_else(|| backoff_delay(attempt));
                debug!(url, attempt, delay_ms = delay.as_millis() as u64, "retrying request");
                tokio::time::sleep(delay).await;
            }

            let response = self.http.get(url).send().await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response.json::<Value>().await?);
            }

            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(StatsError::PackageNotFound {
                    package: package.to_lowercase(),
                });
            }

            if RETRYABLE_STATUSES.contains(&status.as_u16()) {
                last_status = status.as_u16();
                retry_after = parse_retry_after(&response);
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            return Err(StatsError::Api {
                status: Some(status.as_u16()),
                message: format!("request to {url} failed: {body}"),
            });
        }

        Err(StatsError::RetriesExhausted {
            attempts: MAX_ATTEMPTS,
            status: last_status,
        })
    }
}

/// Delay before the given attempt (attempt 2 waits 1s, then 2s, 4s).
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(BACKOFF_FACTOR * 2u64.pow(attempt.saturating_sub(2)))
}

/// `Retry-After: <seconds>` when present and parseable.
fn parse_retry_after(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Unwrap the `data` field of a pypistats response into typed rows.
/// A missing wrapper yields an empty list.
fn data_rows<T: serde::de::DeserializeOwned>(value: &Value) -> Result<Vec<T>> {
    match value.get("data") {
        Some(data) => serde_json::from_value(data.clone())
            .map_err(|e| StatsError::Unexpected(format!("malformed statistics rows: {e}"))),
        None => Ok(Vec::new()),
    }
}
