// Copyright (c) The pypi-package-stats Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Disk-backed cache for raw API responses.

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use std::sync::Mutex;
use tracing::debug;

/// On-disk cache of decoded JSON responses, keyed by request URL.
///
/// Backed by a single SQLite database under the platform cache directory.
/// SQLite's file locking makes the store safe for concurrent use from
/// multiple threads and processes; callers need no locking of their own.
/// Expired entries are evicted lazily when read.
pub struct ResponseCache {
    conn: Mutex<Connection>,
    path: Utf8PathBuf,
}

impl ResponseCache {
    /// Open the cache at the default platform location,
    /// e.g. `~/.cache/pypi-package-stats/api_cache.db` on Linux.
    pub fn open_default() -> Result<Self> {
        let base = dirs::cache_dir().context("could not determine the platform cache directory")?;
        let dir = Utf8PathBuf::from_path_buf(base.join("pypi-package-stats"))
            .map_err(|p| anyhow::anyhow!("cache directory path is not UTF-8: {}", p.display()))?;
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create cache directory at {}", dir))?;
        Self::open(&dir.join("api_cache.db"))
    }

    /// Open (creating if necessary) a cache database at the given path.
    pub fn open(path: &Utf8Path) -> Result<Self> {
        let conn = Connection::open(path.as_std_path())
            .with_context(|| format!("failed to open cache database at {}", path))?;

        // Note: journal_mode persists in the database file; busy_timeout is
        // per-connection and must be set each time.
        conn.execute_batch(
            r#"
            -- WAL allows concurrent readers while another process writes (PERSISTENT)
            PRAGMA journal_mode = WAL;

            -- NORMAL is safe with WAL and much faster than FULL (PERSISTENT)
            PRAGMA synchronous = NORMAL;

            -- Wait instead of failing when another process holds the write lock (PER-CONNECTION)
            PRAGMA busy_timeout = 5000;
            "#,
        )
        .context("failed to set cache database pragmas")?;

        conn.execute_batch(
            r#"
            -- Raw API responses keyed by request URL
            CREATE TABLE IF NOT EXISTS api_cache (
                url TEXT NOT NULL PRIMARY KEY,
                body TEXT NOT NULL,              -- JSON response body
                expires_at INTEGER NOT NULL      -- Unix timestamp (seconds)
            ) WITHOUT ROWID;
            "#,
        )
        .context("failed to initialize cache schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
            path: path.to_owned(),
        })
    }

    /// Look up a cached response. Returns `None` for keys never written and
    /// for entries whose expiration has passed; expired rows are deleted on
    /// the way out.
    pub fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let conn = self.conn.lock().expect("cache lock poisoned");

        let row: Option<(String, i64)> = conn
            .query_row(
                "SELECT body, expires_at FROM api_cache WHERE url = ?1",
                [key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .context("failed to read cache entry")?;

        let Some((body, expires_at)) = row else {
            debug!(key, "cache miss");
            return Ok(None);
        };

        if expires_at <= Utc::now().timestamp() {
            debug!(key, "cache entry expired");
            conn.execute("DELETE FROM api_cache WHERE url = ?1", [key])
                .context("failed to evict expired cache entry")?;
            return Ok(None);
        }

        debug!(key, "cache hit");
        let value = serde_json::from_str(&body).context("failed to decode cached response")?;
        Ok(Some(value))
    }

    /// Store a response, overwriting any existing entry for the key.
    pub fn set(&self, key: &str, value: &serde_json::Value, ttl_secs: u64) -> Result<()> {
        let body = serde_json::to_string(value).context("failed to encode response for cache")?;
        let expires_at = Utc::now().timestamp() + ttl_secs as i64;

        let conn = self.conn.lock().expect("cache lock poisoned");
        conn.execute(
            "INSERT OR REPLACE INTO api_cache (url, body, expires_at) VALUES (?1, ?2, ?3)",
            params![key, body, expires_at],
        )
        .context("failed to write cache entry")?;
        Ok(())
    }

    /// Remove all entries unconditionally.
    pub fn clear(&self) -> Result<()> {
        let conn = self.conn.lock().expect("cache lock poisoned");
        conn.execute("DELETE FROM api_cache", [])
            .context("failed to clear cache")?;
        Ok(())
    }

    /// Current entry count. Expired-but-unread rows are still counted until
    /// `get` evicts them.
    pub fn len(&self) -> Result<usize> {
        let conn = self.conn.lock().expect("cache lock poisoned");
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM api_cache", [], |row| row.get(0))
            .context("failed to count cache entries")?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Location of the cache database on disk.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_cache() -> (tempfile::TempDir, ResponseCache) {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("api_cache.db")).unwrap();
        let cache = ResponseCache::open(&path).unwrap();
        (dir, cache)
    }

    #[test]
    fn test_set_then_get_roundtrip() {
        let (_dir, cache) = temp_cache();
        let value = json!({"data": {"last_day": 100}});

        cache
            .set("https://example.org/api/recent", &value, 3600)
            .unwrap();
        let fetched = cache.get("https://example.org/api/recent").unwrap();
        assert_eq!(fetched, Some(value));
    }

    #[test]
    fn test_get_missing_key() {
        let (_dir, cache) = temp_cache();
        assert_eq!(cache.get("https://example.org/never-written").unwrap(), None);
    }

    #[test]
    fn test_expired_entry_is_absent_and_evicted() {
        let (_dir, cache) = temp_cache();
        let value = json!([1, 2, 3]);

        // TTL of zero expires immediately.
        cache.set("https://example.org/stale", &value, 0).unwrap();
        assert_eq!(cache.len().unwrap(), 1);
        assert_eq!(cache.get("https://example.org/stale").unwrap(), None);

        // The expired row was evicted on read.
        assert_eq!(cache.len().unwrap(), 0);
    }

    #[test]
    fn test_set_overwrites_existing_entry() {
        let (_dir, cache) = temp_cache();

        cache.set("https://example.org/k", &json!(1), 3600).unwrap();
        cache.set("https://example.org/k", &json!(2), 3600).unwrap();

        assert_eq!(cache.get("https://example.org/k").unwrap(), Some(json!(2)));
        assert_eq!(cache.len().unwrap(), 1);
    }

    #[test]
    fn test_clear_removes_everything() {
        let (_dir, cache) = temp_cache();

        for i in 0..5 {
            cache
                .set(&format!("https://example.org/{i}"), &json!(i), 3600)
                .unwrap();
        }
        assert_eq!(cache.len().unwrap(), 5);

        cache.clear().unwrap();
        assert_eq!(cache.len().unwrap(), 0);
        assert!(cache.is_empty().unwrap());
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("api_cache.db")).unwrap();
        let value = json!({"name": "requests"});

        {
            let cache = ResponseCache::open(&path).unwrap();
            cache.set("https://example.org/info", &value, 3600).unwrap();
        }

        let cache = ResponseCache::open(&path).unwrap();
        assert_eq!(cache.get("https://example.org/info").unwrap(), Some(value));
    }

    #[test]
    fn test_concurrent_writers() {
        use std::sync::Arc;

        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("api_cache.db")).unwrap();
        let cache = Arc::new(ResponseCache::open(&path).unwrap());

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..10 {
                        cache
                            .set(&format!("https://example.org/{t}/{i}"), &json!(i), 3600)
                            .unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len().unwrap(), 40);
    }
}
