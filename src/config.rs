// Copyright (c) The pypi-package-stats Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for package statistics queries.

use anyhow::{Context, Result};
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use std::fs;

/// Default cache TTL in seconds (1 hour).
pub const DEFAULT_CACHE_TTL: u64 = 3600;
/// Number of top Python versions to report.
pub const TOP_PYTHON_VERSIONS_COUNT: usize = 5;
/// Number of top operating systems to report.
pub const TOP_OS_COUNT: usize = 4;

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Cache TTL in seconds. 0 disables caching; unset uses the default.
    #[serde(default)]
    pub cache_ttl: Option<u64>,

    #[serde(default = "default_python_limit")]
    pub top_python_versions: usize,

    #[serde(default = "default_os_limit")]
    pub top_operating_systems: usize,
}

fn default_python_limit() -> usize {
    TOP_PYTHON_VERSIONS_COUNT
}

fn default_os_limit() -> usize {
    TOP_OS_COUNT
}

impl Config {
    /// Load configuration from a TOML file. A missing file yields defaults.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        if !path.as_std_path().exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path.as_std_path())
            .with_context(|| format!("failed to read config file at {}", path))?;

        toml::from_str(&content).with_context(|| format!("failed to parse config file at {}", path))
    }

    /// Effective TTL after applying the default for an unset value.
    pub fn effective_cache_ttl(&self) -> u64 {
        self.cache_ttl.unwrap_or(DEFAULT_CACHE_TTL)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_ttl: None,
            top_python_versions: TOP_PYTHON_VERSIONS_COUNT,
            top_operating_systems: TOP_OS_COUNT,
        }
    }
}
