// Copyright (c) The pypi-package-stats Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command implementations.

use crate::cache::ResponseCache;
use crate::client::StatsClient;
use crate::config::Config;
use crate::{render, report};
use anyhow::{Context, Result};
use std::sync::Arc;

/// Options for the stats command, resolved from CLI flags.
#[derive(Debug, Default)]
pub struct StatsOptions {
    pub json: bool,
    pub no_cache: bool,
    pub cache_ttl: Option<u64>,
}

/// Run the stats command: fetch, assemble, render.
pub async fn run_stats(config: &Config, package: &str, options: StatsOptions) -> Result<()> {
    // CLI flags take precedence over the config file.
    let ttl = if options.no_cache {
        0
    } else {
        options.cache_ttl.unwrap_or(config.effective_cache_ttl())
    };

    let cache = if ttl == 0 {
        None
    } else {
        Some(Arc::new(
            ResponseCache::open_default().context("failed to open the response cache")?,
        ))
    };

    let client = StatsClient::new(cache, Some(ttl))?;
    let report = report::build_report(
        &client,
        package,
        config.top_python_versions,
        config.top_operating_systems,
    )
    .await?;

    if options.json {
        render::print_json(&report)?;
    } else {
        render::print_report(&report);
    }

    Ok(())
}

/// Clear the response cache.
pub fn run_cache_clear() -> Result<()> {
    let cache = ResponseCache::open_default().context("failed to open the response cache")?;
    cache.clear()?;
    println!("Cache cleared.");
    Ok(())
}

/// Show the response cache entry count and location.
pub fn run_cache_info() -> Result<()> {
    let cache = ResponseCache::open_default().context("failed to open the response cache")?;
    println!("Entries   : {}", cache.len()?);
    println!("Location  : {}", cache.path());
    Ok(())
}
