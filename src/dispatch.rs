// Copyright (c) The pypi-package-stats Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! CLI argument parsing and command dispatch.

use crate::commands::{self, StatsOptions};
use crate::config;
use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: Utf8PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Parser, Debug)]
enum Command {
    /// Fetch metadata and download statistics for a package
    Stats {
        /// Package name
        package: String,

        /// Emit the report as JSON instead of text
        #[arg(short, long)]
        json: bool,

        /// Disable the response cache for this query
        #[arg(long)]
        no_cache: bool,

        /// Cache TTL in seconds (0 disables caching)
        #[arg(long)]
        cache_ttl: Option<u64>,
    },

    /// Manage the response cache
    Cache {
        #[command(subcommand)]
        cache_command: CacheCommand,
    },
}

#[derive(Parser, Debug)]
enum CacheCommand {
    /// Remove all cached API responses
    Clear,

    /// Show cache entry count and on-disk location
    Info,
}

/// Parse arguments and dispatch to the appropriate command.
pub async fn dispatch() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Stats {
            package,
            json,
            no_cache,
            cache_ttl,
        } => {
            let config =
                config::Config::load(&args.config).context("failed to load configuration")?;
            commands::run_stats(
                &config,
                &package,
                StatsOptions {
                    json,
                    no_cache,
                    cache_ttl,
                },
            )
            .await?;
        }
        Command::Cache { cache_command } => match cache_command {
            CacheCommand::Clear => commands::run_cache_clear()?,
            CacheCommand::Info => commands::run_cache_info()?,
        },
    }

    Ok(())
}
