// Copyright (c) The pypi-package-stats Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! PyPI package metadata and download statistics reporter.

pub mod aggregate;
pub mod cache;
pub mod client;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod render;
pub mod report;
