// Copyright (c) The pypi-package-stats Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error taxonomy for package statistics queries.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StatsError>;

#[derive(Error, Debug)]
pub enum StatsError {
    /// The caller supplied an empty or whitespace-only package name.
    #[error("package name cannot be empty")]
    InvalidPackageName,

    /// The upstream API returned 404 for this package.
    #[error("package '{package}' not found on PyPI")]
    PackageNotFound { package: String },

    /// A retryable status kept recurring until the retry budget ran out.
    #[error("retries exhausted after {attempts} attempts (last status {status})")]
    RetriesExhausted { attempts: u32, status: u16 },

    /// Any other non-2xx response, or a network-level failure.
    #[error("API error{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Api {
        status: Option<u16>,
        message: String,
    },

    /// A failure not classified above, e.g. a malformed JSON body.
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl StatsError {
    /// Status code attached to this error, when one is available.
    pub fn status(&self) -> Option<u16> {
        match self {
            StatsError::RetriesExhausted { status, .. } => Some(*status),
            StatsError::Api { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for StatsError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            StatsError::Unexpected(format!("failed to decode response body: {err}"))
        } else {
            StatsError::Api {
                status: err.status().map(|s| s.as_u16()),
                message: format!("network error: {err}"),
            }
        }
    }
}
