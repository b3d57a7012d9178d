//! Error types for fundamentals operations.
//!
//! This module defines [`FundamentalsError`], which covers the failures that
//! propagate out of the pipeline. Missing concepts, rejected periods and absent
//! derivation operands are not errors. They are logged and skipped where they
//! occur.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while fetching, normalizing or storing fundamentals.
#[derive(Error, Debug)]
pub enum FundamentalsError {
    /// Network-related errors (connection failures, timeouts, HTTP status).
    #[error("Network error: {0}")]
    Network(String),

    /// The requested ticker could not be resolved.
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// Error parsing data from a source or from storage.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Filesystem error at a storage boundary.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// The path being read or written.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The concept registry could not be loaded.
    #[error("Registry error: {0}")]
    Registry(String),

    /// The per-company lock could not be acquired in time.
    #[error("Timed out after {waited:?} waiting for the lock on {company}")]
    LockTimeout {
        /// The company whose lock was contended.
        company: String,
        /// How long the caller waited.
        waited: Duration,
    },

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error interacting with the raw facts cache.
    #[error("Cache error: {0}")]
    Cache(String),

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The requested feature is not supported.
    #[error("Feature not supported: {0}")]
    NotSupported(String),

    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl FundamentalsError {
    /// Wraps an I/O error with the path it occurred at.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns true if retrying the same call later may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::LockTimeout { .. })
    }
}

/// Result type alias using [`FundamentalsError`].
pub type Result<T> = std::result::Result<T, FundamentalsError>;
