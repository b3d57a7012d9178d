//! Cache trait for raw company facts.
//!
//! This module defines the [`RawFactsCache`] trait. A cache is an explicit
//! object owned by the orchestrator and keyed by ticker, so tests can inject a
//! pre-populated or empty one.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::{error::Result, facts::CompanyFacts, types::Symbol};

/// Trait for caching fetched raw facts within a process.
#[async_trait]
pub trait RawFactsCache: Send + Sync {
    /// Retrieves cached raw facts for a company.
    ///
    /// Returns `Ok(Some(facts))` if cached, `Ok(None)` if not cached.
    async fn get(&self, symbol: &Symbol) -> Result<Option<Arc<CompanyFacts>>>;

    /// Stores raw facts for a company.
    async fn put(&self, symbol: &Symbol, facts: Arc<CompanyFacts>) -> Result<()>;

    /// Removes one company's entry, if present.
    async fn invalidate(&self, symbol: &Symbol) -> Result<()>;

    /// Removes cache entries older than the specified TTL.
    ///
    /// Returns the number of entries invalidated.
    async fn invalidate_stale(&self, ttl: Duration) -> Result<usize>;

    /// Clears all cached data.
    async fn clear(&self) -> Result<()>;
}
