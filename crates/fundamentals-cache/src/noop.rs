//! No-op cache implementation.

use async_trait::async_trait;
use fundamentals_core::{CompanyFacts, RawFactsCache, Result, Symbol};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// A cache that never stores anything.
///
/// Every lookup misses, so each freshness check fetches from the source.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

impl NoopCache {
    /// Create a new no-op cache.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RawFactsCache for NoopCache {
    async fn get(&self, _symbol: &Symbol) -> Result<Option<Arc<CompanyFacts>>> {
        trace!("NoopCache: get called, returning None");
        Ok(None)
    }

    async fn put(&self, _symbol: &Symbol, _facts: Arc<CompanyFacts>) -> Result<()> {
        trace!("NoopCache: put called, doing nothing");
        Ok(())
    }

    async fn invalidate(&self, _symbol: &Symbol) -> Result<()> {
        Ok(())
    }

    async fn invalidate_stale(&self, _ttl: Duration) -> Result<usize> {
        Ok(0)
    }

    async fn clear(&self) -> Result<()> {
        Ok(())
    }
}
