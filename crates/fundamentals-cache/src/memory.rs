//! In-memory raw facts cache.

use async_trait::async_trait;
use chrono::Utc;
use fundamentals_core::{CompanyFacts, RawFactsCache, Result, Symbol};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// How the in-memory cache drops entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// Entries live for the lifetime of the cache.
    #[default]
    Unbounded,
    /// Entries older than the duration are treated as misses and dropped.
    TimeToLive(Duration),
    /// At most this many companies are kept; the oldest entry is evicted first.
    Capacity(usize),
}

/// Cache entry with timestamp for TTL-based invalidation.
#[derive(Debug, Clone)]
struct CacheEntry {
    data: Arc<CompanyFacts>,
    cached_at: chrono::DateTime<Utc>,
}

impl CacheEntry {
    fn new(data: Arc<CompanyFacts>) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    fn is_stale(&self, ttl: Duration) -> bool {
        let age = Utc::now().signed_duration_since(self.cached_at);
        age > chrono::TimeDelta::from_std(ttl).unwrap_or(chrono::TimeDelta::MAX)
    }
}

/// Process-local cache of fetched company facts, keyed by ticker.
///
/// Facts are shared as `Arc`s, so a hit never copies the fact table.
#[derive(Debug, Default)]
pub struct InMemoryFactsCache {
    policy: EvictionPolicy,
    entries: RwLock<HashMap<Symbol, CacheEntry>>,
}

impl InMemoryFactsCache {
    /// Creates an unbounded cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache with the given eviction policy.
    #[must_use]
    pub fn with_policy(policy: EvictionPolicy) -> Self {
        Self {
            policy,
            entries: RwLock::default(),
        }
    }

    /// Returns the eviction policy.
    #[must_use]
    pub const fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    /// Number of cached companies.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns true if nothing is cached.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl RawFactsCache for InMemoryFactsCache {
    #[instrument(skip(self), fields(symbol = %symbol))]
    async fn get(&self, symbol: &Symbol) -> Result<Option<Arc<CompanyFacts>>> {
        {
            let cache = self.entries.read().await;
            match cache.get(symbol) {
                Some(entry) => match self.policy {
                    EvictionPolicy::TimeToLive(ttl) if entry.is_stale(ttl) => {}
                    _ => {
                        debug!("Cache hit for company facts");
                        return Ok(Some(Arc::clone(&entry.data)));
                    }
                },
                None => {
                    debug!("Cache miss for company facts");
                    return Ok(None);
                }
            }
        }

        // Expired: drop it so the next fetch replaces it.
        self.entries.write().await.remove(symbol);
        debug!("Cache entry expired");
        Ok(None)
    }

    #[instrument(skip(self, facts), fields(symbol = %symbol, facts = facts.len()))]
    async fn put(&self, symbol: &Symbol, facts: Arc<CompanyFacts>) -> Result<()> {
        let mut cache = self.entries.write().await;
        cache.insert(symbol.clone(), CacheEntry::new(facts));

        if let EvictionPolicy::Capacity(capacity) = self.policy {
            while cache.len() > capacity.max(1) {
                let oldest = cache
                    .iter()
                    .min_by_key(|(_, entry)| entry.cached_at)
                    .map(|(key, _)| key.clone());
                let Some(oldest) = oldest else {
                    break;
                };
                cache.remove(&oldest);
                debug!(evicted = %oldest, "Evicted oldest cache entry");
            }
        }

        debug!("Cached company facts");
        Ok(())
    }

    #[instrument(skip(self), fields(symbol = %symbol))]
    async fn invalidate(&self, symbol: &Symbol) -> Result<()> {
        if self.entries.write().await.remove(symbol).is_some() {
            debug!("Invalidated cache entry");
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn invalidate_stale(&self, ttl: Duration) -> Result<usize> {
        let mut cache = self.entries.write().await;
        let before = cache.len();
        cache.retain(|_, entry| !entry.is_stale(ttl));
        let removed = before - cache.len();

        if removed > 0 {
            debug!("Invalidated {} stale cache entries", removed);
        }
        Ok(removed)
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<()> {
        self.entries.write().await.clear();
        debug!("Cleared all cache entries");
        Ok(())
    }
}
