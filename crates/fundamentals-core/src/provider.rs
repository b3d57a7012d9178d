//! Source trait for fetching raw company facts.
//!
//! The normalization pipeline never talks to the network directly; it pulls
//! raw facts through a [`CompanyFactsSource`]. The SEC implementation lives in
//! `fundamentals-edgar`, and tests substitute in-memory sources.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::{error::Result, facts::CompanyFacts, types::Symbol};

/// Provider of raw company facts.
#[async_trait]
pub trait CompanyFactsSource: Send + Sync + Debug {
    /// Returns the name of this source (e.g., "SEC EDGAR").
    fn name(&self) -> &str;

    /// Fetches the full raw fact table for a company.
    ///
    /// # Errors
    /// Returns [`FundamentalsError::SymbolNotFound`](crate::FundamentalsError::SymbolNotFound)
    /// if the ticker cannot be resolved, or a network/parse error if the
    /// download fails.
    async fn fetch_company_facts(&self, symbol: &Symbol) -> Result<CompanyFacts>;

    /// Checks if a symbol is supported by this source.
    ///
    /// Default implementation attempts a full fetch.
    async fn supports_symbol(&self, symbol: &Symbol) -> Result<bool> {
        match self.fetch_company_facts(symbol).await {
            Ok(_) => Ok(true),
            Err(crate::FundamentalsError::SymbolNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
