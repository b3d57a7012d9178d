#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/fundamentals/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Normalized financial statements from SEC XBRL company facts.
//!
//! This crate ties the workspace together. It re-exports the core types, the
//! engine, the caches and the EDGAR source, and provides a
//! [`FundamentalsManager`] that keeps each company's stored statements in
//! step with its latest filing.
//!
//! # Example
//!
//! ```rust,ignore
//! use fundamentals::{FundamentalsConfig, FundamentalsManager, Symbol};
//!
//! #[tokio::main]
//! async fn main() -> fundamentals::Result<()> {
//!     let config = FundamentalsConfig::load()?;
//!     let manager = FundamentalsManager::from_config(&config)?;
//!
//!     let symbol = Symbol::new("RDDT");
//!     if let Some(income) = manager.income_statement(&symbol).await? {
//!         for fact in income.facts {
//!             println!("{} {} = {}", fact.period, fact.concept, fact.value);
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

// Core types and traits
pub use fundamentals_core::*;

// Engine
pub use fundamentals_engine::{
    DerivationEngine, DerivationOperator, DerivationTarget, PeriodIndex, StatementOutput,
    StatementPipeline,
};

// Cache implementations
pub use fundamentals_cache::{EvictionPolicy, InMemoryFactsCache, NoopCache};

// Sources
pub use fundamentals_edgar::EdgarProvider;

/// Layered configuration.
pub mod config;
/// Per-company exclusive lock.
pub mod lock;
/// Freshness-gated statement access.
pub mod manager;
/// On-disk fact store.
pub mod store;

pub use config::FundamentalsConfig;
pub use lock::CompanyLock;
pub use manager::{Freshness, FundamentalsManager};
pub use store::FactStore;
