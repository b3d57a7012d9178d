#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/fundamentals/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for normalized company fundamentals.
//!
//! This crate provides the foundational abstractions:
//!
//! - [`CompanyFacts`](facts::CompanyFacts) - Raw SEC fact table
//! - [`RawObservation`](facts::RawObservation) - One typed reported value
//! - [`classify`](period::classify) - Period classifier
//! - [`ConceptRegistry`](registry::ConceptRegistry) - Concept specs per statement
//! - [`NormalizedFact`](types::NormalizedFact) - Canonical output unit
//! - [`CompanyFactsSource`](provider::CompanyFactsSource) - Raw data source
//! - [`RawFactsCache`](cache::RawFactsCache) - Caching abstraction

/// Cache trait for raw company facts.
pub mod cache;
/// Error types for fundamentals operations.
pub mod error;
/// Raw SEC company facts and typed observations.
pub mod facts;
/// Fiscal periods and the period classifier.
pub mod period;
/// Source trait for fetching raw facts.
pub mod provider;
/// Concept registry.
pub mod registry;
/// Core data types (Symbol, NormalizedFact, etc.).
pub mod types;

// Re-export commonly used items at crate root
pub use cache::RawFactsCache;
pub use error::{FundamentalsError, Result};
pub use facts::{CompanyFacts, FactValue, RawObservation, TagFacts};
pub use period::{FiscalPeriod, Period, classify};
pub use provider::CompanyFactsSource;
pub use registry::{
    ConceptRegistry, ConceptSpec, Constraints, DerivedSpec, DirectSpec, StatementRegistry,
};
pub use types::{
    Confidence, DerivedDocument, FreshnessRecord, NormalizedFact, Provenance, StatementDocument,
    StatementType, Symbol,
};
