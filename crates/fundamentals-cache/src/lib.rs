#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/fundamentals/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Raw facts caches.
//!
//! This crate provides implementations of the [`RawFactsCache`] trait from `fundamentals-core`:
//!
//! - [`InMemoryFactsCache`] - Process-local cache with an [`EvictionPolicy`]
//! - [`NoopCache`] - Cache that never stores anything

/// In-memory cache implementation.
pub mod memory;
/// No-op cache implementation.
pub mod noop;

// Re-export the trait for convenience
pub use fundamentals_core::RawFactsCache;

pub use memory::{EvictionPolicy, InMemoryFactsCache};
pub use noop::NoopCache;
