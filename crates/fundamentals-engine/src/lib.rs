#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/fundamentals/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Fact normalization and derivation engine.
//!
//! - [`select_authoritative`](selector::select_authoritative) - One observation per period
//! - [`DirectFactNormalizer`](normalizer::DirectFactNormalizer) - Reported facts per concept
//! - [`DerivationEngine`](derivation::DerivationEngine) - Derived facts via registered operators
//! - [`StatementPipeline`](pipeline::StatementPipeline) - All statements for one company

/// Derivation operators and the operator registry.
pub mod derivation;
/// Direct fact normalization.
pub mod normalizer;
/// Per-company statement pipeline.
pub mod pipeline;
/// Authoritative fact selection.
pub mod selector;

pub use derivation::{
    BINARY_SUBTRACTION, BinarySubtraction, DerivationEngine, DerivationOperator,
    DerivationTarget, PeriodIndex,
};
pub use normalizer::DirectFactNormalizer;
pub use pipeline::{StatementOutput, StatementPipeline};
pub use selector::{form_priority, group_by_period, select_authoritative};
