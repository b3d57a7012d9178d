//! Core data types for normalized financial statements.
//!
//! This module defines the fundamental data structures:
//!
//! - [`Symbol`] - Company ticker
//! - [`StatementType`] - The three supported statements
//! - [`NormalizedFact`] - One canonical value with its provenance
//! - [`StatementDocument`] / [`DerivedDocument`] - Persisted envelopes
//! - [`FreshnessRecord`] - What the stored output was computed from

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::FundamentalsError;
use crate::facts::RawObservation;
use crate::period::Period;

/// A company ticker.
///
/// Symbols are automatically uppercased on creation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Symbol(String);

impl Symbol {
    /// Creates a new symbol from a string, converting to uppercase.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().trim().to_uppercase())
    }

    /// Returns the symbol as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Symbol {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Financial statement identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementType {
    /// Income statement.
    IncomeStatement,
    /// Balance sheet.
    BalanceSheet,
    /// Cash flow statement.
    CashFlowStatement,
}

impl StatementType {
    /// Every statement type, in the order they are processed.
    pub const ALL: [Self; 3] = [
        Self::IncomeStatement,
        Self::BalanceSheet,
        Self::CashFlowStatement,
    ];

    /// Returns the stable identifier used in registries and file names.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::IncomeStatement => "income_statement",
            Self::BalanceSheet => "balance_sheet",
            Self::CashFlowStatement => "cash_flow_statement",
        }
    }
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatementType {
    type Err = FundamentalsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|statement| statement.as_str() == s)
            .ok_or_else(|| FundamentalsError::InvalidParameter(format!("Unknown statement: {s}")))
    }
}

/// Confidence attached to a derived fact.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Computed exactly from reported operands.
    #[default]
    High,
    /// Computed with some approximation.
    Medium,
    /// Best-effort estimate.
    Low,
}

/// Where a normalized value came from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Provenance {
    /// Taken directly from a filing.
    Reported {
        /// Form of the filing the value was taken from.
        source_form: String,
        /// Date that filing was accepted.
        filed_date: NaiveDate,
    },
    /// Computed from other normalized facts.
    Derived {
        /// Operand concepts, in operator order.
        derived_from: Vec<String>,
        /// Operator that produced the value.
        derivation_type: String,
        /// Confidence in the computed value.
        confidence: Confidence,
    },
}

/// The canonical output unit: one value for one concept and period.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizedFact {
    /// Company the fact belongs to.
    pub company: Symbol,
    /// Statement the fact belongs to.
    pub statement: StatementType,
    /// Canonical concept name (e.g. `operating_cash_flow`).
    pub concept: String,
    /// Value.
    pub value: f64,
    /// Currency or unit code.
    pub currency: String,
    /// Canonical period label.
    pub period: Period,
    /// True for values taken from a filing, false for derived values.
    pub reported: bool,
    /// Source filing or derivation details.
    #[serde(flatten)]
    pub provenance: Provenance,
}

impl NormalizedFact {
    /// Creates a reported fact from the authoritative observation for a period.
    #[must_use]
    pub fn reported(
        company: Symbol,
        statement: StatementType,
        concept: impl Into<String>,
        period: Period,
        observation: &RawObservation,
    ) -> Self {
        Self {
            company,
            statement,
            concept: concept.into(),
            value: observation.value,
            currency: observation.unit.clone(),
            period,
            reported: true,
            provenance: Provenance::Reported {
                source_form: observation.form.clone().unwrap_or_default(),
                filed_date: observation.filed,
            },
        }
    }

    /// Creates a derived fact.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn derived(
        company: Symbol,
        statement: StatementType,
        concept: impl Into<String>,
        period: Period,
        value: f64,
        currency: impl Into<String>,
        derived_from: Vec<String>,
        derivation_type: impl Into<String>,
    ) -> Self {
        Self {
            company,
            statement,
            concept: concept.into(),
            value,
            currency: currency.into(),
            period,
            reported: false,
            provenance: Provenance::Derived {
                derived_from,
                derivation_type: derivation_type.into(),
                confidence: Confidence::High,
            },
        }
    }

    /// Sets the confidence of a derived fact. No effect on reported facts.
    #[must_use]
    pub fn with_confidence(mut self, level: Confidence) -> Self {
        if let Provenance::Derived { confidence, .. } = &mut self.provenance {
            *confidence = level;
        }
        self
    }
}

/// Persisted envelope for a statement's normalized facts.
///
/// Also used for the combined view of normalized and derived facts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatementDocument {
    /// Company.
    pub company: Symbol,
    /// Statement.
    pub statement: StatementType,
    /// Facts, in pipeline order.
    pub facts: Vec<NormalizedFact>,
}

impl StatementDocument {
    /// Creates a document.
    #[must_use]
    pub const fn new(company: Symbol, statement: StatementType, facts: Vec<NormalizedFact>) -> Self {
        Self {
            company,
            statement,
            facts,
        }
    }

    /// Appends the derived facts, producing the combined view.
    #[must_use]
    pub fn merge(mut self, derived: DerivedDocument) -> Self {
        self.facts.extend(derived.facts);
        self
    }
}

/// Persisted envelope for a statement's derived facts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DerivedDocument {
    /// Company.
    pub company: Symbol,
    /// Statement.
    pub statement: StatementType,
    /// Latest filed date of the raw facts these values were computed from.
    pub processed_date: Option<NaiveDate>,
    /// Derived facts.
    pub facts: Vec<NormalizedFact>,
}

/// Per-company record of what the stored output was computed from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreshnessRecord {
    /// Company.
    pub company: Symbol,
    /// Latest filed date of the raw facts used; `None` if none were dated.
    pub processed_date: Option<NaiveDate>,
    /// Statements whose output was written.
    #[serde(default)]
    pub statements: Vec<StatementType>,
}

impl FreshnessRecord {
    /// Returns true if this record covers raw data filed up to `latest_filed`.
    ///
    /// Undated raw data is never covered, so it always triggers recomputation.
    #[must_use]
    pub fn covers(&self, latest_filed: Option<NaiveDate>) -> bool {
        match (self.processed_date, latest_filed) {
            (Some(processed), Some(latest)) => processed >= latest,
            _ => false,
        }
    }

    /// Returns true if output for `statement` was recorded.
    #[must_use]
    pub fn has_statement(&self, statement: StatementType) -> bool {
        self.statements.contains(&statement)
    }
}
