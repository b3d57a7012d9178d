//! Concept registry: which tags feed which canonical concepts.
//!
//! The registry is a versioned JSON document shaped as
//! `statement → { concept → spec }`. Each spec is either retrieved directly
//! from a tag or derived from other concepts of the same statement:
//!
//! ```json
//! {
//!   "cash_flow_statement": {
//!     "operating_cash_flow": {
//!       "tag": "NetCashProvidedByUsedInOperatingActivities",
//!       "retrieval": "direct"
//!     },
//!     "free_cash_flow": {
//!       "retrieval": "derived",
//!       "derived_from": ["operating_cash_flow", "capital_expenditure"],
//!       "derivation_type": "binary_subtraction",
//!       "statement": "cash_flow_statement",
//!       "constraints": { "same_currency": true }
//!     }
//!   }
//! }
//! ```
//!
//! Concepts keep the order they have in the document, and statements are
//! processed in that order.
//!
//! Entries that are null, malformed or use an unknown retrieval mode are
//! skipped; see [`ConceptRegistry::skipped`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{FundamentalsError, Result};
use crate::types::StatementType;

/// Default taxonomy for direct concepts.
pub const DEFAULT_TAXONOMY: &str = "us-gaap";

/// Default unit for direct concepts.
pub const DEFAULT_UNIT: &str = "USD";

fn default_taxonomy() -> String {
    DEFAULT_TAXONOMY.to_string()
}

fn default_unit() -> String {
    DEFAULT_UNIT.to_string()
}

/// How a concept is obtained.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "retrieval", rename_all = "snake_case")]
pub enum ConceptSpec {
    /// Taken from a source tag.
    Direct(DirectSpec),
    /// Computed from other concepts.
    Derived(DerivedSpec),
}

/// A concept read straight from the raw facts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectSpec {
    /// Source tag (e.g. `NetCashProvidedByUsedInOperatingActivities`).
    pub tag: String,
    /// Taxonomy the tag lives in.
    #[serde(default = "default_taxonomy")]
    pub taxonomy: String,
    /// Unit to read.
    #[serde(default = "default_unit")]
    pub unit: String,
}

impl DirectSpec {
    /// Creates a spec for a `us-gaap` tag reported in USD.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            taxonomy: default_taxonomy(),
            unit: default_unit(),
        }
    }
}

/// A concept computed from other normalized concepts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedSpec {
    /// Operand concepts, in operator order.
    pub derived_from: Vec<String>,
    /// Operator name (e.g. `binary_subtraction`).
    pub derivation_type: String,
    /// Statement the result belongs to; defaults to the registry section.
    #[serde(default)]
    pub statement: Option<StatementType>,
    /// Data-quality constraints.
    #[serde(default)]
    pub constraints: Constraints,
}

impl DerivedSpec {
    /// Creates a derived spec with no constraints.
    #[must_use]
    pub fn new(derived_from: Vec<String>, derivation_type: impl Into<String>) -> Self {
        Self {
            derived_from,
            derivation_type: derivation_type.into(),
            statement: None,
            constraints: Constraints::default(),
        }
    }

    /// Requires operands to share a currency.
    #[must_use]
    pub const fn with_same_currency(mut self) -> Self {
        self.constraints.same_currency = true;
        self
    }
}

/// Constraints applied before a derivation is computed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraints {
    /// Skip periods whose operands are in different currencies.
    #[serde(default)]
    pub same_currency: bool,
}

/// The concepts of one statement, split by retrieval mode.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatementRegistry {
    /// Direct concepts in registry order, keyed by concept name.
    pub direct: IndexMap<String, DirectSpec>,
    /// Derived concepts in registry order, keyed by concept name.
    pub derived: IndexMap<String, DerivedSpec>,
}

impl StatementRegistry {
    /// Returns true if the statement has no concepts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.direct.is_empty() && self.derived.is_empty()
    }

    /// Adds a concept.
    pub fn insert(&mut self, concept: impl Into<String>, spec: ConceptSpec) {
        let concept = concept.into();
        match spec {
            ConceptSpec::Direct(direct) => {
                self.direct.insert(concept, direct);
            }
            ConceptSpec::Derived(derived) => {
                self.derived.insert(concept, derived);
            }
        }
    }
}

/// A registry entry that could not be used.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedConcept {
    /// Registry section the entry was found in.
    pub section: String,
    /// Concept name.
    pub concept: String,
    /// Why it was skipped.
    pub reason: String,
}

/// Concept specs for every statement, loaded once per run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConceptRegistry {
    statements: HashMap<StatementType, StatementRegistry>,
    skipped: Vec<SkippedConcept>,
}

impl ConceptRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a registry document.
    ///
    /// # Errors
    /// Returns [`FundamentalsError::Registry`] if the document is not a JSON
    /// object of objects. Individual bad entries are skipped, not errors.
    pub fn from_json(json: &str) -> Result<Self> {
        let sections: IndexMap<String, Option<IndexMap<String, serde_json::Value>>> =
            serde_json::from_str(json)
                .map_err(|e| FundamentalsError::Registry(format!("Invalid registry: {e}")))?;

        let mut registry = Self::new();
        for (section, concepts) in sections {
            let Ok(statement) = section.parse::<StatementType>() else {
                registry.skip(&section, "*", "unknown statement type");
                continue;
            };

            for (concept, raw) in concepts.unwrap_or_default() {
                if raw.is_null() {
                    registry.skip(&section, &concept, "empty entry");
                    continue;
                }
                match serde_json::from_value::<ConceptSpec>(raw) {
                    Ok(spec) => registry.insert(statement, concept, spec),
                    Err(e) => registry.skip(&section, &concept, &e.to_string()),
                }
            }
        }

        registry.skipped.sort_by(|a, b| {
            (a.section.as_str(), a.concept.as_str()).cmp(&(b.section.as_str(), b.concept.as_str()))
        });
        Ok(registry)
    }

    /// Reads and parses a registry file.
    ///
    /// # Errors
    /// Returns an I/O error if the file cannot be read, or a registry error if
    /// it is not valid JSON.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| FundamentalsError::io(path, e))?;
        Self::from_json(&json)
    }

    /// Adds a concept to a statement.
    pub fn insert(&mut self, statement: StatementType, concept: impl Into<String>, spec: ConceptSpec) {
        self.statements
            .entry(statement)
            .or_default()
            .insert(concept, spec);
    }

    /// Adds a concept, builder style.
    #[must_use]
    pub fn with_concept(
        mut self,
        statement: StatementType,
        concept: impl Into<String>,
        spec: ConceptSpec,
    ) -> Self {
        self.insert(statement, concept, spec);
        self
    }

    /// Returns the concepts of one statement.
    #[must_use]
    pub fn statement(&self, statement: StatementType) -> Option<&StatementRegistry> {
        self.statements.get(&statement)
    }

    /// Entries that were present in the source document but unusable.
    #[must_use]
    pub fn skipped(&self) -> &[SkippedConcept] {
        &self.skipped
    }

    /// Total number of usable concepts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.statements
            .values()
            .map(|s| s.direct.len() + s.derived.len())
            .sum()
    }

    /// Returns true if no concepts are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn skip(&mut self, section: &str, concept: &str, reason: &str) {
        self.skipped.push(SkippedConcept {
            section: section.to_string(),
            concept: concept.to_string(),
            reason: reason.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGISTRY: &str = r#"{
        "cash_flow_statement": {
            "operating_cash_flow": {
                "tag": "NetCashProvidedByUsedInOperatingActivities",
                "retrieval": "direct"
            },
            "capital_expenditure": {
                "tag": "PaymentsToAcquirePropertyPlantAndEquipment",
                "retrieval": "direct",
                "unit": "USD"
            },
            "free_cash_flow": {
                "retrieval": "derived",
                "derived_from": ["operating_cash_flow", "capital_expenditure"],
                "derivation_type": "binary_subtraction",
                "statement": "cash_flow_statement",
                "constraints": {"same_currency": true}
            },
            "dividends": null,
            "buybacks": {"tag": "PaymentsForRepurchaseOfCommonStock", "retrieval": "estimated"}
        },
        "income_statement": {
            "revenue": {"tag": "Revenues", "retrieval": "direct", "taxonomy": "ifrs-full", "unit": "EUR"}
        },
        "segment_report": {}
    }"#;

    #[test]
    fn test_parse_registry() {
        let registry = ConceptRegistry::from_json(REGISTRY).unwrap();
        assert_eq!(registry.len(), 4);

        let cash_flow = registry.statement(StatementType::CashFlowStatement).unwrap();
        assert_eq!(cash_flow.direct.len(), 2);
        assert_eq!(
            cash_flow.direct["operating_cash_flow"],
            DirectSpec::new("NetCashProvidedByUsedInOperatingActivities")
        );

        let fcf = &cash_flow.derived["free_cash_flow"];
        assert_eq!(fcf.derivation_type, "binary_subtraction");
        assert_eq!(fcf.derived_from, vec!["operating_cash_flow", "capital_expenditure"]);
        assert!(fcf.constraints.same_currency);
        assert_eq!(fcf.statement, Some(StatementType::CashFlowStatement));

        let income = registry.statement(StatementType::IncomeStatement).unwrap();
        assert_eq!(income.direct["revenue"].taxonomy, "ifrs-full");
        assert_eq!(income.direct["revenue"].unit, "EUR");

        assert!(registry.statement(StatementType::BalanceSheet).is_none());
    }

    #[test]
    fn test_unusable_entries_are_skipped() {
        let registry = ConceptRegistry::from_json(REGISTRY).unwrap();
        let skipped: Vec<_> = registry
            .skipped()
            .iter()
            .map(|s| (s.section.as_str(), s.concept.as_str()))
            .collect();
        assert_eq!(
            skipped,
            vec![
                ("cash_flow_statement", "buybacks"),
                ("cash_flow_statement", "dividends"),
                ("segment_report", "*"),
            ]
        );
    }

    #[test]
    fn test_invalid_document_is_an_error() {
        assert!(matches!(
            ConceptRegistry::from_json("[1, 2]"),
            Err(FundamentalsError::Registry(_))
        ));
        assert!(matches!(
            ConceptRegistry::from_path("/nonexistent/registry.json"),
            Err(FundamentalsError::Io { .. })
        ));
    }

    #[test]
    fn test_concepts_keep_document_order() {
        let registry = ConceptRegistry::from_json(
            r#"{
                "balance_sheet": {
                    "total_liabilities": {"tag": "Liabilities", "retrieval": "direct"},
                    "cash": {"tag": "CashAndCashEquivalentsAtCarryingValue", "retrieval": "direct"},
                    "working_capital": {
                        "retrieval": "derived",
                        "derived_from": ["current_assets", "current_liabilities"],
                        "derivation_type": "binary_subtraction"
                    },
                    "accounts_payable": {"tag": "AccountsPayableCurrent", "retrieval": "direct"},
                    "net_debt": {
                        "retrieval": "derived",
                        "derived_from": ["total_debt", "cash"],
                        "derivation_type": "binary_subtraction"
                    }
                }
            }"#,
        )
        .unwrap();

        let balance = registry.statement(StatementType::BalanceSheet).unwrap();
        assert_eq!(
            balance.direct.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["total_liabilities", "cash", "accounts_payable"]
        );
        assert_eq!(
            balance.derived.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["working_capital", "net_debt"]
        );
    }

    #[test]
    fn test_builder() {
        let registry = ConceptRegistry::new()
            .with_concept(
                StatementType::BalanceSheet,
                "total_assets",
                ConceptSpec::Direct(DirectSpec::new("Assets")),
            )
            .with_concept(
                StatementType::BalanceSheet,
                "net_debt",
                ConceptSpec::Derived(
                    DerivedSpec::new(
                        vec!["total_debt".to_string(), "cash".to_string()],
                        "binary_subtraction",
                    )
                    .with_same_currency(),
                ),
            );
        let balance = registry.statement(StatementType::BalanceSheet).unwrap();
        assert!(!balance.is_empty());
        assert!(balance.derived["net_debt"].constraints.same_currency);
        assert_eq!(registry.len(), 2);
    }
}
