//! Runs normalization and derivation for every statement of a company.

use chrono::NaiveDate;
use fundamentals_core::{
    CompanyFacts, ConceptRegistry, DerivedDocument, NormalizedFact, StatementDocument,
    StatementType, Symbol,
};
use tracing::{info, instrument, warn};

use crate::derivation::DerivationEngine;
use crate::normalizer::DirectFactNormalizer;

/// Normalized and derived facts for one statement.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementOutput {
    /// Company.
    pub company: Symbol,
    /// Statement.
    pub statement: StatementType,
    /// Reported facts.
    pub normalized: Vec<NormalizedFact>,
    /// Derived facts.
    pub derived: Vec<NormalizedFact>,
}

impl StatementOutput {
    /// Envelope for the normalized facts.
    #[must_use]
    pub fn normalized_document(&self) -> StatementDocument {
        StatementDocument::new(self.company.clone(), self.statement, self.normalized.clone())
    }

    /// Envelope for the derived facts, stamped with the raw data's latest filing.
    #[must_use]
    pub fn derived_document(&self, processed_date: Option<NaiveDate>) -> DerivedDocument {
        DerivedDocument {
            company: self.company.clone(),
            statement: self.statement,
            processed_date,
            facts: self.derived.clone(),
        }
    }

    /// Returns true if nothing could be extracted for this statement.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.normalized.is_empty() && self.derived.is_empty()
    }
}

/// The full normalization pipeline.
#[derive(Debug, Clone)]
pub struct StatementPipeline {
    engine: DerivationEngine,
}

impl Default for StatementPipeline {
    fn default() -> Self {
        Self::new(DerivationEngine::with_defaults())
    }
}

impl StatementPipeline {
    /// Creates a pipeline using the given derivation engine.
    #[must_use]
    pub const fn new(engine: DerivationEngine) -> Self {
        Self { engine }
    }

    /// Returns the derivation engine.
    #[must_use]
    pub const fn engine(&self) -> &DerivationEngine {
        &self.engine
    }

    /// Processes one statement.
    ///
    /// A statement absent from the registry yields empty output.
    pub fn run_statement(
        &self,
        company: &Symbol,
        statement: StatementType,
        registry: &ConceptRegistry,
        facts: &CompanyFacts,
    ) -> StatementOutput {
        let Some(concepts) = registry.statement(statement) else {
            warn!(company = %company, statement = %statement, "No concepts registered for statement");
            return StatementOutput {
                company: company.clone(),
                statement,
                normalized: Vec::new(),
                derived: Vec::new(),
            };
        };

        let normalized =
            DirectFactNormalizer::new(company.clone(), statement).normalize(facts, &concepts.direct);
        let derived = self
            .engine
            .derive(company, statement, &concepts.derived, &normalized);

        StatementOutput {
            company: company.clone(),
            statement,
            normalized,
            derived,
        }
    }

    /// Processes all three statements.
    ///
    /// Statements share one raw fetch and are always recomputed together.
    #[instrument(skip(self, registry, facts), fields(company = %company))]
    pub fn run(
        &self,
        company: &Symbol,
        registry: &ConceptRegistry,
        facts: &CompanyFacts,
    ) -> Vec<StatementOutput> {
        let outputs: Vec<StatementOutput> = StatementType::ALL
            .into_iter()
            .map(|statement| self.run_statement(company, statement, registry, facts))
            .collect();

        for output in &outputs {
            info!(
                statement = %output.statement,
                normalized = output.normalized.len(),
                derived = output.derived.len(),
                "Extracted statement facts"
            );
        }
        outputs
    }
}
