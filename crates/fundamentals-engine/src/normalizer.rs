//! Direct fact normalization.

use fundamentals_core::{CompanyFacts, DirectSpec, NormalizedFact, StatementType, Symbol, classify};
use indexmap::IndexMap;
use tracing::{debug, instrument, trace};

use crate::selector::{group_by_period, select_authoritative};

/// Turns raw observations into one reported fact per concept and period.
#[derive(Debug, Clone)]
pub struct DirectFactNormalizer {
    company: Symbol,
    statement: StatementType,
}

impl DirectFactNormalizer {
    /// Creates a normalizer for one company's statement.
    #[must_use]
    pub const fn new(company: Symbol, statement: StatementType) -> Self {
        Self { company, statement }
    }

    /// Normalizes every direct concept of the statement, in registry order.
    ///
    /// Concepts with no raw observations are skipped.
    #[instrument(skip(self, facts, specs), fields(company = %self.company, statement = %self.statement))]
    pub fn normalize(
        &self,
        facts: &CompanyFacts,
        specs: &IndexMap<String, DirectSpec>,
    ) -> Vec<NormalizedFact> {
        let normalized: Vec<NormalizedFact> = specs
            .iter()
            .flat_map(|(concept, spec)| self.normalize_concept(facts, concept, spec))
            .collect();

        debug!(
            concepts = specs.len(),
            facts = normalized.len(),
            "Normalized direct facts"
        );
        normalized
    }

    /// Normalizes a single concept.
    pub fn normalize_concept(
        &self,
        facts: &CompanyFacts,
        concept: &str,
        spec: &DirectSpec,
    ) -> Vec<NormalizedFact> {
        let observations = facts.observations(&spec.taxonomy, &spec.tag, &spec.unit);
        if observations.is_empty() {
            debug!(concept, tag = %spec.tag, unit = %spec.unit, "No facts found for concept");
            return Vec::new();
        }

        let mut normalized = Vec::new();
        for (key, group) in group_by_period(observations) {
            let Some(chosen) = select_authoritative(&group) else {
                continue;
            };
            let Some(period) = classify(chosen) else {
                trace!(concept, start = ?key.0, end = %key.1, "Unsupported period, dropping");
                continue;
            };

            normalized.push(NormalizedFact::reported(
                self.company.clone(),
                self.statement,
                concept,
                period,
                chosen,
            ));
        }
        normalized
    }
}
