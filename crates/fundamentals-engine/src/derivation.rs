//! Derived facts computed from normalized facts.
//!
//! Each derived concept names an operator (`derivation_type`). Operators are
//! registered in a [`DerivationEngine`] by name and implement
//! [`DerivationOperator`]; adding a new kind of derivation means registering a
//! new operator, not changing the engine.
//!
//! Derivation is fail-closed: a period missing any operand produces nothing.

use fundamentals_core::{DerivedSpec, NormalizedFact, Period, StatementType, Symbol};
use indexmap::IndexMap;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Name of the built-in subtraction operator.
pub const BINARY_SUBTRACTION: &str = "binary_subtraction";

/// Normalized facts looked up by period, then concept.
#[derive(Debug, Default)]
pub struct PeriodIndex<'a> {
    periods: BTreeMap<Period, HashMap<&'a str, &'a NormalizedFact>>,
}

impl<'a> PeriodIndex<'a> {
    /// Indexes facts by period and concept.
    ///
    /// If a concept appears twice for one period, the later fact wins.
    #[must_use]
    pub fn build(facts: &'a [NormalizedFact]) -> Self {
        let mut periods: BTreeMap<Period, HashMap<&'a str, &'a NormalizedFact>> = BTreeMap::new();
        for fact in facts {
            periods
                .entry(fact.period)
                .or_default()
                .insert(fact.concept.as_str(), fact);
        }
        Self { periods }
    }

    /// Returns the fact for a concept in a period.
    #[must_use]
    pub fn get(&self, period: &Period, concept: &str) -> Option<&'a NormalizedFact> {
        self.periods.get(period)?.get(concept).copied()
    }

    /// Iterates periods in order with their concepts.
    pub fn iter(&self) -> impl Iterator<Item = (&Period, &HashMap<&'a str, &'a NormalizedFact>)> {
        self.periods.iter()
    }

    /// Number of distinct periods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.periods.len()
    }

    /// Returns true if no facts were indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }
}

/// Everything an operator needs to know about the concept it computes.
#[derive(Debug, Clone, Copy)]
pub struct DerivationTarget<'a> {
    /// Company the facts belong to.
    pub company: &'a Symbol,
    /// Statement the derived facts are emitted under.
    pub statement: StatementType,
    /// Name of the derived concept.
    pub concept: &'a str,
    /// The registry spec for the concept.
    pub spec: &'a DerivedSpec,
}

/// A derivation strategy, selected by the spec's `derivation_type`.
pub trait DerivationOperator: Send + Sync + std::fmt::Debug {
    /// Registry name of this operator (e.g. `binary_subtraction`).
    fn name(&self) -> &str;

    /// Computes derived facts for every period the operator can fill.
    fn derive(&self, target: DerivationTarget<'_>, index: &PeriodIndex<'_>) -> Vec<NormalizedFact>;
}

/// `left - right` over the two concepts in `derived_from`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinarySubtraction;

impl DerivationOperator for BinarySubtraction {
    fn name(&self) -> &str {
        BINARY_SUBTRACTION
    }

    fn derive(&self, target: DerivationTarget<'_>, index: &PeriodIndex<'_>) -> Vec<NormalizedFact> {
        let [left_key, right_key] = target.spec.derived_from.as_slice() else {
            warn!(
                concept = target.concept,
                operands = target.spec.derived_from.len(),
                "binary_subtraction needs exactly two operands"
            );
            return Vec::new();
        };

        let mut derived = Vec::new();
        for (period, concepts) in index.iter() {
            let (Some(left), Some(right)) = (
                concepts.get(left_key.as_str()),
                concepts.get(right_key.as_str()),
            ) else {
                continue;
            };

            if target.spec.constraints.same_currency && left.currency != right.currency {
                debug!(
                    concept = target.concept,
                    period = %period,
                    left = %left.currency,
                    right = %right.currency,
                    "Currency mismatch, skipping period"
                );
                continue;
            }

            derived.push(NormalizedFact::derived(
                target.company.clone(),
                target.statement,
                target.concept,
                *period,
                left.value - right.value,
                left.currency.clone(),
                target.spec.derived_from.clone(),
                self.name(),
            ));
        }
        derived
    }
}

/// Registry of derivation operators.
#[derive(Debug, Default, Clone)]
pub struct DerivationEngine {
    operators: HashMap<String, Arc<dyn DerivationOperator>>,
}

impl DerivationEngine {
    /// Create a new engine with no operators.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with the built-in operators registered.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut engine = Self::new();
        engine.register(Arc::new(BinarySubtraction));
        engine
    }

    /// Register an operator, replacing any operator with the same name.
    pub fn register(&mut self, operator: Arc<dyn DerivationOperator>) {
        debug!(operator = operator.name(), "Registering derivation operator");
        self.operators.insert(operator.name().to_string(), operator);
    }

    /// Get an operator by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn DerivationOperator> {
        self.operators.get(name).map(|op| op.as_ref())
    }

    /// Names of all registered operators.
    #[must_use]
    pub fn operator_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.operators.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Computes every derived concept of a statement from its normalized facts.
    ///
    /// Specs naming an unregistered operator are skipped with a warning.
    #[instrument(skip(self, specs, facts), fields(company = %company, statement = %statement))]
    pub fn derive(
        &self,
        company: &Symbol,
        statement: StatementType,
        specs: &IndexMap<String, DerivedSpec>,
        facts: &[NormalizedFact],
    ) -> Vec<NormalizedFact> {
        let index = PeriodIndex::build(facts);
        let mut derived = Vec::new();

        for (concept, spec) in specs {
            let Some(operator) = self.get(&spec.derivation_type) else {
                warn!(
                    concept = %concept,
                    derivation_type = %spec.derivation_type,
                    "Unknown derivation type, skipping"
                );
                continue;
            };

            let target = DerivationTarget {
                company,
                statement: spec.statement.unwrap_or(statement),
                concept,
                spec,
            };
            derived.extend(operator.derive(target, &index));
        }

        debug!(
            periods = index.len(),
            facts = derived.len(),
            "Derived facts"
        );
        derived
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use fundamentals_core::{Provenance, RawObservation};
    use pretty_assertions::assert_eq;

    fn fact(concept: &str, period: Period, value: f64, currency: &str) -> NormalizedFact {
        let observation = RawObservation {
            value,
            unit: currency.to_string(),
            period_start: None,
            period_end: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            fiscal_period: None,
            fiscal_year: Some(period.fiscal_year()),
            form: Some("10-K".to_string()),
            filed: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
        };
        NormalizedFact::reported(
            Symbol::new("RDDT"),
            StatementType::CashFlowStatement,
            concept,
            period,
            &observation,
        )
    }

    fn fcf_specs(same_currency: bool) -> IndexMap<String, DerivedSpec> {
        let mut spec = DerivedSpec::new(
            vec!["operating_cash_flow".to_string(), "capital_expenditure".to_string()],
            BINARY_SUBTRACTION,
        );
        spec.constraints.same_currency = same_currency;
        IndexMap::from([("free_cash_flow".to_string(), spec)])
    }

    #[test]
    fn test_free_cash_flow() {
        let facts = vec![
            fact("operating_cash_flow", Period::FiscalYear(2024), 500.0, "USD"),
            fact("capital_expenditure", Period::FiscalYear(2024), 200.0, "USD"),
        ];
        let derived = DerivationEngine::with_defaults().derive(
            &Symbol::new("RDDT"),
            StatementType::CashFlowStatement,
            &fcf_specs(true),
            &facts,
        );

        assert_eq!(derived.len(), 1);
        let fcf = &derived[0];
        assert_eq!(fcf.concept, "free_cash_flow");
        assert_eq!(fcf.value, 300.0);
        assert_eq!(fcf.currency, "USD");
        assert_eq!(fcf.period, Period::FiscalYear(2024));
        assert!(!fcf.reported);
        assert_eq!(
            fcf.provenance,
            Provenance::Derived {
                derived_from: vec![
                    "operating_cash_flow".to_string(),
                    "capital_expenditure".to_string()
                ],
                derivation_type: BINARY_SUBTRACTION.to_string(),
                confidence: fundamentals_core::Confidence::High,
            }
        );
    }

    #[test]
    fn test_missing_operand_fails_closed() {
        let q1 = Period::Quarter { quarter: 1, year: 2024 };
        let q2 = Period::Quarter { quarter: 2, year: 2024 };
        let facts = vec![
            fact("operating_cash_flow", q1, 120.0, "USD"),
            fact("capital_expenditure", q1, 20.0, "USD"),
            fact("operating_cash_flow", q2, 130.0, "USD"),
        ];
        let derived = DerivationEngine::with_defaults().derive(
            &Symbol::new("RDDT"),
            StatementType::CashFlowStatement,
            &fcf_specs(false),
            &facts,
        );

        assert_eq!(derived.len(), 1);
        assert_eq!(derived[0].period, q1);
        assert_eq!(derived[0].value, 100.0);
    }

    #[test]
    fn test_currency_constraint() {
        let facts = vec![
            fact("operating_cash_flow", Period::FiscalYear(2023), 500.0, "USD"),
            fact("capital_expenditure", Period::FiscalYear(2023), 200.0, "EUR"),
        ];
        let engine = DerivationEngine::with_defaults();
        let company = Symbol::new("RDDT");

        let constrained = engine.derive(
            &company,
            StatementType::CashFlowStatement,
            &fcf_specs(true),
            &facts,
        );
        assert!(constrained.is_empty());

        let unconstrained = engine.derive(
            &company,
            StatementType::CashFlowStatement,
            &fcf_specs(false),
            &facts,
        );
        assert_eq!(unconstrained.len(), 1);
        assert_eq!(unconstrained[0].currency, "USD");
    }

    #[test]
    fn test_unknown_operator_and_bad_arity_are_skipped() {
        let facts = vec![
            fact("operating_cash_flow", Period::FiscalYear(2024), 500.0, "USD"),
            fact("capital_expenditure", Period::FiscalYear(2024), 200.0, "USD"),
        ];
        let specs = IndexMap::from([
            (
                "fcf_margin".to_string(),
                DerivedSpec::new(vec!["free_cash_flow".to_string()], "ratio"),
            ),
            (
                "odd".to_string(),
                DerivedSpec::new(vec!["operating_cash_flow".to_string()], BINARY_SUBTRACTION),
            ),
        ]);
        let derived = DerivationEngine::with_defaults().derive(
            &Symbol::new("RDDT"),
            StatementType::CashFlowStatement,
            &specs,
            &facts,
        );
        assert!(derived.is_empty());
    }

    #[derive(Debug)]
    struct Sum;

    impl DerivationOperator for Sum {
        fn name(&self) -> &str {
            "sum"
        }

        fn derive(&self, target: DerivationTarget<'_>, index: &PeriodIndex<'_>) -> Vec<NormalizedFact> {
            index
                .iter()
                .filter_map(|(period, concepts)| {
                    let operands: Option<Vec<&NormalizedFact>> = target
                        .spec
                        .derived_from
                        .iter()
                        .map(|c| concepts.get(c.as_str()).copied())
                        .collect();
                    let operands = operands?;
                    Some(NormalizedFact::derived(
                        target.company.clone(),
                        target.statement,
                        target.concept,
                        *period,
                        operands.iter().map(|f| f.value).sum(),
                        operands.first()?.currency.clone(),
                        target.spec.derived_from.clone(),
                        self.name(),
                    ))
                })
                .collect()
        }
    }

    #[test]
    fn test_custom_operator_registration() {
        let mut engine = DerivationEngine::with_defaults();
        engine.register(Arc::new(Sum));
        assert_eq!(engine.operator_names(), vec![BINARY_SUBTRACTION, "sum"]);

        let facts = vec![
            fact("short_term_debt", Period::FiscalYear(2024), 10.0, "USD"),
            fact("long_term_debt", Period::FiscalYear(2024), 90.0, "USD"),
            fact("finance_leases", Period::FiscalYear(2024), 5.0, "USD"),
        ];
        let mut spec = DerivedSpec::new(
            vec![
                "short_term_debt".to_string(),
                "long_term_debt".to_string(),
                "finance_leases".to_string(),
            ],
            "sum",
        );
        spec.statement = Some(StatementType::BalanceSheet);
        let specs = IndexMap::from([("total_debt".to_string(), spec)]);

        let derived = engine.derive(
            &Symbol::new("RDDT"),
            StatementType::CashFlowStatement,
            &specs,
            &facts,
        );
        assert_eq!(derived.len(), 1);
        assert_eq!(derived[0].value, 105.0);
        assert_eq!(derived[0].statement, StatementType::BalanceSheet);
    }

    #[test]
    fn test_period_index_lookup() {
        let facts = vec![
            fact("revenue", Period::FiscalYear(2024), 1.0, "USD"),
            fact("revenue", Period::FiscalYear(2024), 2.0, "USD"),
            fact("revenue", Period::FiscalYear(2023), 3.0, "USD"),
        ];
        let index = PeriodIndex::build(&facts);
        assert_eq!(index.len(), 2);
        assert_eq!(index.get(&Period::FiscalYear(2024), "revenue").unwrap().value, 2.0);
        assert!(index.get(&Period::FiscalYear(2022), "revenue").is_none());
        assert!(PeriodIndex::build(&[]).is_empty());
    }
}
