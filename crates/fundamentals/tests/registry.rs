//! The shipped concept registry.

use fundamentals::{ConceptRegistry, FundamentalsConfig, FundamentalsManager, StatementType};
use std::path::PathBuf;

fn shipped_registry() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../registry/sec_facts_canonical_mappings_v1.json")
}

#[test]
fn shipped_registry_loads_cleanly() {
    let registry = ConceptRegistry::from_path(shipped_registry()).unwrap();
    assert!(registry.skipped().is_empty(), "{:?}", registry.skipped());

    for statement in StatementType::ALL {
        let concepts = registry.statement(statement).unwrap();
        assert!(!concepts.direct.is_empty(), "{statement} has no direct concepts");
    }

    let cash_flow = registry.statement(StatementType::CashFlowStatement).unwrap();
    let fcf = &cash_flow.derived["free_cash_flow"];
    assert_eq!(
        fcf.derived_from,
        vec!["operating_cash_flow".to_string(), "capital_expenditure".to_string()]
    );
    assert!(fcf.constraints.same_currency);
    for operand in &fcf.derived_from {
        assert!(cash_flow.direct.contains_key(operand));
    }
}

#[test]
fn manager_builds_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = FundamentalsConfig::default()
        .with_data_dir(dir.path())
        .with_registry_path(shipped_registry())
        .with_user_agent("Test/1.0 (test@example.com)");

    let manager = FundamentalsManager::from_config(&config).unwrap();
    assert_eq!(manager.store().root(), dir.path());
    assert!(format!("{manager:?}").contains("SEC EDGAR"));
}

#[test]
fn missing_registry_is_an_io_error() {
    let config = FundamentalsConfig::default().with_registry_path("does/not/exist.json");
    assert!(matches!(
        FundamentalsManager::from_config(&config),
        Err(fundamentals::FundamentalsError::Io { .. })
    ));
}
