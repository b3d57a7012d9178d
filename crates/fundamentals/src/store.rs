//! On-disk fact store.
//!
//! Layout under the data directory:
//!
//! ```text
//! <TICKER>/.lock
//! <TICKER>/raw/company_facts.json
//! <TICKER>/normalized/<statement>.json
//! <TICKER>/derived/<statement>.json
//! <TICKER>/freshness.json
//! ```
//!
//! Every write goes to a temporary file in the target directory and is then
//! renamed over the destination.

use fundamentals_core::{
    CompanyFacts, DerivedDocument, FreshnessRecord, FundamentalsError, Result, StatementDocument,
    StatementType, Symbol,
};
use serde::{Serialize, de::DeserializeOwned};
use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, instrument};

const LOCK_FILE: &str = ".lock";
const FRESHNESS_FILE: &str = "freshness.json";
const RAW_FILE: &str = "company_facts.json";

/// Per-company JSON documents rooted at a data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactStore {
    root: PathBuf,
}

impl FactStore {
    /// Creates a store rooted at `root`. Nothing is created until the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Data directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one company's files.
    #[must_use]
    pub fn company_dir(&self, company: &Symbol) -> PathBuf {
        self.root.join(company.as_str())
    }

    /// Lock file path.
    #[must_use]
    pub fn lock_path(&self, company: &Symbol) -> PathBuf {
        self.company_dir(company).join(LOCK_FILE)
    }

    /// Raw facts snapshot path.
    #[must_use]
    pub fn raw_path(&self, company: &Symbol) -> PathBuf {
        self.company_dir(company).join("raw").join(RAW_FILE)
    }

    /// Normalized document path.
    #[must_use]
    pub fn normalized_path(&self, company: &Symbol, statement: StatementType) -> PathBuf {
        self.company_dir(company)
            .join("normalized")
            .join(format!("{statement}.json"))
    }

    /// Derived document path.
    #[must_use]
    pub fn derived_path(&self, company: &Symbol, statement: StatementType) -> PathBuf {
        self.company_dir(company)
            .join("derived")
            .join(format!("{statement}.json"))
    }

    /// Freshness record path.
    #[must_use]
    pub fn freshness_path(&self, company: &Symbol) -> PathBuf {
        self.company_dir(company).join(FRESHNESS_FILE)
    }

    /// Reads a normalized document; `Ok(None)` if it was never written.
    pub fn read_normalized(
        &self,
        company: &Symbol,
        statement: StatementType,
    ) -> Result<Option<StatementDocument>> {
        read_json(&self.normalized_path(company, statement))
    }

    /// Writes a normalized document.
    #[instrument(skip(self, document), fields(company = %document.company, statement = %document.statement, facts = document.facts.len()))]
    pub fn write_normalized(&self, document: &StatementDocument) -> Result<()> {
        write_json(
            &self.normalized_path(&document.company, document.statement),
            document,
        )
    }

    /// Reads a derived document; `Ok(None)` if it was never written.
    pub fn read_derived(
        &self,
        company: &Symbol,
        statement: StatementType,
    ) -> Result<Option<DerivedDocument>> {
        read_json(&self.derived_path(company, statement))
    }

    /// Writes a derived document.
    #[instrument(skip(self, document), fields(company = %document.company, statement = %document.statement, facts = document.facts.len()))]
    pub fn write_derived(&self, document: &DerivedDocument) -> Result<()> {
        write_json(
            &self.derived_path(&document.company, document.statement),
            document,
        )
    }

    /// Normalized and derived facts in one envelope.
    ///
    /// `Ok(None)` if the normalized document is absent. A missing derived
    /// document contributes no facts.
    pub fn combined(
        &self,
        company: &Symbol,
        statement: StatementType,
    ) -> Result<Option<StatementDocument>> {
        let Some(normalized) = self.read_normalized(company, statement)? else {
            return Ok(None);
        };
        Ok(Some(match self.read_derived(company, statement)? {
            Some(derived) => normalized.merge(derived),
            None => normalized,
        }))
    }

    /// Reads the freshness record.
    pub fn read_freshness(&self, company: &Symbol) -> Result<Option<FreshnessRecord>> {
        read_json(&self.freshness_path(company))
    }

    /// Writes the freshness record.
    pub fn write_freshness(&self, record: &FreshnessRecord) -> Result<()> {
        write_json(&self.freshness_path(&record.company), record)
    }

    /// Reads the raw facts snapshot.
    pub fn read_raw(&self, company: &Symbol) -> Result<Option<CompanyFacts>> {
        read_json(&self.raw_path(company))
    }

    /// Writes the raw facts snapshot.
    pub fn write_raw(&self, company: &Symbol, facts: &CompanyFacts) -> Result<()> {
        write_json(&self.raw_path(company), facts)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(FundamentalsError::io(path, err)),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| FundamentalsError::Parse(format!("{}: {e}", path.display())))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| FundamentalsError::InvalidParameter(format!("{} has no parent", path.display())))?;
    fs::create_dir_all(dir).map_err(|e| FundamentalsError::io(dir, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| FundamentalsError::io(dir, e))?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        serde_json::to_writer_pretty(&mut writer, value)
            .map_err(|e| FundamentalsError::Parse(format!("{}: {e}", path.display())))?;
        writer.flush().map_err(|e| FundamentalsError::io(path, e))?;
    }
    tmp.as_file()
        .sync_all()
        .map_err(|e| FundamentalsError::io(path, e))?;
    tmp.persist(path)
        .map_err(|e| FundamentalsError::io(path, e.error))?;

    debug!(path = %path.display(), "Wrote document");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use fundamentals_core::{Confidence, NormalizedFact, Period, Provenance};
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn company() -> Symbol {
        Symbol::new("RDDT")
    }

    fn reported() -> NormalizedFact {
        NormalizedFact {
            company: company(),
            statement: StatementType::CashFlowStatement,
            concept: "operating_cash_flow".to_string(),
            value: 500.0,
            currency: "USD".to_string(),
            period: Period::FiscalYear(2024),
            reported: true,
            provenance: Provenance::Reported {
                source_form: "10-K".to_string(),
                filed_date: date(2025, 2, 1),
            },
        }
    }

    fn derived() -> NormalizedFact {
        NormalizedFact {
            company: company(),
            statement: StatementType::CashFlowStatement,
            concept: "free_cash_flow".to_string(),
            value: 300.0,
            currency: "USD".to_string(),
            period: Period::FiscalYear(2024),
            reported: false,
            provenance: Provenance::Derived {
                derived_from: vec![
                    "operating_cash_flow".to_string(),
                    "capital_expenditure".to_string(),
                ],
                derivation_type: "binary_subtraction".to_string(),
                confidence: Confidence::High,
            },
        }
    }

    #[test]
    fn test_layout() {
        let store = FactStore::new("/data");
        assert_eq!(store.lock_path(&company()), PathBuf::from("/data/RDDT/.lock"));
        assert_eq!(
            store.normalized_path(&company(), StatementType::BalanceSheet),
            PathBuf::from("/data/RDDT/normalized/balance_sheet.json")
        );
        assert_eq!(
            store.derived_path(&company(), StatementType::CashFlowStatement),
            PathBuf::from("/data/RDDT/derived/cash_flow_statement.json")
        );
        assert_eq!(
            store.raw_path(&company()),
            PathBuf::from("/data/RDDT/raw/company_facts.json")
        );
    }

    #[test]
    fn test_documents_survive_a_write_read_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let store = FactStore::new(dir.path());

        let normalized =
            StatementDocument::new(company(), StatementType::CashFlowStatement, vec![reported()]);
        let derived_doc = DerivedDocument {
            company: company(),
            statement: StatementType::CashFlowStatement,
            processed_date: Some(date(2025, 2, 1)),
            facts: vec![derived()],
        };
        store.write_normalized(&normalized).unwrap();
        store.write_derived(&derived_doc).unwrap();

        assert_eq!(
            store
                .read_normalized(&company(), StatementType::CashFlowStatement)
                .unwrap(),
            Some(normalized)
        );
        assert_eq!(
            store
                .read_derived(&company(), StatementType::CashFlowStatement)
                .unwrap(),
            Some(derived_doc)
        );

        let combined = store
            .combined(&company(), StatementType::CashFlowStatement)
            .unwrap()
            .unwrap();
        assert_eq!(combined.facts, vec![reported(), derived()]);
    }

    #[test]
    fn test_subtraction_results_read_back_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let store = FactStore::new(dir.path());

        let mut fact = derived();
        fact.value = 0.918_999_999_999_999_9;
        let document = DerivedDocument {
            company: company(),
            statement: StatementType::CashFlowStatement,
            processed_date: Some(date(2025, 2, 1)),
            facts: vec![fact],
        };
        store.write_derived(&document).unwrap();

        let read = store
            .read_derived(&company(), StatementType::CashFlowStatement)
            .unwrap()
            .unwrap();
        assert_eq!(
            read.facts[0].value.to_bits(),
            0.918_999_999_999_999_9_f64.to_bits()
        );
        assert_eq!(read, document);
    }

    #[test]
    fn test_missing_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FactStore::new(dir.path());

        assert!(store.read_freshness(&company()).unwrap().is_none());
        assert!(
            store
                .combined(&company(), StatementType::IncomeStatement)
                .unwrap()
                .is_none()
        );

        let path = store.normalized_path(&company(), StatementType::IncomeStatement);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            store.read_normalized(&company(), StatementType::IncomeStatement),
            Err(FundamentalsError::Parse(_))
        ));
        // Sibling statements are unaffected.
        assert!(
            store
                .read_normalized(&company(), StatementType::BalanceSheet)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_overwrite_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FactStore::new(dir.path());
        let record = FreshnessRecord {
            company: company(),
            processed_date: None,
            statements: Vec::new(),
        };
        store.write_freshness(&record).unwrap();

        let updated = FreshnessRecord {
            processed_date: Some(date(2025, 2, 1)),
            statements: StatementType::ALL.to_vec(),
            ..record
        };
        store.write_freshness(&updated).unwrap();

        assert_eq!(store.read_freshness(&company()).unwrap(), Some(updated));
        let entries: Vec<_> = fs::read_dir(store.company_dir(&company()))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from(FRESHNESS_FILE)]);
    }
}
