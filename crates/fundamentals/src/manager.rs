//! Freshness-gated access to normalized statements.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use fundamentals_cache::InMemoryFactsCache;
use fundamentals_core::{
    CompanyFacts, CompanyFactsSource, ConceptRegistry, DerivedDocument, FreshnessRecord,
    FundamentalsError, RawFactsCache, Result, StatementDocument, StatementType, Symbol,
};
use fundamentals_edgar::EdgarProvider;
use fundamentals_engine::StatementPipeline;
use tracing::{debug, info, instrument, warn};

use crate::config::FundamentalsConfig;
use crate::lock::CompanyLock;
use crate::store::FactStore;

/// Outcome of a freshness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Stored output already covered the latest filing.
    Fresh,
    /// This call recomputed and wrote every statement.
    Recomputed,
}

/// Keeps each company's stored statements in step with its latest SEC filing.
///
/// Reads check the stored [`FreshnessRecord`] against the newest `filed`
/// date in the raw facts. Stale companies are recomputed under an exclusive
/// per-company lock, so concurrent callers recompute at most once.
///
/// # Example
///
/// ```rust,ignore
/// use fundamentals::{FundamentalsConfig, FundamentalsManager, Symbol};
///
/// let config = FundamentalsConfig::load()?;
/// let manager = FundamentalsManager::from_config(&config)?;
///
/// if let Some(cash_flow) = manager.cash_flow_statement(&Symbol::new("RDDT")).await? {
///     println!("{} facts", cash_flow.facts.len());
/// }
/// ```
pub struct FundamentalsManager {
    source: Arc<dyn CompanyFactsSource>,
    cache: Arc<dyn RawFactsCache>,
    registry: Arc<ConceptRegistry>,
    store: FactStore,
    pipeline: StatementPipeline,
    lock_timeout: Duration,
    lock_retry: Duration,
    persist_raw: bool,
}

impl std::fmt::Debug for FundamentalsManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FundamentalsManager")
            .field("source", &self.source.name())
            .field("registry_concepts", &self.registry.len())
            .field("store", &self.store.root())
            .field("operators", &self.pipeline.engine().operator_names())
            .field("lock_timeout", &self.lock_timeout)
            .field("persist_raw", &self.persist_raw)
            .finish_non_exhaustive()
    }
}

impl FundamentalsManager {
    /// Creates a manager with an unbounded in-memory raw facts cache.
    pub fn new(
        source: Arc<dyn CompanyFactsSource>,
        registry: Arc<ConceptRegistry>,
        store: FactStore,
    ) -> Self {
        let defaults = FundamentalsConfig::default();
        Self {
            source,
            cache: Arc::new(InMemoryFactsCache::new()),
            registry,
            store,
            pipeline: StatementPipeline::default(),
            lock_timeout: defaults.lock_timeout(),
            lock_retry: defaults.lock_retry(),
            persist_raw: defaults.persist_raw,
        }
    }

    /// Builds a manager backed by SEC EDGAR from configuration.
    ///
    /// # Errors
    /// Fails if the registry cannot be read or the HTTP client cannot be built.
    pub fn from_config(config: &FundamentalsConfig) -> Result<Self> {
        let registry = ConceptRegistry::from_path(&config.registry_path)?;
        for skipped in registry.skipped() {
            warn!(
                section = %skipped.section,
                concept = %skipped.concept,
                reason = %skipped.reason,
                "Skipped registry entry"
            );
        }
        let source = EdgarProvider::new(&config.user_agent)?;

        Ok(Self::new(
            Arc::new(source),
            Arc::new(registry),
            FactStore::new(&config.data_dir),
        )
        .with_cache(Arc::new(InMemoryFactsCache::with_policy(
            config.eviction_policy(),
        )))
        .with_lock_timeout(config.lock_timeout())
        .with_lock_retry(config.lock_retry())
        .with_persist_raw(config.persist_raw))
    }

    /// Replaces the raw facts cache.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn RawFactsCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Replaces the pipeline, e.g. to register extra derivation operators.
    #[must_use]
    pub fn with_pipeline(mut self, pipeline: StatementPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Sets how long to wait for a company lock.
    #[must_use]
    pub const fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Sets the delay between lock attempts.
    #[must_use]
    pub const fn with_lock_retry(mut self, retry: Duration) -> Self {
        self.lock_retry = retry;
        self
    }

    /// Enables or disables the raw facts snapshot.
    #[must_use]
    pub const fn with_persist_raw(mut self, persist_raw: bool) -> Self {
        self.persist_raw = persist_raw;
        self
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &FactStore {
        &self.store
    }

    /// Raw facts for a company, from the cache or the source.
    pub async fn raw_facts(&self, company: &Symbol) -> Result<Arc<CompanyFacts>> {
        if let Some(facts) = self.cache.get(company).await? {
            return Ok(facts);
        }

        debug!(company = %company, source = self.source.name(), "Fetching raw facts");
        let facts = Arc::new(self.source.fetch_company_facts(company).await?);
        self.cache.put(company, Arc::clone(&facts)).await?;
        Ok(facts)
    }

    /// Makes sure the stored output for `statement` reflects the latest filing.
    ///
    /// # Errors
    /// Source, lock and storage failures. On failure the freshness record is
    /// left as it was.
    pub async fn ensure_up_to_date(
        &self,
        company: &Symbol,
        statement: StatementType,
    ) -> Result<Freshness> {
        self.ensure_statements(company, &[statement]).await
    }

    /// Makes sure every statement of a company is up to date.
    pub async fn refresh(&self, company: &Symbol) -> Result<Freshness> {
        self.ensure_statements(company, &StatementType::ALL).await
    }

    #[instrument(skip(self, statements), fields(company = %company))]
    async fn ensure_statements(
        &self,
        company: &Symbol,
        statements: &[StatementType],
    ) -> Result<Freshness> {
        let facts = self.raw_facts(company).await?;
        let latest_filed = facts.latest_filed();

        if self.is_fresh(company, statements, latest_filed).await? {
            debug!(latest_filed = ?latest_filed, "Stored output is fresh");
            return Ok(Freshness::Fresh);
        }

        let _lock = CompanyLock::acquire(
            &self.store.lock_path(company),
            company,
            self.lock_timeout,
            self.lock_retry,
        )
        .await?;

        // Another caller may have finished while we waited.
        if self.is_fresh(company, statements, latest_filed).await? {
            debug!("Stored output refreshed by another caller");
            return Ok(Freshness::Fresh);
        }

        let registry = Arc::clone(&self.registry);
        let pipeline = self.pipeline.clone();
        let owner = company.clone();
        let persist_raw = self.persist_raw;
        self.blocking(move |store| {
            recompute(store, &pipeline, &registry, &owner, &facts, persist_raw)
        })
        .await?;
        info!(latest_filed = ?latest_filed, "Recomputed statements");
        Ok(Freshness::Recomputed)
    }

    async fn is_fresh(
        &self,
        company: &Symbol,
        statements: &[StatementType],
        latest_filed: Option<NaiveDate>,
    ) -> Result<bool> {
        let company = company.clone();
        let statements = statements.to_vec();
        self.blocking(move |store| {
            let record = match store.read_freshness(&company) {
                Ok(Some(record)) => record,
                Ok(None) => return Ok(false),
                Err(err) => {
                    warn!(
                        company = %company,
                        error = %err,
                        "Unreadable freshness record, treating as stale"
                    );
                    return Ok(false);
                }
            };

            Ok(record.covers(latest_filed)
                && statements.iter().all(|statement| {
                    record.has_statement(*statement)
                        && store.normalized_path(&company, *statement).is_file()
                }))
        })
        .await
    }

    /// Runs filesystem work on the blocking pool.
    async fn blocking<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&FactStore) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || work(&store))
            .await
            .map_err(|e| FundamentalsError::Other(format!("Storage task failed: {e}")))?
    }

    /// Normalized facts for a statement, refreshed if stale.
    pub async fn statement(
        &self,
        company: &Symbol,
        statement: StatementType,
    ) -> Result<Option<StatementDocument>> {
        self.ensure_up_to_date(company, statement).await?;
        let company = company.clone();
        self.blocking(move |store| store.read_normalized(&company, statement))
            .await
    }

    /// Derived facts for a statement, refreshed if stale.
    pub async fn derived_statement(
        &self,
        company: &Symbol,
        statement: StatementType,
    ) -> Result<Option<DerivedDocument>> {
        self.ensure_up_to_date(company, statement).await?;
        let company = company.clone();
        self.blocking(move |store| store.read_derived(&company, statement))
            .await
    }

    /// Normalized and derived facts in one document, refreshed if stale.
    pub async fn combined_statement(
        &self,
        company: &Symbol,
        statement: StatementType,
    ) -> Result<Option<StatementDocument>> {
        self.ensure_up_to_date(company, statement).await?;
        let company = company.clone();
        self.blocking(move |store| store.combined(&company, statement))
            .await
    }

    /// Normalized income statement.
    pub async fn income_statement(&self, company: &Symbol) -> Result<Option<StatementDocument>> {
        self.statement(company, StatementType::IncomeStatement).await
    }

    /// Normalized balance sheet.
    pub async fn balance_sheet(&self, company: &Symbol) -> Result<Option<StatementDocument>> {
        self.statement(company, StatementType::BalanceSheet).await
    }

    /// Cash flow statement including derived concepts such as free cash flow.
    pub async fn cash_flow_statement(
        &self,
        company: &Symbol,
    ) -> Result<Option<StatementDocument>> {
        self.combined_statement(company, StatementType::CashFlowStatement)
            .await
    }
}

/// Regenerates every statement and then advances the freshness record.
///
/// The caller must hold the company lock.
fn recompute(
    store: &FactStore,
    pipeline: &StatementPipeline,
    registry: &ConceptRegistry,
    company: &Symbol,
    facts: &CompanyFacts,
    persist_raw: bool,
) -> Result<()> {
    if persist_raw {
        store.write_raw(company, facts)?;
    }

    let latest_filed = facts.latest_filed();
    let outputs = pipeline.run(company, registry, facts);
    for output in &outputs {
        store.write_normalized(&output.normalized_document())?;
        store.write_derived(&output.derived_document(latest_filed))?;
    }

    store.write_freshness(&FreshnessRecord {
        company: company.clone(),
        processed_date: latest_filed,
        statements: outputs.iter().map(|output| output.statement).collect(),
    })
}
