#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/fundamentals/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! SEC EDGAR source for raw company facts.
//!
//! This crate provides:
//!
//! - CIK (Central Index Key) lookup from ticker symbols
//! - The full `companyfacts` XBRL table for a company
//! - Rate limiting per SEC fair-access rules
//!
//! # Example
//!
//! ```no_run
//! use fundamentals_core::{CompanyFactsSource, Symbol};
//! use fundamentals_edgar::EdgarProvider;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = EdgarProvider::new("MyApp/1.0 (contact@example.com)")?;
//!
//!     let symbol = Symbol::new("RDDT");
//!     let facts = provider.fetch_company_facts(&symbol).await?;
//!     println!("{:?}: {} facts", facts.entity_name, facts.len());
//!
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use fundamentals_core::{CompanyFacts, CompanyFactsSource, FundamentalsError, Result, Symbol};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};
use tokio::time::{Instant, sleep};
use tracing::{debug, instrument};

/// SEC EDGAR API base URL
const EDGAR_BASE_URL: &str = "https://data.sec.gov";

/// SEC company tickers URL
const COMPANY_TICKERS_URL: &str = "https://www.sec.gov/files/company_tickers.json";

/// Default rate limit: 10 requests per second (SEC requirement)
const DEFAULT_RATE_LIMIT: Duration = Duration::from_millis(100);

/// Default HTTP timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Rate limiter to ensure we don't exceed SEC's rate limits
#[derive(Debug)]
struct RateLimiter {
    last_request: Instant,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            last_request: now.checked_sub(min_interval).unwrap_or(now),
            min_interval,
        }
    }

    async fn wait(&mut self) {
        let elapsed = self.last_request.elapsed();
        if elapsed < self.min_interval {
            sleep(self.min_interval - elapsed).await;
        }
        self.last_request = Instant::now();
    }
}

/// SEC EDGAR source of raw company facts.
///
/// Ticker to CIK mappings are downloaded once per provider and reused.
/// Requests are spaced at least 100ms apart, across all tasks sharing the
/// provider.
#[derive(Debug)]
pub struct EdgarProvider {
    client: reqwest::Client,
    rate_limiter: Arc<Mutex<RateLimiter>>,
    base_url: String,
    tickers_url: String,
    ciks: OnceCell<HashMap<String, u64>>,
}

impl EdgarProvider {
    /// Create a new EDGAR provider with the specified user agent.
    ///
    /// The SEC requires identifying user agent headers. Format should be:
    /// "AppName/Version (contact@email.com)"
    ///
    /// # Errors
    /// Returns [`FundamentalsError::InvalidParameter`] for an empty user agent
    /// and [`FundamentalsError::Network`] if the HTTP client cannot be built.
    pub fn new(user_agent: &str) -> Result<Self> {
        if user_agent.trim().is_empty() {
            return Err(FundamentalsError::InvalidParameter(
                "SEC requests require a User-Agent".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| FundamentalsError::Network(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self::with_client(client))
    }

    /// Create a new EDGAR provider with a custom HTTP client.
    ///
    /// The client must already carry an identifying user agent.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new(DEFAULT_RATE_LIMIT))),
            base_url: EDGAR_BASE_URL.to_string(),
            tickers_url: COMPANY_TICKERS_URL.to_string(),
            ciks: OnceCell::new(),
        }
    }

    /// Points the provider at different endpoints.
    ///
    /// `base_url` replaces `https://data.sec.gov` and `tickers_url` replaces
    /// the `company_tickers.json` location.
    #[must_use]
    pub fn with_endpoints(mut self, base_url: impl Into<String>, tickers_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self.tickers_url = tickers_url.into();
        self
    }

    /// Sets the minimum spacing between requests.
    #[must_use]
    pub fn with_rate_limit(mut self, min_interval: Duration) -> Self {
        self.rate_limiter = Arc::new(Mutex::new(RateLimiter::new(min_interval)));
        self
    }

    /// Look up a company's CIK number from its ticker symbol.
    ///
    /// # Errors
    /// Returns [`FundamentalsError::SymbolNotFound`] if the SEC does not list
    /// the ticker.
    #[instrument(skip(self), fields(symbol = %symbol))]
    pub async fn get_cik(&self, symbol: &Symbol) -> Result<u64> {
        if symbol.as_str().is_empty() {
            return Err(FundamentalsError::InvalidParameter("Empty ticker".to_string()));
        }

        let ciks = self
            .ciks
            .get_or_try_init(|| self.fetch_company_tickers())
            .await?;

        match ciks.get(symbol.as_str()) {
            Some(cik) => {
                debug!("Found CIK {} for ticker", format_cik(*cik));
                Ok(*cik)
            }
            None => Err(FundamentalsError::SymbolNotFound(symbol.to_string())),
        }
    }

    async fn fetch_company_tickers(&self) -> Result<HashMap<String, u64>> {
        // Rate limit
        self.rate_limiter.lock().await.wait().await;

        debug!("Fetching company tickers from SEC");
        let response = self
            .client
            .get(&self.tickers_url)
            .send()
            .await
            .map_err(|e| FundamentalsError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FundamentalsError::Network(format!(
                "Failed to fetch company tickers: HTTP {}",
                response.status()
            )));
        }

        let data: HashMap<String, CompanyTickerInfo> = response.json().await.map_err(|e| {
            FundamentalsError::Parse(format!("Failed to parse company tickers: {e}"))
        })?;

        Ok(data
            .into_values()
            .map(|company| (company.ticker.to_uppercase(), company.cik_str))
            .collect())
    }

    /// Fetch the raw `companyfacts` table for a CIK.
    #[instrument(skip(self))]
    pub async fn fetch_facts_by_cik(&self, cik: u64) -> Result<CompanyFacts> {
        // Rate limit
        self.rate_limiter.lock().await.wait().await;

        let url = format!(
            "{}/api/xbrl/companyfacts/CIK{}.json",
            self.base_url,
            format_cik(cik)
        );

        debug!("Fetching company facts from {}", url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FundamentalsError::Network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(FundamentalsError::SymbolNotFound(format!(
                "No company facts for CIK {}",
                format_cik(cik)
            )));
        }
        if !response.status().is_success() {
            return Err(FundamentalsError::Network(format!(
                "Failed to fetch company facts for CIK {}: HTTP {}",
                format_cik(cik),
                response.status()
            )));
        }

        let facts: CompanyFacts = response
            .json()
            .await
            .map_err(|e| FundamentalsError::Parse(format!("Failed to parse company facts: {e}")))?;

        debug!(facts = facts.len(), "Fetched company facts");
        Ok(facts)
    }
}

#[async_trait]
impl CompanyFactsSource for EdgarProvider {
    fn name(&self) -> &str {
        "SEC EDGAR"
    }

    async fn fetch_company_facts(&self, symbol: &Symbol) -> Result<CompanyFacts> {
        let cik = self.get_cik(symbol).await?;
        self.fetch_facts_by_cik(cik).await
    }

    async fn supports_symbol(&self, symbol: &Symbol) -> Result<bool> {
        match self.get_cik(symbol).await {
            Ok(_) => Ok(true),
            Err(FundamentalsError::SymbolNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// CIKs are zero-padded to 10 digits in EDGAR URLs.
#[must_use]
pub fn format_cik(cik: u64) -> String {
    format!("{cik:0>10}")
}

// ============================================================================
// SEC EDGAR API Response Types
// ============================================================================

/// Company ticker information from SEC
#[derive(Debug, Deserialize)]
struct CompanyTickerInfo {
    /// CIK as a number (SEC returns this as an integer)
    cik_str: u64,
    /// Ticker symbol
    ticker: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TICKERS: &str = r#"{
        "0": {"cik_str": 320193, "ticker": "AAPL", "title": "Apple Inc."},
        "1": {"cik_str": 1713445, "ticker": "rddt", "title": "Reddit, Inc."}
    }"#;

    const FACTS: &str = r#"{
        "cik": 1713445,
        "entityName": "Reddit, Inc.",
        "facts": {"us-gaap": {"Revenues": {"label": "Revenues", "units": {"USD": [
            {"start": "2024-01-01", "end": "2024-03-31", "val": 243000000, "accn": "0001713445-24-000010",
             "fy": 2024, "fp": "Q1", "form": "10-Q", "filed": "2024-05-08", "frame": "CY2024Q1"}
        ]}}}}
    }"#;

    fn provider(server: &MockServer) -> EdgarProvider {
        EdgarProvider::new("Test/1.0 (test@example.com)")
            .unwrap()
            .with_endpoints(server.uri(), format!("{}/files/company_tickers.json", server.uri()))
            .with_rate_limit(Duration::ZERO)
    }

    async fn mount_tickers(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/files/company_tickers.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(TICKERS))
            .expect(1)
            .mount(server)
            .await;
    }

    #[test]
    fn test_cik_padding() {
        assert_eq!(format_cik(320193), "0000320193");
        assert_eq!(format_cik(320193).len(), 10);
    }

    #[test]
    fn test_rejects_empty_user_agent() {
        assert!(matches!(
            EdgarProvider::new("  "),
            Err(FundamentalsError::InvalidParameter(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_company_facts() {
        let server = MockServer::start().await;
        mount_tickers(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/xbrl/companyfacts/CIK0001713445.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FACTS))
            .mount(&server)
            .await;

        let provider = provider(&server);
        assert_eq!(provider.name(), "SEC EDGAR");

        let facts = provider
            .fetch_company_facts(&Symbol::new("rddt"))
            .await
            .unwrap();
        assert_eq!(facts.cik, Some(1_713_445));
        assert_eq!(facts.entity_name.as_deref(), Some("Reddit, Inc."));
        assert_eq!(facts.observations("us-gaap", "Revenues", "USD").len(), 1);

        // The ticker table is fetched once.
        assert_eq!(provider.get_cik(&Symbol::new("AAPL")).await.unwrap(), 320193);
    }

    #[tokio::test]
    async fn test_unknown_ticker() {
        let server = MockServer::start().await;
        mount_tickers(&server).await;

        let provider = provider(&server);
        let err = provider
            .fetch_company_facts(&Symbol::new("NOPE"))
            .await
            .unwrap_err();
        assert!(matches!(err, FundamentalsError::SymbolNotFound(_)));
        assert!(!provider.supports_symbol(&Symbol::new("NOPE")).await.unwrap());
    }

    #[tokio::test]
    async fn test_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/xbrl/companyfacts/CIK0000000001.json"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/xbrl/companyfacts/CIK0000000002.json"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let provider = provider(&server);
        assert!(matches!(
            provider.fetch_facts_by_cik(1).await,
            Err(FundamentalsError::SymbolNotFound(_))
        ));
        let err = provider.fetch_facts_by_cik(2).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
