//! Layered configuration.
//!
//! Sources, highest priority first:
//! 1. Environment variables with the `FUNDAMENTALS_` prefix
//!    (`FUNDAMENTALS_DATA_DIR`, `FUNDAMENTALS_LOCK_TIMEOUT_SECS`, ...)
//! 2. `fundamentals.toml` in the working directory, or an explicit file
//! 3. Built-in defaults

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use fundamentals_cache::EvictionPolicy;
use fundamentals_core::{FundamentalsError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file name.
pub const CONFIG_FILE: &str = "fundamentals.toml";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "FUNDAMENTALS_";

/// Runtime settings for the fundamentals pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FundamentalsConfig {
    /// Root of the per-company output directories.
    pub data_dir: PathBuf,
    /// Concept registry JSON.
    pub registry_path: PathBuf,
    /// User-Agent sent to the SEC.
    pub user_agent: String,
    /// How long to wait for a company lock before giving up.
    pub lock_timeout_secs: u64,
    /// Delay between lock attempts.
    pub lock_retry_millis: u64,
    /// Drop cached raw facts after this many seconds.
    pub cache_ttl_secs: Option<u64>,
    /// Keep raw facts for at most this many companies.
    pub cache_capacity: Option<usize>,
    /// Write the fetched raw facts next to the outputs.
    pub persist_raw: bool,
}

impl Default for FundamentalsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            registry_path: PathBuf::from("registry/sec_facts_canonical_mappings_v1.json"),
            user_agent: concat!("fundamentals/", env!("CARGO_PKG_VERSION")).to_string(),
            lock_timeout_secs: 30,
            lock_retry_millis: 100,
            cache_ttl_secs: None,
            cache_capacity: None,
            persist_raw: true,
        }
    }
}

impl FundamentalsConfig {
    /// Loads from defaults, `fundamentals.toml` and the environment.
    pub fn load() -> Result<Self> {
        Self::figment(Path::new(CONFIG_FILE)).extract().map_err(config_error)
    }

    /// Loads using an explicit configuration file instead of `fundamentals.toml`.
    ///
    /// The file must exist.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(FundamentalsError::Config(format!(
                "configuration file {} not found",
                path.display()
            )));
        }
        Self::figment(path).extract().map_err(config_error)
    }

    /// Builds the provider chain. A missing file layer is skipped.
    pub fn figment(file: &Path) -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    /// Sets the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// Sets the registry path.
    #[must_use]
    pub fn with_registry_path(mut self, registry_path: impl Into<PathBuf>) -> Self {
        self.registry_path = registry_path.into();
        self
    }

    /// Sets the SEC User-Agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Lock wait bound.
    #[must_use]
    pub const fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }

    /// Lock retry delay.
    #[must_use]
    pub const fn lock_retry(&self) -> Duration {
        Duration::from_millis(self.lock_retry_millis)
    }

    /// Raw facts cache policy. A TTL takes precedence over a capacity.
    #[must_use]
    pub const fn eviction_policy(&self) -> EvictionPolicy {
        match (self.cache_ttl_secs, self.cache_capacity) {
            (Some(secs), _) => EvictionPolicy::TimeToLive(Duration::from_secs(secs)),
            (None, Some(capacity)) => EvictionPolicy::Capacity(capacity),
            (None, None) => EvictionPolicy::Unbounded,
        }
    }
}

fn config_error(err: figment::Error) -> FundamentalsError {
    FundamentalsError::Config(err.to_string())
}
