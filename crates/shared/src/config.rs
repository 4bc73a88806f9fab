//! Ledger configuration management.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Top-level ledger configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LedgerConfig {
    /// Balance policy configuration.
    #[serde(default)]
    pub balance: BalanceConfig,
    /// Concurrency retry configuration.
    #[serde(default)]
    pub concurrency: ConcurrencyConfig,
    /// Pending-sweep configuration.
    #[serde(default)]
    pub sweep: SweepConfig,
    /// Amount validation configuration.
    #[serde(default)]
    pub amount: AmountConfig,
}

/// Non-negativity policy for customer balances.
#[derive(Debug, Clone, Deserialize)]
pub struct BalanceConfig {
    /// Account kinds (lower-case) allowed to carry a negative balance.
    /// System accounts are always exempt.
    #[serde(default = "default_allow_negative_for")]
    pub allow_negative_for: Vec<String>,
}

fn default_allow_negative_for() -> Vec<String> {
    vec!["credit".to_string()]
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            allow_negative_for: default_allow_negative_for(),
        }
    }
}

impl BalanceConfig {
    /// Whether the given account kind (lower-case) may go negative.
    #[must_use]
    pub fn allows_negative(&self, kind: &str) -> bool {
        self.allow_negative_for.iter().any(|k| k == kind)
    }
}

/// Serialization-conflict retry configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ConcurrencyConfig {
    /// Maximum retries after the initial attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base backoff in milliseconds; doubles per attempt.
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_backoff_ms() -> u64 {
    10
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_backoff_ms: default_base_backoff_ms(),
        }
    }
}

/// Pending-transaction sweep configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SweepConfig {
    /// Minimum age in seconds before a pending transaction is swept.
    #[serde(default = "default_staleness_threshold_secs")]
    pub staleness_threshold_secs: u64,
}

fn default_staleness_threshold_secs() -> u64 {
    60
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            staleness_threshold_secs: default_staleness_threshold_secs(),
        }
    }
}

/// Amount validation limits.
#[derive(Debug, Clone, Deserialize)]
pub struct AmountConfig {
    /// Largest accepted amount in major units.
    #[serde(default = "default_max_units")]
    pub max_units: Decimal,
    /// Maximum fractional digits accepted on input amounts.
    #[serde(default = "default_scale")]
    pub scale: u32,
}

fn default_max_units() -> Decimal {
    Decimal::from(100_000_000_000_u64)
}

fn default_scale() -> u32 {
    2
}

impl Default for AmountConfig {
    fn default() -> Self {
        Self {
            max_units: default_max_units(),
            scale: default_scale(),
        }
    }
}

impl LedgerConfig {
    /// Loads configuration from environment and config files.
    ///
    /// Layering: `config/default` then `config/{RUN_MODE}` then
    /// `ARGENT__`-prefixed environment variables with `__` separators
    /// (e.g. `ARGENT__CONCURRENCY__MAX_RETRIES=5`).
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded or deserialized.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("ARGENT").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
