//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Every section and field has a default, so a partial (or missing) file
//! is valid. Secrets (the CoinGecko API key) are referenced by env-var
//! name in the config and resolved at runtime via `std::env::var`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::types::{AnalysisParams, CoinRankError, Strategy};

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub analysis: AnalysisConfig,
    pub market_data: MarketDataConfig,
    pub output: OutputConfig,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AnalysisConfig {
    /// "conservative" | "balanced" | "aggressive" (unknown → balanced)
    pub strategy: String,
    pub investment_amount: f64,
    pub top_n: usize,
    /// Number of coins to pull from the market-cap leaderboard.
    pub coin_limit: usize,
    /// Days of daily price history per coin.
    pub history_days: u32,
    /// Pause between per-coin history requests (rate-limit courtesy).
    pub request_delay_ms: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Balanced.to_string(),
            investment_amount: AnalysisParams::DEFAULT_AMOUNT,
            top_n: AnalysisParams::DEFAULT_COINS,
            coin_limit: 20,
            history_days: 365,
            request_delay_ms: 500,
        }
    }
}

impl AnalysisConfig {
    /// Run parameters for batch mode.
    pub fn params(&self) -> AnalysisParams {
        AnalysisParams::new(
            Strategy::from_name_lossy(&self.strategy),
            self.investment_amount,
            self.top_n,
        )
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MarketDataConfig {
    pub base_url: String,
    pub vs_currency: String,
    pub timeout_secs: u64,
    /// Name of the env var holding an optional CoinGecko API key.
    pub api_key_env: Option<String>,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.coingecko.com/api/v3".to_string(),
            vs_currency: "usd".to_string(),
            timeout_secs: 30,
            api_key_env: Some("COINGECKO_API_KEY".to_string()),
        }
    }
}

impl MarketDataConfig {
    /// The API key, if the configured env var is set and non-empty.
    pub fn api_key(&self) -> Option<String> {
        self.api_key_env
            .as_deref()
            .and_then(|env| AppConfig::resolve_env(env).ok())
            .filter(|key| !key.is_empty())
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    /// Where the stats table is written (overwritten each run).
    pub stats_csv: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            stats_csv: crate::storage::DEFAULT_STATS_FILE.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DashboardConfig {
    pub port: u16,
    /// Whether dashboard runs also overwrite the stats CSV.
    pub persist_stats: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            port: 8501,
            persist_stats: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Load configuration, falling back to defaults when the file is absent.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            info!(path, "No config file found, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Parse configuration from TOML text.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings no run could work with. Per-run parameters
    /// (amount, top_n) are checked by `AnalysisParams::validate` instead.
    pub fn validate(&self) -> Result<(), CoinRankError> {
        if !(1..=250).contains(&self.analysis.coin_limit) {
            return Err(CoinRankError::Config(format!(
                "analysis.coin_limit must be between 1 and 250, got {}",
                self.analysis.coin_limit
            )));
        }
        if self.analysis.history_days < 2 {
            return Err(CoinRankError::Config(format!(
                "analysis.history_days must be at least 2, got {}",
                self.analysis.history_days
            )));
        }
        if self.market_data.timeout_secs == 0 {
            return Err(CoinRankError::Config(
                "market_data.timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve an environment variable name to its value.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
