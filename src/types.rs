//! Shared types for COINRANK.
//!
//! These types form the data model used across all modules: market
//! inputs from the data source, the derived stats/ranking/portfolio
//! tables, run parameters, and the domain error enum.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Market data inputs
// ---------------------------------------------------------------------------

/// Current market snapshot for one coin, as supplied by the data source.
///
/// Numeric fields are optional because the upstream API may return `null`
/// for any of them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoinSnapshot {
    /// Source identifier used to request history (e.g. "bitcoin").
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub current_price: Option<f64>,
    pub market_cap: Option<f64>,
    pub volume_24h: Option<f64>,
    /// Percentage price change over the last 24 hours.
    pub change_24h: Option<f64>,
    /// Percentage price change over the last 7 days.
    pub change_7d: Option<f64>,
    /// Percentage price change over the last 30 days.
    pub change_30d: Option<f64>,
}

impl fmt::Display for CoinSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.symbol.to_uppercase())
    }
}

/// Ordered price samples for one coin, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PriceHistory {
    prices: Vec<f64>,
}

impl PriceHistory {
    /// Minimum number of samples for a history to be usable.
    pub const MIN_SAMPLES: usize = 2;

    pub fn new(prices: Vec<f64>) -> Self {
        Self { prices }
    }

    pub fn prices(&self) -> &[f64] {
        &self.prices
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Whether there are enough samples to derive at least one return.
    pub fn is_usable(&self) -> bool {
        self.prices.len() >= Self::MIN_SAMPLES
    }
}

impl From<Vec<f64>> for PriceHistory {
    fn from(prices: Vec<f64>) -> Self {
        Self::new(prices)
    }
}

// ---------------------------------------------------------------------------
// Derived tables
// ---------------------------------------------------------------------------

/// Risk/return metrics for one coin. One row of the stats table.
///
/// Field order is the column order of the persisted CSV.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoinStats {
    pub symbol: String,
    pub name: String,
    pub current_price: f64,
    pub market_cap: f64,
    pub volume_24h: f64,
    pub total_return_1y: f64,
    pub annual_return: f64,
    pub daily_volatility: f64,
    pub annual_volatility: f64,
    pub sharpe_ratio: f64,
    pub change_24h: f64,
    pub change_7d: f64,
    pub change_30d: f64,
}

impl CoinStats {
    /// Column names in persisted order.
    pub const COLUMNS: [&'static str; 13] = [
        "symbol",
        "name",
        "current_price",
        "market_cap",
        "volume_24h",
        "total_return_1y",
        "annual_return",
        "daily_volatility",
        "annual_volatility",
        "sharpe_ratio",
        "change_24h",
        "change_7d",
        "change_30d",
    ];

    /// Whether the row carries the inputs the ranker needs.
    /// NaN is the "null" of this table.
    pub fn has_ranking_inputs(&self) -> bool {
        !self.sharpe_ratio.is_nan() && !self.annual_volatility.is_nan()
    }

    /// Helper to build a test row with sensible defaults.
    #[cfg(test)]
    pub fn sample(symbol: &str, annual_return: f64, annual_volatility: f64, sharpe_ratio: f64) -> Self {
        CoinStats {
            symbol: symbol.to_string(),
            name: format!("{symbol} Coin"),
            current_price: 10.0,
            market_cap: 1_000_000.0,
            volume_24h: 50_000.0,
            total_return_1y: annual_return,
            annual_return,
            daily_volatility: annual_volatility / 365f64.sqrt(),
            annual_volatility,
            sharpe_ratio,
            change_24h: 0.0,
            change_7d: 0.0,
            change_30d: 0.0,
        }
    }
}

impl fmt::Display for CoinStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ${:.2} | ret: {:.2}% | vol: {:.2}% | sharpe: {:.3}",
            self.symbol,
            self.current_price,
            self.annual_return * 100.0,
            self.annual_volatility * 100.0,
            self.sharpe_ratio,
        )
    }
}

/// A stats row with its strategy score. One row of the ranked table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedCoin {
    #[serde(flatten)]
    pub stats: CoinStats,
    /// Rank-percentile score in [0, 1] under the active strategy.
    pub score: f64,
}

/// One allocation line of the recommended portfolio.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortfolioLine {
    pub symbol: String,
    pub name: String,
    pub current_price: f64,
    /// Quote-currency amount allocated to this coin.
    pub amount: f64,
    /// Coins purchasable with `amount` at `current_price`.
    pub quantity: f64,
    pub score: f64,
    pub annual_volatility: f64,
    pub sharpe_ratio: f64,
}

impl fmt::Display for PortfolioLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<8} {:<20} {:>12.2} {:>14.4} {:>8.3}",
            self.symbol, self.name, self.amount, self.quantity, self.sharpe_ratio,
        )
    }
}

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// Investment strategy used to score coins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Low volatility, positive returns.
    Conservative,
    /// Best risk-adjusted return (Sharpe ratio).
    #[default]
    Balanced,
    /// High returns, accepts volatility.
    Aggressive,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::Conservative, Strategy::Balanced, Strategy::Aggressive];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Conservative => "conservative",
            Strategy::Balanced => "balanced",
            Strategy::Aggressive => "aggressive",
        }
    }

    /// Short help text shown next to the strategy picker.
    pub fn description(&self) -> &'static str {
        match self {
            Strategy::Conservative => "Low risk, lower returns",
            Strategy::Balanced => "Good risk-return",
            Strategy::Aggressive => "High risk, high returns",
        }
    }

    /// Parse a strategy name, falling back to `Balanced` for anything
    /// unrecognised.
    pub fn from_name_lossy(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            warn!(strategy = name, "Unknown strategy, falling back to balanced");
            Strategy::Balanced
        })
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Strategy {
    type Err = CoinRankError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "conservative" => Ok(Strategy::Conservative),
            "balanced" => Ok(Strategy::Balanced),
            "aggressive" => Ok(Strategy::Aggressive),
            other => Err(CoinRankError::InvalidParams(format!("unknown strategy: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Run parameters and results
// ---------------------------------------------------------------------------

/// User-adjustable parameters of one analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisParams {
    pub strategy: Strategy,
    pub investment_amount: f64,
    /// Number of top-ranked coins to allocate across.
    pub top_n: usize,
}

impl AnalysisParams {
    pub const MIN_AMOUNT: f64 = 100.0;
    pub const MAX_AMOUNT: f64 = 1_000_000.0;
    pub const DEFAULT_AMOUNT: f64 = 10_000.0;
    pub const AMOUNT_STEP: f64 = 1_000.0;
    pub const MIN_COINS: usize = 1;
    pub const MAX_COINS: usize = 20;
    pub const DEFAULT_COINS: usize = 5;

    pub fn new(strategy: Strategy, investment_amount: f64, top_n: usize) -> Self {
        Self {
            strategy,
            investment_amount,
            top_n,
        }
    }

    /// Reject parameters no run can allocate with: a non-finite or
    /// non-positive amount, or zero coins. A `top_n` above the number of
    /// ranked coins is not an error; the allocator clamps it.
    pub fn validate(&self) -> Result<(), CoinRankError> {
        let amount = self.investment_amount;
        if !amount.is_finite() || amount <= 0.0 {
            return Err(CoinRankError::InvalidParams(format!(
                "investment amount must be a positive number, got {amount}"
            )));
        }
        if self.top_n == 0 {
            return Err(CoinRankError::InvalidParams(
                "number of coins must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// The dashboard's input limits: amount within
    /// `MIN_AMOUNT..=MAX_AMOUNT`, coins within `MIN_COINS..=MAX_COINS`.
    pub fn validate_dashboard_bounds(&self) -> Result<(), CoinRankError> {
        let amount = self.investment_amount;
        if !amount.is_finite() || !(Self::MIN_AMOUNT..=Self::MAX_AMOUNT).contains(&amount) {
            return Err(CoinRankError::InvalidParams(format!(
                "investment amount must be between {} and {}, got {amount}",
                Self::MIN_AMOUNT,
                Self::MAX_AMOUNT,
            )));
        }
        if !(Self::MIN_COINS..=Self::MAX_COINS).contains(&self.top_n) {
            return Err(CoinRankError::InvalidParams(format!(
                "number of coins must be between {} and {}, got {}",
                Self::MIN_COINS,
                Self::MAX_COINS,
                self.top_n,
            )));
        }
        Ok(())
    }
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self::new(Strategy::Balanced, Self::DEFAULT_AMOUNT, Self::DEFAULT_COINS)
    }
}

impl fmt::Display for AnalysisParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "${:.2} {} across top {}",
            self.investment_amount, self.strategy, self.top_n
        )
    }
}

/// Headline figures for a recommended portfolio.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortfolioSummary {
    pub total_investment: f64,
    /// Mean annual volatility across portfolio lines.
    pub avg_annual_volatility: f64,
    pub avg_sharpe_ratio: f64,
}

/// Immutable output of one analysis run: the three tables plus metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub params: AnalysisParams,
    /// Coins returned by the snapshot fetch.
    pub coins_requested: usize,
    /// Ids of coins dropped for missing history or snapshot data.
    pub skipped: Vec<String>,
    pub stats: Vec<CoinStats>,
    pub ranked: Vec<RankedCoin>,
    pub portfolio: Vec<PortfolioLine>,
}

impl RunResult {
    pub fn summary(&self) -> PortfolioSummary {
        let n = self.portfolio.len();
        let mean = |f: fn(&PortfolioLine) -> f64| {
            if n == 0 {
                0.0
            } else {
                self.portfolio.iter().map(f).sum::<f64>() / n as f64
            }
        };

        PortfolioSummary {
            total_investment: self.params.investment_amount,
            avg_annual_volatility: mean(|l| l.annual_volatility),
            avg_sharpe_ratio: mean(|l| l.sharpe_ratio),
        }
    }
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Run {} | {} | analysed {}/{} | ranked {} | portfolio {}",
            self.run_id,
            self.params,
            self.stats.len(),
            self.coins_requested,
            self.ranked.len(),
            self.portfolio.len(),
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for COINRANK.
#[derive(Debug, thiserror::Error)]
pub enum CoinRankError {
    #[error("Market data source unavailable ({data_source}): {message}")]
    SourceUnavailable { data_source: String, message: String },

    #[error("History unavailable for {coin_id}: {message}")]
    HistoryUnavailable { coin_id: String, message: String },

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
