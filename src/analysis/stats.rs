//! Per-coin risk/return statistics.
//!
//! Turns a market snapshot plus a daily price history into the metric set
//! used for ranking. Crypto trades every day, so annualisation uses 365
//! periods rather than 252.

use tracing::debug;

use crate::types::{CoinSnapshot, CoinStats, PriceHistory};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Annual risk-free rate used in the Sharpe ratio.
pub const RISK_FREE_RATE: f64 = 0.03;

/// Sampling periods per year for daily prices.
pub const PERIODS_PER_YEAR: f64 = 365.0;

// ---------------------------------------------------------------------------
// Series helpers
// ---------------------------------------------------------------------------

/// Period-over-period fractional returns. Empty for fewer than 2 prices.
pub fn return_series(prices: &[f64]) -> Vec<f64> {
    prices
        .windows(2)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect()
}

/// Arithmetic mean; 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by n); 0.0 for an empty slice.
pub fn population_std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

// ---------------------------------------------------------------------------
// Stat computation
// ---------------------------------------------------------------------------

/// Compute the risk/return metrics for one coin.
///
/// Returns `None` when the history is missing or has fewer than two
/// samples, or when the snapshot carries no current price. Malformed
/// numbers (NaN, zero prices) never panic; they propagate as NaN/inf and
/// the ranker treats NaN as missing.
pub fn compute_stats(snapshot: &CoinSnapshot, history: Option<&PriceHistory>) -> Option<CoinStats> {
    let history = history.filter(|h| h.is_usable())?;
    let current_price = snapshot.current_price?;

    let prices = history.prices();
    let first = *prices.first()?;
    let last = *prices.last()?;
    let total_return_1y = last / first - 1.0;

    let returns = return_series(prices);
    let daily_volatility = population_std_dev(&returns);
    let annual_volatility = daily_volatility * PERIODS_PER_YEAR.sqrt();
    let avg_daily_return = mean(&returns);
    let annual_return = (1.0 + avg_daily_return).powf(PERIODS_PER_YEAR) - 1.0;

    let sharpe_ratio = if annual_volatility > 0.0 {
        (annual_return - RISK_FREE_RATE) / annual_volatility
    } else {
        0.0
    };

    debug!(
        coin_id = %snapshot.id,
        samples = prices.len(),
        annual_return,
        annual_volatility,
        sharpe_ratio,
        "Stats computed"
    );

    Some(CoinStats {
        symbol: snapshot.symbol.to_uppercase(),
        name: snapshot.name.clone(),
        current_price,
        market_cap: snapshot.market_cap.unwrap_or(0.0),
        volume_24h: snapshot.volume_24h.unwrap_or(0.0),
        total_return_1y,
        annual_return,
        daily_volatility,
        annual_volatility,
        sharpe_ratio,
        change_24h: snapshot.change_24h.unwrap_or(0.0),
        change_7d: snapshot.change_7d.unwrap_or(0.0),
        change_30d: snapshot.change_30d.unwrap_or(0.0),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
