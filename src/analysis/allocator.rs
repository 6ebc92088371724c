//! Equal-weight portfolio allocation.
//!
//! Splits an investment amount evenly across the top-N ranked coins.
//! Weights ignore the scores; ranking only decides which coins are in.

use tracing::{info, warn};

use crate::types::{PortfolioLine, RankedCoin};

/// Allocate `investment_amount` across the first `top_n` ranked coins.
///
/// Coins with a non-positive or non-finite price are skipped so no line
/// ever carries an infinite or NaN quantity. `top_n` is clamped to the
/// number of eligible coins; a clamp to zero yields an empty portfolio.
pub fn allocate(ranked: &[RankedCoin], investment_amount: f64, top_n: usize) -> Vec<PortfolioLine> {
    let eligible: Vec<&RankedCoin> = ranked
        .iter()
        .filter(|coin| {
            let price = coin.stats.current_price;
            let ok = price.is_finite() && price > 0.0;
            if !ok {
                warn!(
                    symbol = %coin.stats.symbol,
                    price,
                    "Excluding coin with unusable price from allocation"
                );
            }
            ok
        })
        .collect();

    let n = top_n.min(eligible.len());
    if n < top_n {
        info!(
            requested = top_n,
            available = eligible.len(),
            "Fewer ranked coins than requested, allocating across all available"
        );
    }
    if n == 0 {
        return Vec::new();
    }

    let amount = investment_amount / n as f64;

    eligible
        .into_iter()
        .take(n)
        .map(|coin| PortfolioLine {
            symbol: coin.stats.symbol.clone(),
            name: coin.stats.name.clone(),
            current_price: coin.stats.current_price,
            amount,
            quantity: amount / coin.stats.current_price,
            score: coin.score,
            annual_volatility: coin.stats.annual_volatility,
            sharpe_ratio: coin.stats.sharpe_ratio,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
