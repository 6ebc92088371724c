//! Strategy scoring and ranking.
//!
//! Each metric is converted to a percentile rank across the coins being
//! compared, then blended according to the strategy. Percentiles follow
//! the average-rank convention: the k-th smallest of n values gets k/n,
//! and tied values share the mean of their positions.

use tracing::{debug, info};

use crate::types::{CoinStats, RankedCoin, Strategy};

// ---------------------------------------------------------------------------
// Percentile ranks
// ---------------------------------------------------------------------------

/// Percentile rank of each value in `values`, in input order.
///
/// The result lies in (0, 1]; the largest value maps to 1.0. Ties receive
/// the average of the positions they occupy in the sorted copy. Callers
/// must filter NaN beforehand.
pub fn percentile_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut ranks = vec![0.0; n];
    if n == 0 {
        return ranks;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut start = 0;
    while start < n {
        let mut end = start;
        while end + 1 < n && values[order[end + 1]] == values[order[start]] {
            end += 1;
        }
        // 1-based positions start+1 ..= end+1, averaged.
        let avg_position = (start + end) as f64 / 2.0 + 1.0;
        for &idx in &order[start..=end] {
            ranks[idx] = avg_position / n as f64;
        }
        start = end + 1;
    }

    ranks
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Percentile ranks of the three ranking metrics for one coin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricPercentiles {
    pub volatility: f64,
    pub annual_return: f64,
    pub sharpe: f64,
}

/// Blend metric percentiles into a single score for `strategy`.
pub fn strategy_score(strategy: Strategy, pct: &MetricPercentiles) -> f64 {
    match strategy {
        Strategy::Conservative => (1.0 - pct.volatility) * 0.6 + pct.annual_return * 0.4,
        Strategy::Balanced => pct.sharpe,
        Strategy::Aggressive => pct.annual_return * 0.7 + (1.0 - pct.volatility) * 0.3,
    }
}

/// Score and order coins under `strategy`, best first.
///
/// Rows with a NaN Sharpe ratio or annual volatility are excluded. The
/// sort is stable, so equal scores keep their input order.
pub fn rank(stats: &[CoinStats], strategy: Strategy) -> Vec<RankedCoin> {
    let eligible: Vec<&CoinStats> = stats.iter().filter(|s| s.has_ranking_inputs()).collect();

    let dropped = stats.len() - eligible.len();
    if dropped > 0 {
        debug!(dropped, "Excluded coins with missing Sharpe/volatility from ranking");
    }

    let column = |f: fn(&CoinStats) -> f64| eligible.iter().map(|s| f(s)).collect::<Vec<_>>();
    let vol_pct = percentile_ranks(&column(|s| s.annual_volatility));
    let ret_pct = percentile_ranks(&column(|s| s.annual_return));
    let sharpe_pct = percentile_ranks(&column(|s| s.sharpe_ratio));

    let mut ranked: Vec<RankedCoin> = eligible
        .into_iter()
        .enumerate()
        .map(|(i, s)| {
            let pct = MetricPercentiles {
                volatility: vol_pct[i],
                annual_return: ret_pct[i],
                sharpe: sharpe_pct[i],
            };
            RankedCoin {
                stats: s.clone(),
                score: strategy_score(strategy, &pct),
            }
        })
        .collect();

    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));

    info!(
        strategy = %strategy,
        ranked = ranked.len(),
        top = ranked.first().map(|r| r.stats.symbol.as_str()).unwrap_or("-"),
        "Ranking complete"
    );

    ranked
}

/// Rank using a strategy name; unknown names rank as `balanced`.
pub fn rank_by_name(stats: &[CoinStats], strategy: &str) -> Vec<RankedCoin> {
    rank(stats, Strategy::from_name_lossy(strategy))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
