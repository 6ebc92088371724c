//! Pipeline orchestrator: fetch → stats → rank → allocate.
//!
//! Drives one analysis run over the market-cap leaderboard. Coins are
//! processed sequentially; a coin whose history can't be fetched (or
//! yields no stats) is logged and dropped, and the run carries on. Only
//! a failed leaderboard fetch fails the run.

use anyhow::Result;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::analysis::{allocate, compute_stats, rank};
use crate::config::AppConfig;
use crate::market::MarketDataSource;
use crate::storage;
use crate::types::{AnalysisParams, CoinRankError, CoinSnapshot, CoinStats, RunResult};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Runtime settings for the pipeline (not user-adjustable per run).
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of coins to pull from the leaderboard.
    pub coin_limit: usize,
    /// Days of price history per coin.
    pub history_days: u32,
    /// Pause between per-coin history requests.
    pub request_delay: Duration,
    /// Where to write the stats table; `None` disables persistence.
    pub stats_path: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            coin_limit: 20,
            history_days: 365,
            request_delay: Duration::ZERO,
            stats_path: None,
        }
    }
}

impl PipelineConfig {
    /// Build from application config. `persist` controls whether the
    /// stats table is written to `output.stats_csv`.
    pub fn from_app_config(cfg: &AppConfig, persist: bool) -> Self {
        Self {
            coin_limit: cfg.analysis.coin_limit,
            history_days: cfg.analysis.history_days,
            request_delay: Duration::from_millis(cfg.analysis.request_delay_ms),
            stats_path: persist.then(|| cfg.output.stats_csv.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Runs the stats → rank → allocate pipeline against a market data source.
///
/// Holds no per-run state: every call to `run` builds fresh tables, so
/// concurrent runs never share ranking or portfolio data.
pub struct Pipeline {
    source: Arc<dyn MarketDataSource>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(source: Arc<dyn MarketDataSource>, config: PipelineConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Execute one full analysis run.
    ///
    /// Fails with `CoinRankError::InvalidParams` for a non-positive amount
    /// or zero coins, and `CoinRankError::SourceUnavailable` if the coin
    /// list can't be fetched. Per-coin failures only shrink the tables.
    pub async fn run(&self, params: &AnalysisParams) -> Result<RunResult> {
        params.validate()?;

        let run_id = Uuid::new_v4();
        info!(
            run_id = %run_id,
            strategy = %params.strategy,
            amount = params.investment_amount,
            top_n = params.top_n,
            "Starting analysis run"
        );

        let coins = self
            .source
            .top_coins(self.config.coin_limit)
            .await
            .map_err(|e| CoinRankError::SourceUnavailable {
                data_source: self.source.name().to_string(),
                message: format!("{e:#}"),
            })?;
        let total = coins.len();
        info!(count = total, "Coin list fetched");

        // Sequential fold: one optional result per coin, in leaderboard order.
        let outcomes: Vec<Option<CoinStats>> = stream::iter(0..total)
            .then(|index| self.analyze_coin(index, total, &coins[index]))
            .collect()
            .await;

        let mut stats = Vec::with_capacity(total);
        let mut skipped = Vec::new();
        for (coin, outcome) in coins.iter().zip(outcomes) {
            match outcome {
                Some(row) => stats.push(row),
                None => skipped.push(coin.id.clone()),
            }
        }

        if let Some(path) = &self.config.stats_path {
            storage::save_stats(&stats, Some(path))?;
        }

        let ranked = rank(&stats, params.strategy);
        let portfolio = allocate(&ranked, params.investment_amount, params.top_n);

        let result = RunResult {
            run_id,
            generated_at: Utc::now(),
            params: *params,
            coins_requested: total,
            skipped,
            stats,
            ranked,
            portfolio,
        };

        info!(
            run_id = %run_id,
            analysed = result.stats.len(),
            skipped = result.skipped.len(),
            ranked = result.ranked.len(),
            portfolio = result.portfolio.len(),
            "Analysis run complete"
        );

        Ok(result)
    }

    /// Fetch history and compute stats for one coin; `None` means skip.
    async fn analyze_coin(&self, index: usize, total: usize, coin: &CoinSnapshot) -> Option<CoinStats> {
        if index > 0 && !self.config.request_delay.is_zero() {
            tokio::time::sleep(self.config.request_delay).await;
        }

        info!(progress = format!("[{}/{}]", index + 1, total), "Analyzing {coin}...");

        let history = match self.source.history(&coin.id, self.config.history_days).await {
            Ok(h) => h,
            Err(e) => {
                let err = CoinRankError::HistoryUnavailable {
                    coin_id: coin.id.clone(),
                    message: format!("{e:#}"),
                };
                warn!(error = %err, "Skipping coin");
                return None;
            }
        };

        let stats = compute_stats(coin, Some(&history));
        if stats.is_none() {
            warn!(
                coin_id = %coin.id,
                samples = history.len(),
                has_price = coin.current_price.is_some(),
                "Insufficient data for stats, skipping coin"
            );
        }
        stats
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
