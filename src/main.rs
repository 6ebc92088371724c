//! COINRANK batch entry point.
//!
//! Loads configuration, initialises structured logging, runs one analysis
//! over the top coins, persists the stats table, and prints the
//! recommended portfolio. Exits non-zero only if the run itself fails.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use coinrank::config;
use coinrank::engine::{Pipeline, PipelineConfig};
use coinrank::logging::init_logging;
use coinrank::market::coingecko::CoinGeckoClient;
use coinrank::types::RunResult;

const BANNER: &str = r#"
  ____ ___ ___ _   _ ____      _    _   _ _  __
 / ___/ _ \_ _| \ | |  _ \    / \  | \ | | |/ /
| |  | | | | ||  \| | |_) |  / _ \ |  \| | ' /
| |__| |_| | || |\  |  _ <  / ___ \| |\  | . \
 \____\___/___|_| \_|_| \_\/_/   \_\_| \_|_|\_\

  Top-20 Crypto Risk/Return Recommender
  v0.1.0 | Batch Run
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = config::AppConfig::load_or_default("config.toml")?;

    init_logging();

    println!("{BANNER}");

    let params = cfg.analysis.params();
    info!(
        strategy = %params.strategy,
        amount = params.investment_amount,
        top_n = params.top_n,
        coins = cfg.analysis.coin_limit,
        "COINRANK starting up"
    );

    let source = CoinGeckoClient::new(&cfg.market_data, cfg.market_data.api_key())?;
    let pipeline = Pipeline::new(Arc::new(source), PipelineConfig::from_app_config(&cfg, true));

    let result = pipeline.run(&params).await?;

    print_portfolio(&result);

    Ok(())
}

/// Print the recommended portfolio and its headline figures.
fn print_portfolio(result: &RunResult) {
    let params = &result.params;
    let summary = result.summary();

    println!(
        "\nRecommended Portfolio (${:.2} {}):",
        params.investment_amount, params.strategy
    );
    println!(
        "{:<8} {:<20} {:>12} {:>14} {:>8}",
        "SYMBOL", "NAME", "AMOUNT", "QUANTITY", "SHARPE"
    );
    println!("{:-<66}", "");
    for line in &result.portfolio {
        println!("{line}");
    }
    println!("{:-<66}", "");

    if result.portfolio.is_empty() {
        println!("No coins could be ranked. Check your internet connection and try again.");
    }

    println!(
        "Analysed {}/{} coins | avg volatility {:.2}% | avg Sharpe {:.3}",
        result.stats.len(),
        result.coins_requested,
        summary.avg_annual_volatility * 100.0,
        summary.avg_sharpe_ratio,
    );
    if !result.skipped.is_empty() {
        println!("Skipped: {}", result.skipped.join(", "));
    }
}
