//! COINRANK dashboard entry point.
//!
//! Serves the interactive dashboard. Each parameter combination is
//! analysed on demand and the immutable result cached for reuse.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use coinrank::config;
use coinrank::dashboard::{self, routes::DashboardState};
use coinrank::engine::{Pipeline, PipelineConfig};
use coinrank::logging::init_logging;
use coinrank::market::coingecko::CoinGeckoClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = config::AppConfig::load_or_default("config.toml")?;

    init_logging();

    info!(
        port = cfg.dashboard.port,
        persist_stats = cfg.dashboard.persist_stats,
        "COINRANK dashboard starting up"
    );

    let source = CoinGeckoClient::new(&cfg.market_data, cfg.market_data.api_key())?;
    let pipeline = Pipeline::new(
        Arc::new(source),
        PipelineConfig::from_app_config(&cfg, cfg.dashboard.persist_stats),
    );

    let state = Arc::new(DashboardState::new(pipeline));
    dashboard::serve(state, cfg.dashboard.port).await?;

    info!("COINRANK dashboard shut down cleanly.");
    Ok(())
}
