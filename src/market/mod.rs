//! Market data sources.
//!
//! Defines the `MarketDataSource` trait the pipeline consumes and the
//! CoinGecko implementation used in production.

pub mod coingecko;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::{CoinSnapshot, PriceHistory};

/// Abstraction over market data providers.
///
/// Implementors supply the current top coins by market cap and a daily
/// price history per coin.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Fetch up to `limit` coins ordered by market cap, largest first.
    async fn top_coins(&self, limit: usize) -> Result<Vec<CoinSnapshot>>;

    /// Fetch daily prices for `coin_id` covering the last `days` days,
    /// oldest first.
    async fn history(&self, coin_id: &str, days: u32) -> Result<PriceHistory>;

    /// Source name for logging and error messages.
    fn name(&self) -> &'static str;
}
