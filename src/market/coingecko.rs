//! CoinGecko market data integration.
//!
//! API docs: https://docs.coingecko.com/reference/introduction
//! Base URL: https://api.coingecko.com/api/v3
//! Rate limit: ~30 requests/minute on the public tier.
//! Auth: Not required; an optional demo key is sent as `x-cg-demo-api-key`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info};

use super::MarketDataSource;
use crate::config::MarketDataConfig;
use crate::types::{CoinSnapshot, PriceHistory};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const SOURCE_NAME: &str = "coingecko";

const API_KEY_HEADER: &str = "x-cg-demo-api-key";

/// `/coins/markets` page size ceiling.
const MAX_PER_PAGE: usize = 250;

// ---------------------------------------------------------------------------
// API response types (CoinGecko JSON → Rust)
// ---------------------------------------------------------------------------

/// One row of `/coins/markets`. We only deserialize the fields we need.
#[derive(Debug, Deserialize)]
struct CoinGeckoMarket {
    id: String,
    symbol: String,
    name: String,
    #[serde(default)]
    current_price: Option<f64>,
    #[serde(default)]
    market_cap: Option<f64>,
    #[serde(default)]
    total_volume: Option<f64>,
    #[serde(default)]
    price_change_percentage_24h_in_currency: Option<f64>,
    #[serde(default)]
    price_change_percentage_7d_in_currency: Option<f64>,
    #[serde(default)]
    price_change_percentage_30d_in_currency: Option<f64>,
}

/// Response of `/coins/{id}/market_chart`.
/// Each sample is `[timestamp_ms, value]`.
#[derive(Debug, Deserialize)]
struct CoinGeckoMarketChart {
    #[serde(default)]
    prices: Vec<(f64, Option<f64>)>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// CoinGecko market data client.
pub struct CoinGeckoClient {
    http: Client,
    base_url: String,
    vs_currency: String,
    api_key: Option<String>,
}

impl CoinGeckoClient {
    /// Create a new CoinGecko client.
    ///
    /// `api_key` is optional; the public tier works without one.
    pub fn new(config: &MarketDataConfig, api_key: Option<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .user_agent("COINRANK/0.1.0 (crypto-recommender)")
            .build()
            .context("Failed to build HTTP client for CoinGecko")?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            vs_currency: config.vs_currency.clone(),
            api_key,
        })
    }

    // -- Internal helpers ------------------------------------------------

    fn markets_url(&self, limit: usize) -> String {
        format!(
            "{}/coins/markets?vs_currency={}&order=market_cap_desc&per_page={}&page=1\
             &sparkline=false&price_change_percentage=24h%2C7d%2C30d",
            self.base_url,
            urlencoding::encode(&self.vs_currency),
            limit.clamp(1, MAX_PER_PAGE),
        )
    }

    fn history_url(&self, coin_id: &str, days: u32) -> String {
        format!(
            "{}/coins/{}/market_chart?vs_currency={}&days={}",
            self.base_url,
            urlencoding::encode(coin_id),
            urlencoding::encode(&self.vs_currency),
            days,
        )
    }

    /// GET a URL and decode the JSON body, failing on non-2xx status.
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!(url = %url, "Fetching CoinGecko data");

        let mut req = self.http.get(url);
        if let Some(key) = &self.api_key {
            req = req.header(API_KEY_HEADER, key);
        }

        let resp = req.send().await.context("CoinGecko API request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("CoinGecko API error {status}: {body}");
        }

        resp.json()
            .await
            .context("Failed to parse CoinGecko response")
    }

    fn to_snapshot(m: CoinGeckoMarket) -> CoinSnapshot {
        CoinSnapshot {
            id: m.id,
            name: m.name,
            symbol: m.symbol.to_uppercase(),
            current_price: m.current_price,
            market_cap: m.market_cap,
            volume_24h: m.total_volume,
            change_24h: m.price_change_percentage_24h_in_currency,
            change_7d: m.price_change_percentage_7d_in_currency,
            change_30d: m.price_change_percentage_30d_in_currency,
        }
    }

    /// Keep the price column; null samples become NaN so they flow into
    /// the stats as missing values rather than failing the whole coin.
    fn to_history(chart: CoinGeckoMarketChart) -> PriceHistory {
        chart
            .prices
            .into_iter()
            .map(|(_, price)| price.unwrap_or(f64::NAN))
            .collect::<Vec<_>>()
            .into()
    }
}

// ---------------------------------------------------------------------------
// MarketDataSource trait implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl MarketDataSource for CoinGeckoClient {
    async fn top_coins(&self, limit: usize) -> Result<Vec<CoinSnapshot>> {
        info!(limit, "Fetching top coins by market cap from CoinGecko...");

        let markets: Vec<CoinGeckoMarket> = self
            .get_json(&self.markets_url(limit))
            .await
            .context("Failed to fetch CoinGecko markets")?;

        let coins: Vec<CoinSnapshot> = markets
            .into_iter()
            .take(limit)
            .map(Self::to_snapshot)
            .collect();

        info!(count = coins.len(), "CoinGecko markets fetched");
        Ok(coins)
    }

    async fn history(&self, coin_id: &str, days: u32) -> Result<PriceHistory> {
        let chart: CoinGeckoMarketChart = self
            .get_json(&self.history_url(coin_id, days))
            .await
            .with_context(|| format!("Failed to fetch CoinGecko history for {coin_id}"))?;

        let history = Self::to_history(chart);
        debug!(coin_id, samples = history.len(), "CoinGecko history fetched");
        Ok(history)
    }

    fn name(&self) -> &'static str {
        SOURCE_NAME
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
