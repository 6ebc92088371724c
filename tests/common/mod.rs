//! Shared fixtures for integration tests.
//!
//! `StaticSource` is an in-memory `MarketDataSource` with canned
//! snapshots and price histories. It records every history request so
//! tests can assert on call order.

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use coinrank::market::MarketDataSource;
use coinrank::types::{CoinSnapshot, PriceHistory};

#[derive(Default)]
pub struct StaticSource {
    coins: Vec<CoinSnapshot>,
    histories: HashMap<String, Vec<f64>>,
    fail_top_coins: bool,
    pub requested: Mutex<Vec<(String, u32)>>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a coin with a price history.
    pub fn with_coin(mut self, snapshot: CoinSnapshot, prices: Vec<f64>) -> Self {
        self.histories.insert(snapshot.id.clone(), prices);
        self.coins.push(snapshot);
        self
    }

    /// Add a coin whose history request fails.
    pub fn with_coin_without_history(mut self, snapshot: CoinSnapshot) -> Self {
        self.coins.push(snapshot);
        self
    }

    /// Make the leaderboard request fail.
    pub fn unreachable() -> Self {
        Self {
            fail_top_coins: true,
            ..Self::default()
        }
    }

    pub fn requested_ids(&self) -> Vec<String> {
        self.requested
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }
}

#[async_trait]
impl MarketDataSource for StaticSource {
    async fn top_coins(&self, limit: usize) -> Result<Vec<CoinSnapshot>> {
        if self.fail_top_coins {
            return Err(anyhow!("connection refused"));
        }
        Ok(self.coins.iter().take(limit).cloned().collect())
    }

    async fn history(&self, coin_id: &str, days: u32) -> Result<PriceHistory> {
        self.requested
            .lock()
            .unwrap()
            .push((coin_id.to_string(), days));
        self.histories
            .get(coin_id)
            .cloned()
            .map(PriceHistory::new)
            .ok_or_else(|| anyhow!("HTTP 429 Too Many Requests"))
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

pub fn snapshot(id: &str, symbol: &str, price: f64) -> CoinSnapshot {
    CoinSnapshot {
        id: id.to_string(),
        name: id.to_string(),
        symbol: symbol.to_string(),
        current_price: Some(price),
        market_cap: Some(1_000_000.0),
        volume_24h: Some(50_000.0),
        change_24h: Some(0.5),
        change_7d: None,
        change_30d: Some(-3.0),
    }
}

/// Constant prices: zero return, zero volatility.
pub fn flat_prices(days: usize) -> Vec<f64> {
    vec![100.0; days]
}

/// Alternating +0.5% / +1.5% days: steady climb with mild volatility.
pub fn rising_prices(days: usize) -> Vec<f64> {
    zigzag(days, 1.005, 1.015)
}

/// Alternating -1.5% / -0.5% days: steady decline with mild volatility.
pub fn falling_prices(days: usize) -> Vec<f64> {
    zigzag(days, 0.985, 0.995)
}

fn zigzag(days: usize, even: f64, odd: f64) -> Vec<f64> {
    let mut prices = Vec::with_capacity(days);
    let mut price = 100.0;
    for day in 0..days {
        prices.push(price);
        price *= if day % 2 == 0 { even } else { odd };
    }
    prices
}

/// A three-coin universe: flat, rising, falling (in that leaderboard order).
pub fn three_coin_source() -> StaticSource {
    StaticSource::new()
        .with_coin(snapshot("flatcoin", "flt", 1.0), flat_prices(60))
        .with_coin(snapshot("upcoin", "up", 2.0), rising_prices(60))
        .with_coin(snapshot("downcoin", "dwn", 4.0), falling_prices(60))
}
