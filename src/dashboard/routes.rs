//! Dashboard API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<DashboardState>`.
//! The latest completed run is kept as an immutable `Arc<RunResult>`
//! together with its parameter tuple. Asking again with the same tuple
//! reuses it; a different tuple or `refresh=true` starts a new run.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};
use uuid::Uuid;

use crate::engine::Pipeline;
use crate::types::{
    AnalysisParams, CoinRankError, PortfolioLine, PortfolioSummary, RunResult, Strategy,
};

/// Guidance shown next to data-source failures.
const CONNECTIVITY_HINT: &str =
    "Make sure you have internet access and the CoinGecko API is reachable, then try again.";

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Cache key: the parameter tuple of a run. The amount is keyed by its
/// bit pattern since `f64` isn't `Hash`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamsKey {
    strategy: Strategy,
    amount_bits: u64,
    top_n: usize,
}

impl From<&AnalysisParams> for ParamsKey {
    fn from(p: &AnalysisParams) -> Self {
        Self {
            strategy: p.strategy,
            amount_bits: p.investment_amount.to_bits(),
            top_n: p.top_n,
        }
    }
}

/// Shared state accessible by all route handlers.
pub struct DashboardState {
    pub pipeline: Pipeline,
    latest: RwLock<Option<(ParamsKey, Arc<RunResult>)>>,
}

impl DashboardState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            latest: RwLock::new(None),
        }
    }

    /// The latest result, if it was produced with `params`.
    pub async fn cached(&self, params: &AnalysisParams) -> Option<Arc<RunResult>> {
        let key = ParamsKey::from(params);
        self.latest
            .read()
            .await
            .as_ref()
            .filter(|(k, _)| *k == key)
            .map(|(_, result)| Arc::clone(result))
    }

    /// Run the pipeline for `params` and make it the latest result.
    /// The lock is not held while the run is in flight.
    pub async fn run_and_cache(&self, params: &AnalysisParams) -> anyhow::Result<Arc<RunResult>> {
        let result = Arc::new(self.pipeline.run(params).await?);
        *self.latest.write().await = Some((ParamsKey::from(params), Arc::clone(&result)));
        Ok(result)
    }

    /// Parameters of the latest result.
    pub async fn latest_params(&self) -> Option<AnalysisParams> {
        self.latest.read().await.as_ref().map(|(_, result)| result.params)
    }
}

pub type AppState = Arc<DashboardState>;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Query string of `GET /api/analyze`. Missing fields take the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyzeQuery {
    pub amount: Option<f64>,
    pub strategy: Option<String>,
    pub coins: Option<usize>,
    /// Force a fresh run even if a cached result exists.
    #[serde(default)]
    pub refresh: bool,
}

impl AnalyzeQuery {
    pub fn params(&self) -> AnalysisParams {
        AnalysisParams::new(
            self.strategy
                .as_deref()
                .map(Strategy::from_name_lossy)
                .unwrap_or_default(),
            self.amount.unwrap_or(AnalysisParams::DEFAULT_AMOUNT),
            self.coins.unwrap_or(AnalysisParams::DEFAULT_COINS),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyInfo {
    pub name: Strategy,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamsResponse {
    pub min_amount: f64,
    pub max_amount: f64,
    pub default_amount: f64,
    pub amount_step: f64,
    pub min_coins: usize,
    pub max_coins: usize,
    pub default_coins: usize,
    pub default_strategy: Strategy,
    pub strategies: Vec<StrategyInfo>,
}

/// One row of the full ranking table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingRow {
    pub symbol: String,
    pub name: String,
    pub current_price: f64,
    pub annual_return: f64,
    pub annual_volatility: f64,
    pub sharpe_ratio: f64,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartPoint {
    pub symbol: String,
    pub value: f64,
}

/// Series for the three portfolio charts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartData {
    /// Amount per coin.
    pub allocation: Vec<ChartPoint>,
    /// Annual volatility, ascending.
    pub volatility: Vec<ChartPoint>,
    /// Sharpe ratio, descending.
    pub sharpe: Vec<ChartPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub cached: bool,
    pub strategy: Strategy,
    pub strategy_description: String,
    pub investment_amount: f64,
    pub top_n: usize,
    pub coins_requested: usize,
    pub coins_analysed: usize,
    pub skipped: Vec<String>,
    pub summary: PortfolioSummary,
    pub portfolio: Vec<PortfolioLine>,
    pub ranking: Vec<RankingRow>,
    pub charts: ChartData,
}

impl AnalysisResponse {
    pub fn from_result(result: &RunResult, cached: bool) -> Self {
        let points = |f: fn(&PortfolioLine) -> f64| -> Vec<ChartPoint> {
            result
                .portfolio
                .iter()
                .map(|l| ChartPoint {
                    symbol: l.symbol.clone(),
                    value: f(l),
                })
                .collect()
        };

        let mut volatility = points(|l| l.annual_volatility);
        volatility.sort_by(|a, b| a.value.total_cmp(&b.value));
        let mut sharpe = points(|l| l.sharpe_ratio);
        sharpe.sort_by(|a, b| b.value.total_cmp(&a.value));

        Self {
            run_id: result.run_id,
            generated_at: result.generated_at,
            cached,
            strategy: result.params.strategy,
            strategy_description: result.params.strategy.description().to_string(),
            investment_amount: result.params.investment_amount,
            top_n: result.params.top_n,
            coins_requested: result.coins_requested,
            coins_analysed: result.stats.len(),
            skipped: result.skipped.clone(),
            summary: result.summary(),
            portfolio: result.portfolio.clone(),
            ranking: result
                .ranked
                .iter()
                .map(|r| RankingRow {
                    symbol: r.stats.symbol.clone(),
                    name: r.stats.name.clone(),
                    current_price: r.stats.current_price,
                    annual_return: r.stats.annual_return,
                    annual_volatility: r.stats.annual_volatility,
                    sharpe_ratio: r.stats.sharpe_ratio,
                    score: r.score,
                })
                .collect(),
            charts: ChartData {
                allocation: points(|l| l.amount),
                volatility,
                sharpe,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub hint: Option<String>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(err: &anyhow::Error) -> ApiError {
    match err.downcast_ref::<CoinRankError>() {
        Some(CoinRankError::InvalidParams(msg)) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: msg.clone(),
                hint: None,
            }),
        ),
        Some(e @ CoinRankError::SourceUnavailable { .. }) => (
            StatusCode::BAD_GATEWAY,
            Json(ErrorResponse {
                error: e.to_string(),
                hint: Some(CONNECTIVITY_HINT.to_string()),
            }),
        ),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Analysis failed".to_string(),
                hint: Some(CONNECTIVITY_HINT.to_string()),
            }),
        ),
    }
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /api/params
pub async fn get_params() -> Json<ParamsResponse> {
    Json(ParamsResponse {
        min_amount: AnalysisParams::MIN_AMOUNT,
        max_amount: AnalysisParams::MAX_AMOUNT,
        default_amount: AnalysisParams::DEFAULT_AMOUNT,
        amount_step: AnalysisParams::AMOUNT_STEP,
        min_coins: AnalysisParams::MIN_COINS,
        max_coins: AnalysisParams::MAX_COINS,
        default_coins: AnalysisParams::DEFAULT_COINS,
        default_strategy: Strategy::default(),
        strategies: Strategy::ALL
            .iter()
            .map(|s| StrategyInfo {
                name: *s,
                description: s.description().to_string(),
            })
            .collect(),
    })
}

/// GET /api/analyze?amount=&strategy=&coins=&refresh=
pub async fn analyze(
    State(state): State<AppState>,
    Query(query): Query<AnalyzeQuery>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let params = query.params();
    if let Err(e) = params.validate_dashboard_bounds() {
        return Err(api_error(&e.into()));
    }

    if !query.refresh {
        if let Some(result) = state.cached(&params).await {
            info!(run_id = %result.run_id, params = %params, "Serving cached analysis");
            return Ok(Json(AnalysisResponse::from_result(&result, true)));
        }
    }

    match state.run_and_cache(&params).await {
        Ok(result) => Ok(Json(AnalysisResponse::from_result(&result, false))),
        Err(e) => {
            error!(error = %format!("{e:#}"), params = %params, "Dashboard analysis failed");
            Err(api_error(&e))
        }
    }
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::PipelineConfig;
    use crate::market::MockMarketDataSource;
    use crate::types::{CoinSnapshot, CoinStats, PriceHistory, RankedCoin};

    fn snapshot(id: &str) -> CoinSnapshot {
        CoinSnapshot {
            id: id.into(),
            name: id.into(),
            symbol: id.into(),
            current_price: Some(4.0),
            market_cap: None,
            volume_24h: None,
            change_24h: None,
            change_7d: None,
            change_30d: None,
        }
    }

    fn state_with_calls(expected_runs: usize) -> AppState {
        let mut mock = MockMarketDataSource::new();
        mock.expect_name().return_const("mock");
        mock.expect_top_coins()
            .times(expected_runs)
            .returning(|_| Ok(vec![snapshot("aaa"), snapshot("bbb")]));
        mock.expect_history().returning(|id, _| {
            Ok(PriceHistory::new(match id {
                "aaa" => vec![1.0, 1.1, 1.05, 1.2],
                _ => vec![1.0, 0.9, 0.95, 0.8],
            }))
        });
        Arc::new(DashboardState::new(Pipeline::new(
            Arc::new(mock),
            PipelineConfig::default(),
        )))
    }

    #[test]
    fn test_query_defaults() {
        let params = AnalyzeQuery::default().params();
        assert_eq!(params, AnalysisParams::default());
    }

    #[test]
    fn test_query_unknown_strategy_is_balanced() {
        let query = AnalyzeQuery {
            strategy: Some("hodl".into()),
            ..AnalyzeQuery::default()
        };
        assert_eq!(query.params().strategy, Strategy::Balanced);
    }

    #[test]
    fn test_params_key_distinguishes_tuples() {
        let a = AnalysisParams::new(Strategy::Balanced, 1000.0, 5);
        let b = AnalysisParams::new(Strategy::Balanced, 1000.0, 6);
        let c = AnalysisParams::new(Strategy::Aggressive, 1000.0, 5);
        assert_eq!(ParamsKey::from(&a), ParamsKey::from(&a.clone()));
        assert_ne!(ParamsKey::from(&a), ParamsKey::from(&b));
        assert_ne!(ParamsKey::from(&a), ParamsKey::from(&c));
    }

    #[test]
    fn test_response_charts_sorted() {
        let line = |sym: &str, vol: f64, sharpe: f64| PortfolioLine {
            symbol: sym.into(),
            name: sym.into(),
            current_price: 2.0,
            amount: 500.0,
            quantity: 250.0,
            score: 0.5,
            annual_volatility: vol,
            sharpe_ratio: sharpe,
        };
        let result = RunResult {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            params: AnalysisParams::new(Strategy::Conservative, 1000.0, 2),
            coins_requested: 2,
            skipped: vec![],
            stats: vec![],
            ranked: vec![RankedCoin {
                stats: CoinStats::sample("X", 0.1, 0.2, 0.3),
                score: 1.0,
            }],
            portfolio: vec![line("HI", 0.9, 0.1), line("LO", 0.2, 1.5)],
        };

        let resp = AnalysisResponse::from_result(&result, true);
        assert!(resp.cached);
        assert_eq!(resp.strategy_description, "Low risk, lower returns");
        assert_eq!(resp.charts.allocation.len(), 2);
        assert_eq!(resp.charts.volatility[0].symbol, "LO");
        assert_eq!(resp.charts.sharpe[0].symbol, "LO");
        assert_eq!(resp.ranking.len(), 1);
        assert_eq!(resp.ranking[0].score, 1.0);
    }

    #[test]
    fn test_api_error_status_codes() {
        let bad: anyhow::Error = CoinRankError::InvalidParams("nope".into()).into();
        assert_eq!(api_error(&bad).0, StatusCode::BAD_REQUEST);

        let down: anyhow::Error = CoinRankError::SourceUnavailable {
            data_source: "coingecko".into(),
            message: "timeout".into(),
        }
        .into();
        let (status, Json(body)) = api_error(&down);
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body.hint.unwrap().contains("internet"));

        let other = anyhow::anyhow!("disk full");
        assert_eq!(api_error(&other).0, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_get_params_handler() {
        let Json(resp) = get_params().await;
        assert_eq!(resp.min_amount, 100.0);
        assert_eq!(resp.max_amount, 1_000_000.0);
        assert_eq!(resp.max_coins, 20);
        assert_eq!(resp.strategies.len(), 3);
        assert_eq!(resp.default_strategy, Strategy::Balanced);
    }

    #[tokio::test]
    async fn test_analyze_handler_caches_by_params() {
        let state = state_with_calls(1);
        let query = AnalyzeQuery {
            amount: Some(2_000.0),
            coins: Some(2),
            ..AnalyzeQuery::default()
        };

        let Json(first) = analyze(State(state.clone()), Query(query.clone())).await.unwrap();
        assert!(!first.cached);
        assert_eq!(first.portfolio.len(), 2);
        assert_eq!(first.ranking[0].symbol, "AAA");

        let Json(second) = analyze(State(state), Query(query)).await.unwrap();
        assert!(second.cached);
        assert_eq!(second.run_id, first.run_id);
    }

    #[tokio::test]
    async fn test_analyze_handler_refresh_reruns() {
        let state = state_with_calls(2);
        let query = AnalyzeQuery::default();
        let Json(first) = analyze(State(state.clone()), Query(query)).await.unwrap();

        let refresh = AnalyzeQuery {
            refresh: true,
            ..AnalyzeQuery::default()
        };
        let Json(second) = analyze(State(state), Query(refresh)).await.unwrap();
        assert!(!second.cached);
        assert_ne!(second.run_id, first.run_id);
    }

    #[tokio::test]
    async fn test_parameter_change_reruns_and_replaces_latest() {
        let state = state_with_calls(3);
        let query = |amount: f64| AnalyzeQuery {
            amount: Some(amount),
            coins: Some(2),
            ..AnalyzeQuery::default()
        };

        let Json(first) = analyze(State(state.clone()), Query(query(1_000.0))).await.unwrap();
        let Json(changed) = analyze(State(state.clone()), Query(query(1_500.0))).await.unwrap();
        assert!(!changed.cached);
        assert_ne!(changed.run_id, first.run_id);
        assert_eq!(changed.investment_amount, 1_500.0);

        // Only the latest tuple is kept, so going back runs again.
        let Json(back) = analyze(State(state.clone()), Query(query(1_000.0))).await.unwrap();
        assert!(!back.cached);
        assert_eq!(
            state.latest_params().await,
            Some(AnalysisParams::new(Strategy::Balanced, 1_000.0, 2))
        );
    }

    #[tokio::test]
    async fn test_cache_holds_one_result_across_many_amounts() {
        let state = state_with_calls(50);
        for i in 0..50 {
            let query = AnalyzeQuery {
                amount: Some(1_000.0 + i as f64),
                ..AnalyzeQuery::default()
            };
            analyze(State(state.clone()), Query(query)).await.unwrap();
        }

        let first = AnalysisParams::new(Strategy::Balanced, 1_000.0, 5);
        assert!(state.cached(&first).await.is_none());
        let last = AnalysisParams::new(Strategy::Balanced, 1_049.0, 5);
        assert!(state.cached(&last).await.is_some());
    }

    #[tokio::test]
    async fn test_analyze_handler_rejects_too_many_coins() {
        let state = state_with_calls(0);
        let query = AnalyzeQuery {
            coins: Some(AnalysisParams::MAX_COINS + 1),
            ..AnalyzeQuery::default()
        };
        let (status, Json(body)) = analyze(State(state), Query(query)).await.unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.error.contains("number of coins"));
    }

    #[tokio::test]
    async fn test_analyze_handler_rejects_bad_amount() {
        let state = state_with_calls(0);
        let query = AnalyzeQuery {
            amount: Some(5.0),
            ..AnalyzeQuery::default()
        };
        let (status, Json(body)) = analyze(State(state), Query(query)).await.unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.error.contains("investment amount"));
    }
}
