//! Dashboard API against an in-memory market data source.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use std::sync::Arc;
use tower::ServiceExt;

use coinrank::dashboard::build_router;
use coinrank::dashboard::routes::DashboardState;
use coinrank::engine::{Pipeline, PipelineConfig};

use common::{three_coin_source, StaticSource};

fn app(source: Arc<StaticSource>) -> Router {
    let pipeline = Pipeline::new(source, PipelineConfig::default());
    build_router(Arc::new(DashboardState::new(pipeline)))
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let resp = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), 1_000_000).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_analyze_returns_portfolio_and_charts() {
    let router = app(Arc::new(three_coin_source()));
    let (status, json) = get_json(router, "/api/analyze?amount=6000&strategy=balanced&coins=2").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["cached"], false);
    assert_eq!(json["strategy"], "balanced");
    assert_eq!(json["coins_requested"], 3);
    assert_eq!(json["coins_analysed"], 3);

    let portfolio = json["portfolio"].as_array().unwrap();
    assert_eq!(portfolio.len(), 2);
    assert_eq!(portfolio[0]["symbol"], "UP");
    assert_eq!(portfolio[0]["amount"], 3000.0);

    assert_eq!(json["ranking"].as_array().unwrap().len(), 3);
    assert_eq!(json["summary"]["total_investment"], 6000.0);

    // Volatility chart ascending: the flat coin has none.
    let vol = json["charts"]["volatility"].as_array().unwrap();
    assert_eq!(vol[0]["symbol"], "FLT");
    // Sharpe chart descending.
    let sharpe = json["charts"]["sharpe"].as_array().unwrap();
    assert_eq!(sharpe[0]["symbol"], "UP");
}

#[tokio::test]
async fn test_repeat_request_served_from_cache() {
    let source = Arc::new(three_coin_source());
    let router = app(source.clone());

    let (_, first) = get_json(router.clone(), "/api/analyze?coins=3").await;
    let (_, second) = get_json(router.clone(), "/api/analyze?coins=3").await;

    assert_eq!(second["cached"], true);
    assert_eq!(first["run_id"], second["run_id"]);
    // One run means one history request per coin.
    assert_eq!(source.requested_ids().len(), 3);

    let (_, refreshed) = get_json(router, "/api/analyze?coins=3&refresh=true").await;
    assert_eq!(refreshed["cached"], false);
    assert_ne!(refreshed["run_id"], first["run_id"]);
    assert_eq!(source.requested_ids().len(), 6);
}

#[tokio::test]
async fn test_changed_params_rerun_without_refresh() {
    let source = Arc::new(three_coin_source());
    let router = app(source.clone());

    let (_, first) = get_json(router.clone(), "/api/analyze?coins=3&refresh=false").await;
    let (_, changed) = get_json(router.clone(), "/api/analyze?coins=2&refresh=false").await;
    assert_eq!(changed["cached"], false);
    assert_ne!(changed["run_id"], first["run_id"]);
    assert_eq!(changed["portfolio"].as_array().unwrap().len(), 2);
    assert_eq!(source.requested_ids().len(), 6);

    // Only the latest parameters are remembered.
    let (_, again) = get_json(router, "/api/analyze?coins=3&refresh=false").await;
    assert_eq!(again["cached"], false);
    assert_eq!(source.requested_ids().len(), 9);
}

#[tokio::test]
async fn test_too_many_coins_rejected_by_dashboard() {
    let source = Arc::new(three_coin_source());
    let (status, json) = get_json(app(source.clone()), "/api/analyze?coins=21").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("number of coins"));
    assert!(source.requested_ids().is_empty());
}

#[tokio::test]
async fn test_unknown_strategy_falls_back_to_balanced() {
    let router = app(Arc::new(three_coin_source()));
    let (status, json) = get_json(router, "/api/analyze?strategy=moonshot").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["strategy"], "balanced");
}

#[tokio::test]
async fn test_amount_below_minimum_rejected() {
    let source = Arc::new(three_coin_source());
    let (status, json) = get_json(app(source.clone()), "/api/analyze?amount=50").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("amount"));
    assert!(source.requested_ids().is_empty());
}

#[tokio::test]
async fn test_unreachable_source_reports_hint() {
    let (status, json) = get_json(
        app(Arc::new(StaticSource::unreachable())),
        "/api/analyze",
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(json["error"].as_str().unwrap().contains("connection refused"));
    assert!(json["hint"].is_string());
}
