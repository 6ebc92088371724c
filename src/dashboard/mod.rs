//! Dashboard: Axum web server for interactive analysis.
//!
//! Serves a JSON API and a self-contained HTML page with the parameter
//! controls, portfolio tables, and charts. CORS enabled for local
//! development.

pub mod routes;

use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderValue, Method},
    response::Html,
    routing::get,
    Router,
};
use tower_http::cors::CorsLayer;
use tracing::info;

use routes::AppState;

/// Single-page UI; talks to `/api/params` and `/api/analyze`.
const DASHBOARD_HTML: &str = include_str!("templates/index.html");

/// Bind `port` and serve the dashboard until Ctrl+C.
pub async fn serve(state: AppState, port: u16) -> Result<()> {
    let app = build_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind dashboard port {port}"))?;
    info!(port, "Dashboard server listening on http://localhost:{port}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received.");
        })
        .await
        .context("Dashboard server error")
}

/// Routes for the page, the JSON API, and the health probe.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(HeaderValue::from_static("*"))
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        // JSON API
        .route("/api/params", get(routes::get_params))
        .route("/api/analyze", get(routes::analyze))
        .route("/health", get(routes::health))
        // Page
        .route("/", get(serve_dashboard))
        .layer(cors)
        .with_state(state)
}

/// GET /
async fn serve_dashboard() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
