//! HTTP API: Axum server exposing scans and parlay pricing.
//!
//! Stateless apart from the loaded configuration. CORS enabled for local
//! tooling.

pub mod routes;

use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::config::AppConfig;
use routes::{ApiState, AppState};

/// Bind and serve until the process is stopped.
pub async fn serve(config: AppConfig) -> Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(addr = %addr, "API server listening");

    let app = build_router(Arc::new(ApiState::new(config)));
    axum::serve(listener, app).await.context("API server error")?;
    Ok(())
}

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(HeaderValue::from_static("*"))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(routes::health))
        .route("/api/config", get(routes::get_config))
        .route("/api/scan", post(routes::post_scan))
        .route("/api/parlay", post(routes::post_parlay))
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
