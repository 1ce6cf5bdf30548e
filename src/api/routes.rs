//! API route handlers.
//!
//! All endpoints return JSON. Errors are reported as `{"error": "..."}`.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{AppConfig, EngineConfig};
use crate::engine::{run_scan, ScanReport};
use crate::strategy::kelly::{KellyCalculator, ParlayLeg, ParlayResult};
use crate::types::ScanBatch;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct ApiState {
    pub config: AppConfig,
}

impl ApiState {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }
}

pub type AppState = Arc<ApiState>;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// A scan request: the batch plus optional per-request overrides.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanRequest {
    pub batch: ScanBatch,
    #[serde(default)]
    pub bankroll: Option<Decimal>,
    #[serde(default)]
    pub run_seed: Option<u64>,
    #[serde(default)]
    pub time_budget_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParlayRequest {
    pub legs: Vec<ParlayLeg>,
    #[serde(default)]
    pub bankroll: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("scan task failed: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /api/config
pub async fn get_config(State(state): State<AppState>) -> Json<EngineConfig> {
    Json(state.config.engine.clone())
}

/// POST /api/scan
///
/// The scan is CPU bound, so it runs on the blocking pool.
pub async fn post_scan(
    State(state): State<AppState>,
    Json(request): Json<ScanRequest>,
) -> Result<Json<ScanReport>, ApiError> {
    let mut config = state.config.engine.clone();
    if let Some(bankroll) = request.bankroll {
        config.scan.bankroll = bankroll;
    }
    if let Some(seed) = request.run_seed {
        config.scan.run_seed = seed;
    }
    if request.time_budget_ms.is_some() {
        config.scan.time_budget_ms = request.time_budget_ms;
    }

    let events = request.batch.events.len();
    let report = tokio::task::spawn_blocking(move || run_scan(config, &request.batch))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| {
            warn!(error = %e, "Scan request rejected");
            ApiError::BadRequest(e.to_string())
        })?;

    info!(
        events,
        picks = report.picks.len(),
        staked = format!("${:.2}", report.summary.total_staked),
        "Scan request served"
    );
    Ok(Json(report))
}

/// POST /api/parlay
pub async fn post_parlay(
    State(state): State<AppState>,
    Json(request): Json<ParlayRequest>,
) -> Result<Json<ParlayResult>, ApiError> {
    let engine = &state.config.engine;
    let bankroll = request.bankroll.unwrap_or(engine.scan.bankroll);
    let result = KellyCalculator::new(engine.kelly.clone())
        .evaluate_parlay(&request.legs, bankroll)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok(Json(result))
}
