//! Dashboard API route handlers.
//!
//! All endpoints return JSON. The engine is shared via `Arc<DashboardState>`
//! behind a single async mutex, so a cycle triggered here and one
//! triggered by the auto timer never interleave.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

use crate::engine::accountant::{Accountant, ColorDistribution, CycleReport, Reconciliation, SessionSummary};
use crate::engine::Engine;
use crate::types::{Color, EngineError, Outcome, Prediction, Wager};

/// Maximum entries returned by the list endpoints.
const LIST_LIMIT: usize = 100;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

pub struct DashboardState {
    pub engine: Mutex<Engine>,
    pub started_at: DateTime<Utc>,
}

impl DashboardState {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine: Mutex::new(engine),
            started_at: Utc::now(),
        }
    }
}

pub type AppState = Arc<DashboardState>;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub summary: SessionSummary,
    pub reconciliation: Reconciliation,
    pub uptime_secs: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsResponse {
    pub method_usage: BTreeMap<String, usize>,
    pub color_distribution: ColorDistribution,
    pub red_pct: f64,
    pub black_pct: f64,
    pub zero_pct: f64,
    pub prediction_accuracy: f64,
    pub win_rate: f64,
    pub net_profit: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModeResponse {
    pub auto_mode: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResetRequest {
    #[serde(default)]
    pub clear_auto_mode: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /api/status
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let engine = state.engine.lock().await;
    Json(StatusResponse {
        summary: Accountant::summarize(engine.state()),
        reconciliation: Accountant::reconcile(engine.state()),
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
    })
}

/// GET /api/history (most recent first)
pub async fn get_history(State(state): State<AppState>) -> Json<Vec<Outcome>> {
    let engine = state.engine.lock().await;
    let history = &engine.state().history;
    Json(history[..history.len().min(LIST_LIMIT)].to_vec())
}

/// GET /api/predictions
pub async fn get_predictions(State(state): State<AppState>) -> Json<Vec<Prediction>> {
    let engine = state.engine.lock().await;
    let log = &engine.state().predictions;
    let start = log.len().saturating_sub(LIST_LIMIT);
    Json(log[start..].to_vec())
}

/// GET /api/wagers
pub async fn get_wagers(State(state): State<AppState>) -> Json<Vec<Wager>> {
    let engine = state.engine.lock().await;
    let log = &engine.state().wagers;
    let start = log.len().saturating_sub(LIST_LIMIT);
    Json(log[start..].to_vec())
}

/// GET /api/metrics
pub async fn get_metrics(State(state): State<AppState>) -> Json<MetricsResponse> {
    let engine = state.engine.lock().await;
    let summary = Accountant::summarize(engine.state());
    let dist = summary.color_distribution;
    Json(MetricsResponse {
        red_pct: dist.percent(Color::Red),
        black_pct: dist.percent(Color::Black),
        zero_pct: dist.percent(Color::Zero),
        color_distribution: dist,
        method_usage: summary.method_usage,
        prediction_accuracy: summary.prediction_accuracy,
        win_rate: summary.win_rate,
        net_profit: summary.net_profit.to_f64().unwrap_or(0.0),
    })
}

/// POST /api/cycle
pub async fn run_cycle(
    State(state): State<AppState>,
) -> Result<Json<CycleReport>, (StatusCode, Json<ErrorResponse>)> {
    let mut engine = state.engine.lock().await;
    match engine.run_cycle().await {
        Ok(report) => Ok(Json(report)),
        Err(e) => {
            warn!(error = %e, "Requested cycle failed");
            let status = match e {
                EngineError::FeedUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                EngineError::AlreadySettled(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            Err((status, Json(ErrorResponse { error: e.to_string() })))
        }
    }
}

/// POST /api/auto-mode
pub async fn toggle_auto_mode(State(state): State<AppState>) -> Json<ModeResponse> {
    let mut engine = state.engine.lock().await;
    Json(ModeResponse {
        auto_mode: engine.toggle_auto_mode(),
    })
}

/// POST /api/reset
pub async fn reset(
    State(state): State<AppState>,
    body: Option<Json<ResetRequest>>,
) -> Json<SessionSummary> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let mut engine = state.engine.lock().await;
    let fresh = engine.reset_system(request.clear_auto_mode);
    Json(Accountant::summarize(fresh))
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
