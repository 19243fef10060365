//! API routes for battwatchd

use crate::server::AppState;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use battwatch_common::{BatteryError, BatteryReading, Snapshot, HISTORY_LIMIT};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};

type AppStateArc = Arc<AppState>;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Any service failure, rendered as a generic 500
#[derive(Debug)]
pub struct ApiError(pub BatteryError);

impl From<BatteryError> for ApiError {
    fn from(err: BatteryError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!("  Request failed: {}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: self.0.user_message().to_string(),
            }),
        )
            .into_response()
    }
}

// ============================================================================
// Battery Routes
// ============================================================================

pub fn battery_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/api/battery/current", get(get_current))
        .route("/api/battery/history", get(get_history))
        .route("/api/battery/log", post(log_snapshot))
}

async fn get_current(State(state): State<AppStateArc>) -> Result<Json<BatteryReading>, ApiError> {
    let reading = state.service.current().await?;
    Ok(Json(reading))
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<usize>,
}

async fn get_history(
    State(state): State<AppStateArc>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> Response {
    let limit = match params {
        Ok(Query(params)) => params.limit.unwrap_or(HISTORY_LIMIT),
        Err(rejection) => {
            warn!("  Rejected history query: {}", rejection.body_text());
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "Invalid limit parameter".to_string(),
                }),
            )
                .into_response();
        }
    };

    match state.service.history(limit).await {
        Ok(history) => Json(history).into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogResponse {
    pub message: String,
    pub log: Snapshot,
}

async fn log_snapshot(State(state): State<AppStateArc>) -> Result<Json<LogResponse>, ApiError> {
    let log = state.service.log_snapshot().await?;
    Ok(Json(LogResponse {
        message: "Battery status logged".to_string(),
        log,
    }))
}

// ============================================================================
// Health Routes
// ============================================================================

pub fn health_routes() -> Router<AppStateArc> {
    Router::new().route("/health", get(health))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub store: String,
}

async fn health(State(state): State<AppStateArc>) -> Json<HealthResponse> {
    let store_open = state
        .service
        .store()
        .map(|store| store.is_open())
        .unwrap_or(false);

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        store: if store_open { "connected" } else { "unavailable" }.to_string(),
    })
}
