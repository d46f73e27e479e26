//! Read-only HTTP API over the predictor
//!
//! - GET /                 service banner
//! - GET /health           liveness check
//! - GET /api/predictions  predictions for the upcoming window

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::models::PredictionSummary;
use crate::predictor::Predictor;

/// Shared server state
pub struct AppState {
    pub predictor: Predictor,
    /// Days ahead served by /api/predictions
    pub fetch_days: i64,
    /// Maximum fixtures per response
    pub limit: usize,
}

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: String,
    pub version: String,
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct PredictionsResponse {
    pub success: bool,
    pub count: usize,
    pub predictions: Vec<PredictionSummary>,
    pub generated_at: DateTime<Utc>,
}

async fn root_handler() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Eros football predictions API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "running".to_string(),
        timestamp: Utc::now(),
    })
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
    })
}

/// GET /api/predictions - computed on request, nothing is persisted
async fn predictions_handler(State(state): State<Arc<AppState>>) -> Json<PredictionsResponse> {
    let predictions = state
        .predictor
        .preview_upcoming(state.fetch_days, state.limit)
        .await;
    info!("Serving {} predictions", predictions.len());

    Json(PredictionsResponse {
        success: true,
        count: predictions.len(),
        predictions,
        generated_at: Utc::now(),
    })
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/api/predictions", get(predictions_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
