//! Health check endpoint
//!
//! Reports whether the data files the classifier depends on are in place,
//! so a fresh install shows up as `degraded` until `fetch` and `train` run.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok" when seed and model are present, otherwise "degraded"
    pub status: String,
    /// Module name ("penguin-web")
    pub module: String,
    /// Crate version from Cargo.toml
    pub version: String,
    /// Seed dataset exists under the root folder
    pub seed_present: bool,
    /// Trained model artifact exists under the root folder
    pub model_trained: bool,
}

/// GET /health
///
/// Health check endpoint for monitoring. Checks file presence only; the
/// artifact is not parsed here.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let seed_present = state.paths.seed.exists();
    let model_trained = state.paths.model.exists();
    let status = if seed_present && model_trained {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: status.to_string(),
        module: "penguin-web".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        seed_present,
        model_trained,
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
