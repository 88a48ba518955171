//! Training metrics endpoint

use axum::{extract::State, Json};

use penguin_common::metrics::MetricsSnapshot;

use crate::error::ApiResult;
use crate::AppState;

/// GET /api/metrics
///
/// 404 until `penguin-web train` has written a report.
pub async fn get_metrics(State(state): State<AppState>) -> ApiResult<Json<MetricsSnapshot>> {
    let snapshot = MetricsSnapshot::load(&state.paths.metrics)?;
    Ok(Json(snapshot))
}
