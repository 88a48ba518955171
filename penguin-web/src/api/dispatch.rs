//! Event dispatch endpoint
//!
//! Every UI event posts here. Events are serialised through the shared
//! dispatch lock so each one runs to completion before the next starts,
//! and the handler itself runs on the blocking pool since it does file
//! I/O and model scoring.

use axum::{extract::State, Json};
use serde::Deserialize;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::handler::{HandlerInput, HandlerOutput, Trigger};
use crate::AppState;

/// Request body: the trigger plus current UI state
#[derive(Debug, Deserialize)]
pub struct DispatchRequest {
    pub trigger: Trigger,
    #[serde(flatten)]
    pub input: HandlerInput,
}

/// POST /api/dispatch
///
/// Response keys that are absent mean "leave that output as it is".
pub async fn dispatch(
    State(state): State<AppState>,
    Json(request): Json<DispatchRequest>,
) -> ApiResult<Json<HandlerOutput>> {
    let _guard = state.dispatch_lock.lock().await;
    debug!(trigger = ?request.trigger, "Dispatching UI event");

    let handler = state.handler.clone();
    let output = tokio::task::spawn_blocking(move || {
        handler.dispatch(request.trigger, &request.input)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Dispatch task failed: {}", e)))?;

    Ok(Json(output))
}
