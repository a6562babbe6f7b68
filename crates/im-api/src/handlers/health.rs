//! Health check handler

use axum::extract::State;
use serde_json::json;

use crate::extractors::Trace;
use crate::response::{envelope_ok, ApiResult};
use crate::state::AppState;

/// `GET /health`
pub async fn health_check(State(_state): State<AppState>, Trace(trace_id): Trace) -> ApiResult {
    Ok(envelope_ok(&trace_id, json!({ "ok": true })))
}
