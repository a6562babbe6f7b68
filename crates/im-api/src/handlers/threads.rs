//! Thread endpoint handlers

use axum::extract::{Path, Query, State};
use serde::Deserialize;
use uuid::Uuid;

use im_service::{
    EnsureThreadRequest, MessageHistoryResponse, PermissionResponse, ReadRequest, ReadResponse,
    ThreadResponse, ThreadService,
};

use crate::extractors::{AuthUser, Trace, ValidatedJson};
use crate::response::{envelope_ok, ApiError, ApiResult, TracedError};
use crate::state::AppState;

/// Parse a thread id path segment into a Uuid
fn parse_thread_id(raw: &str, trace_id: &str) -> Result<Uuid, TracedError> {
    raw.parse().map_err(|_| {
        ApiError::InvalidRequest(format!("invalid thread id: {raw}")).trace(trace_id.to_string())
    })
}

/// `GET /v1/threads/:id/permission`
///
/// 200 when the caller is a member, 403 otherwise.
pub async fn permission(
    State(state): State<AppState>,
    Trace(trace_id): Trace,
    user: AuthUser,
    Path(thread_id): Path<String>,
) -> ApiResult {
    let thread_id = parse_thread_id(&thread_id, &trace_id)?;
    let service = ThreadService::new(state.ctx().clone());
    service
        .check_permission(thread_id, &user.user_id)
        .await
        .map_err(|e| ApiError::from(e).trace(trace_id.clone()))?;

    Ok(envelope_ok(&trace_id, PermissionResponse { allowed: true }))
}

/// `POST /v1/threads/:id/read`
pub async fn mark_read(
    State(state): State<AppState>,
    Trace(trace_id): Trace,
    user: AuthUser,
    Path(thread_id): Path<String>,
    ValidatedJson(request): ValidatedJson<ReadRequest>,
) -> ApiResult {
    let thread_id = parse_thread_id(&thread_id, &trace_id)?;
    let service = ThreadService::new(state.ctx().clone());
    let last_read_seq = service
        .mark_read(thread_id, &user.user_id, request.last_read_seq)
        .await
        .map_err(|e| ApiError::from(e).trace(trace_id.clone()))?;

    Ok(envelope_ok(&trace_id, ReadResponse { last_read_seq }))
}

/// `POST /v1/threads/ensure`
pub async fn ensure(
    State(state): State<AppState>,
    Trace(trace_id): Trace,
    user: AuthUser,
    ValidatedJson(request): ValidatedJson<EnsureThreadRequest>,
) -> ApiResult {
    let service = ThreadService::new(state.ctx().clone());
    let thread = service
        .ensure(&user.user_id, request)
        .await
        .map_err(|e| ApiError::from(e).trace(trace_id.clone()))?;

    Ok(envelope_ok(&trace_id, ThreadResponse::from(thread)))
}

/// Query parameters for the history endpoint
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(rename = "afterSeq")]
    pub after_seq: Option<i64>,
    #[serde(rename = "beforeSeq")]
    pub before_seq: Option<i64>,
    #[serde(default = "default_history_limit")]
    pub limit: i64,
}

fn default_history_limit() -> i64 {
    50
}

/// `GET /v1/threads/:id/messages`
pub async fn history(
    State(state): State<AppState>,
    Trace(trace_id): Trace,
    user: AuthUser,
    Path(thread_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult {
    let thread_id = parse_thread_id(&thread_id, &trace_id)?;
    let service = ThreadService::new(state.ctx().clone());
    let page = service
        .history(
            thread_id,
            &user.user_id,
            query.after_seq,
            query.before_seq,
            query.limit,
        )
        .await
        .map_err(|e| ApiError::from(e).trace(trace_id.clone()))?;

    Ok(envelope_ok(&trace_id, MessageHistoryResponse::from(page)))
}
