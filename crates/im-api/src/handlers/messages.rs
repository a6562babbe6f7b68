//! Message endpoint handlers

use axum::extract::State;
use im_service::{CreateMessageRequest, MessageCreatedResponse, MessageService};

use crate::extractors::{AuthUser, Trace, ValidatedJson};
use crate::response::{envelope_ok, ApiError, ApiResult};
use crate::state::AppState;

/// `POST /v1/messages`
///
/// Idempotent message write: replays of a known `client_msg_id` return the
/// original receipt with a 200.
pub async fn create_message(
    State(state): State<AppState>,
    Trace(trace_id): Trace,
    user: AuthUser,
    ValidatedJson(request): ValidatedJson<CreateMessageRequest>,
) -> ApiResult {
    let service = MessageService::new(state.ctx().clone());
    let outcome = service
        .create(&user.user_id, request)
        .await
        .map_err(|e| ApiError::from(e).trace(trace_id.clone()))?;

    Ok(envelope_ok(
        &trace_id,
        MessageCreatedResponse::from(outcome.receipt),
    ))
}
