//! Bearer token authentication extractor

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use im_common::{extract_bearer, AppError};

use crate::response::{ApiError, TracedError};
use crate::state::AppState;

use super::trace::Trace;

/// The authenticated user, extracted from the `Authorization` header
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    /// Raw bearer token, forwarded to collaborators acting on the user's
    /// behalf
    pub token: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = TracedError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let trace_id = Trace::from_parts(parts);

        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::from(AppError::AuthRequired).trace(trace_id.clone()))?;

        let token = extract_bearer(header);
        if token.is_empty() {
            return Err(ApiError::from(AppError::AuthRequired).trace(trace_id));
        }

        let user_id = state
            .ctx()
            .jwt_service()
            .verify_subject(token)
            .map_err(|e| ApiError::from(e).trace(trace_id))?;

        Ok(Self {
            user_id,
            token: token.to_string(),
        })
    }
}
