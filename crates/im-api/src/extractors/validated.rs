//! JSON body extractor with validation
//!
//! Wraps `axum::Json` so both deserialization failures and `validator`
//! violations come back in the standard error envelope.

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use im_common::new_trace_id;
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::response::{ApiError, TracedError};
use crate::state::AppState;

use super::trace::TRACE_HEADER;

/// A JSON body that deserialized and validated cleanly
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T> FromRequest<AppState> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
{
    type Rejection = TracedError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let trace_id = req
            .headers()
            .get(TRACE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(new_trace_id);

        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::InvalidRequest(e.body_text()).trace(trace_id.clone()))?;

        value
            .validate()
            .map_err(|e| ApiError::InvalidRequest(e.to_string()).trace(trace_id))?;

        Ok(Self(value))
    }
}
