//! Trace id extractor
//!
//! Reads the `x-trace-id` header the middleware stamped on the request, or
//! generates one when absent (direct calls bypassing the layer).

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use im_common::new_trace_id;

/// Header carrying the request trace id
pub const TRACE_HEADER: &str = "x-trace-id";

/// The request's trace id
#[derive(Debug, Clone)]
pub struct Trace(pub String);

impl Trace {
    /// Read the trace id out of request parts
    #[must_use]
    pub fn from_parts(parts: &Parts) -> String {
        parts
            .headers
            .get(TRACE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(new_trace_id)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Trace
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(Self::from_parts(parts)))
    }
}
