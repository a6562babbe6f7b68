//! Response envelope and error handling for API endpoints
//!
//! Every response is wrapped in `{success, data?, code?, message?, traceId}`
//! so the gateway and mobile clients parse one shape.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use im_common::AppError;
use im_service::ServiceError;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// API error type for consistent error responses
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Service(#[from] ServiceError),

    #[error("{0}")]
    App(#[from] AppError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// Get HTTP status code for this error
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        let code = match self {
            Self::Service(e) => e.status_code(),
            Self::App(e) => e.status_code(),
            Self::InvalidRequest(_) => 400,
        };
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Get the stable error code for API responses
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Service(e) => e.error_code(),
            Self::App(e) => e.error_code(),
            Self::InvalidRequest(_) => "INVALID_REQUEST",
        }
    }

    /// Retry-after hint when rate limited
    #[must_use]
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            Self::Service(e) => e.retry_after_ms(),
            Self::App(e) => e.retry_after_ms(),
            Self::InvalidRequest(_) => None,
        }
    }

    /// Attach the request's trace id for the response envelope
    pub fn trace(self, trace_id: impl Into<String>) -> TracedError {
        TracedError {
            error: self,
            trace_id: trace_id.into(),
        }
    }
}

/// An [`ApiError`] bound to its request trace id
#[derive(Debug)]
pub struct TracedError {
    error: ApiError,
    trace_id: String,
}

impl IntoResponse for TracedError {
    fn into_response(self) -> Response {
        let status = self.error.status_code();
        if status.is_server_error() {
            error!(trace_id = %self.trace_id, error = ?self.error, "Server error");
        }

        let mut body = json!({
            "success": false,
            "code": self.error.error_code(),
            "message": self.error.to_string(),
            "traceId": self.trace_id,
        });
        if let Some(retry_after_ms) = self.error.retry_after_ms() {
            body["retry_after_ms"] = json!(retry_after_ms);
        }

        (status, Json(body)).into_response()
    }
}

/// Build a success envelope around a payload
pub fn envelope_ok<T: Serialize>(trace_id: &str, data: T) -> Response {
    Json(json!({
        "success": true,
        "data": data,
        "traceId": trace_id,
    }))
    .into_response()
}

/// Type alias for handler results
pub type ApiResult = Result<Response, TracedError>;

#[cfg(test)]
mod tests {
    use super::*;
    use im_core::DomainError;

    #[test]
    fn test_api_error_status_codes() {
        let err = ApiError::from(ServiceError::from(DomainError::NotAMember));
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);

        let err = ApiError::from(ServiceError::RateLimited {
            retry_after_ms: 100,
        });
        assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(err.retry_after_ms(), Some(100));

        let err = ApiError::from(AppError::AuthRequired);
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_api_error_codes() {
        assert_eq!(
            ApiError::InvalidRequest("x".to_string()).error_code(),
            "INVALID_REQUEST"
        );
        assert_eq!(
            ApiError::from(AppError::AuthInvalid).error_code(),
            "AUTH_INVALID"
        );
    }
}
