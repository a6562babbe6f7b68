//! Application error types
//!
//! Unified error handling across the API, gateway, and worker.

use im_core::DomainError;

/// Application-wide error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Authentication errors
    #[error("Missing bearer token")]
    AuthRequired,

    #[error("Invalid token")]
    AuthInvalid,

    // Authorization errors
    #[error("Not a member of this thread")]
    Forbidden,

    // Validation errors
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid image content: {0}")]
    InvalidImageContent(String),

    // State conflicts
    #[error("Thread is not active")]
    ThreadInactive,

    // Rate limiting
    #[error("Rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    // Resource errors
    #[error("Resource not found: {0}")]
    NotFound(String),

    // Infrastructure errors
    #[error("Database error: {0}")]
    Database(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("Internal server error")]
    Internal(#[source] anyhow::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    // Domain errors
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl AppError {
    /// Get HTTP status code for this error
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidRequest(_) | Self::InvalidImageContent(_) => 400,
            Self::AuthRequired | Self::AuthInvalid => 401,
            Self::Forbidden => 403,
            Self::NotFound(_) => 404,
            Self::ThreadInactive => 409,
            Self::RateLimited { .. } => 429,
            Self::Database(_)
            | Self::Cache(_)
            | Self::Upstream(_)
            | Self::Internal(_)
            | Self::Config(_) => 500,
            Self::Domain(e) => {
                if e.is_forbidden() {
                    403
                } else if e.is_validation() {
                    400
                } else if e.is_conflict() {
                    409
                } else if e.is_not_found() {
                    404
                } else {
                    500
                }
            }
        }
    }

    /// Get error code for API responses
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AuthRequired => "AUTH_REQUIRED",
            Self::AuthInvalid => "AUTH_INVALID",
            Self::Forbidden => "FORBIDDEN",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::InvalidImageContent(_) => "INVALID_IMAGE_CONTENT",
            Self::ThreadInactive => "THREAD_INACTIVE",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Database(_) | Self::Internal(_) => "SERVER_ERROR",
            Self::Cache(_) => "CACHE_ERROR",
            Self::Upstream(_) => "UPSTREAM_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Domain(e) => e.code(),
        }
    }

    /// Retry-after hint for rate-limited requests
    #[must_use]
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after_ms } => Some(*retry_after_ms),
            _ => None,
        }
    }

    /// Check if this is a client error (4xx)
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    /// Create an internal error from any error
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::AuthRequired.status_code(), 401);
        assert_eq!(AppError::Forbidden.status_code(), 403);
        assert_eq!(AppError::ThreadInactive.status_code(), 409);
        assert_eq!(
            AppError::RateLimited {
                retry_after_ms: 250
            }
            .status_code(),
            429
        );
        assert_eq!(AppError::Database("boom".to_string()).status_code(), 500);
    }

    #[test]
    fn test_domain_error_mapping() {
        let err = AppError::from(DomainError::NotAMember);
        assert_eq!(err.status_code(), 403);
        assert_eq!(err.error_code(), "FORBIDDEN");

        let err = AppError::from(DomainError::ThreadInactive);
        assert_eq!(err.status_code(), 409);
        assert_eq!(err.error_code(), "THREAD_INACTIVE");
    }

    #[test]
    fn test_retry_after_hint() {
        let err = AppError::RateLimited {
            retry_after_ms: 420,
        };
        assert_eq!(err.retry_after_ms(), Some(420));
        assert_eq!(err.error_code(), "RATE_LIMITED");
        assert!(AppError::Forbidden.retry_after_ms().is_none());
    }

    #[test]
    fn test_is_client_error() {
        assert!(AppError::AuthInvalid.is_client_error());
        assert!(!AppError::Cache("down".to_string()).is_client_error());
    }
}
