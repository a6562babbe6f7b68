//! Service layer error types

use im_common::AppError;
use im_core::DomainError;
use thiserror::Error;

/// Service layer error type
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Domain rule violation (membership, thread state, content shape)
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Application error (auth, config)
    #[error(transparent)]
    App(#[from] AppError),

    /// Admission denied by the sliding-window limiter
    #[error("Rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Bad request payload
    #[error("Validation error: {0}")]
    Validation(String),

    /// Redis failure
    #[error("Cache error: {0}")]
    Cache(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
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
            Self::App(e) => e.status_code(),
            Self::RateLimited { .. } => 429,
            Self::Validation(_) => 400,
            Self::Cache(_) | Self::Internal(_) => 500,
        }
    }

    /// Get the stable error code for API responses
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Domain(e) => e.code(),
            Self::App(e) => e.error_code(),
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::Validation(_) => "INVALID_REQUEST",
            Self::Cache(_) => "CACHE_ERROR",
            Self::Internal(_) => "SERVER_ERROR",
        }
    }

    /// Retry-after hint when rate limited
    #[must_use]
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after_ms } => Some(*retry_after_ms),
            Self::App(e) => e.retry_after_ms(),
            _ => None,
        }
    }
}

impl From<im_cache::RedisPoolError> for ServiceError {
    fn from(err: im_cache::RedisPoolError) -> Self {
        Self::Cache(err.to_string())
    }
}

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ServiceError::from(DomainError::NotAMember).status_code(),
            403
        );
        assert_eq!(
            ServiceError::from(DomainError::ThreadInactive).status_code(),
            409
        );
        assert_eq!(
            ServiceError::RateLimited {
                retry_after_ms: 100
            }
            .status_code(),
            429
        );
        assert_eq!(ServiceError::validation("x").status_code(), 400);
        assert_eq!(ServiceError::Cache("down".into()).status_code(), 500);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            ServiceError::from(DomainError::NotAMember).error_code(),
            "FORBIDDEN"
        );
        assert_eq!(
            ServiceError::RateLimited { retry_after_ms: 0 }.error_code(),
            "RATE_LIMITED"
        );
        assert_eq!(ServiceError::validation("x").error_code(), "INVALID_REQUEST");
    }

    #[test]
    fn test_retry_after() {
        let err = ServiceError::RateLimited {
            retry_after_ms: 777,
        };
        assert_eq!(err.retry_after_ms(), Some(777));
        assert_eq!(ServiceError::validation("x").retry_after_ms(), None);
    }
}
