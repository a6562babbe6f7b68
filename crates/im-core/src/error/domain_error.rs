//! Domain errors - error types for the domain layer

use thiserror::Error;
use uuid::Uuid;

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Thread not found: {0}")]
    ThreadNotFound(Uuid),

    #[error("Not a member of this thread")]
    NotAMember,

    #[error("Thread is not active")]
    ThreadInactive,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid image content: {0}")]
    InvalidImageContent(String),

    #[error("Sequence allocation failed")]
    SeqAllocationFailed,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    /// Get an error code string for API responses
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::ThreadNotFound(_) => "NOT_FOUND",
            Self::NotAMember => "FORBIDDEN",
            Self::ThreadInactive => "THREAD_INACTIVE",
            Self::Validation(_) => "INVALID_REQUEST",
            Self::InvalidImageContent(_) => "INVALID_IMAGE_CONTENT",
            Self::SeqAllocationFailed | Self::Database(_) | Self::Internal(_) => "SERVER_ERROR",
        }
    }

    /// Check if this is an authorization error
    #[must_use]
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::NotAMember)
    }

    /// Check if this is a validation error
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::InvalidImageContent(_))
    }

    /// Check if this is a conflict with the current thread state
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::ThreadInactive)
    }

    /// Check if this is a "not found" error
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ThreadNotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(DomainError::NotAMember.code(), "FORBIDDEN");
        assert_eq!(DomainError::ThreadInactive.code(), "THREAD_INACTIVE");
        assert_eq!(
            DomainError::InvalidImageContent("mime".to_string()).code(),
            "INVALID_IMAGE_CONTENT"
        );
        assert_eq!(DomainError::SeqAllocationFailed.code(), "SERVER_ERROR");
    }

    #[test]
    fn test_error_predicates() {
        assert!(DomainError::NotAMember.is_forbidden());
        assert!(DomainError::ThreadInactive.is_conflict());
        assert!(DomainError::Validation("x".to_string()).is_validation());
        assert!(!DomainError::Database("x".to_string()).is_validation());
    }
}
