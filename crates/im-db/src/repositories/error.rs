//! Database error mapping helpers

use im_core::DomainError;

/// PostgreSQL unique-violation SQLSTATE
const UNIQUE_VIOLATION: &str = "23505";

/// Map a SQLx error to a domain error
pub(crate) fn map_db_error(err: sqlx::Error) -> DomainError {
    DomainError::Database(err.to_string())
}

/// Check whether the error is a unique-constraint violation
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == UNIQUE_VIOLATION)
}
