//! Error handling utilities for repositories

use chat_core::error::DomainError;
use sqlx::Error as SqlxError;

/// Convert SQLx error to DomainError
pub fn map_db_error(e: SqlxError) -> DomainError {
    DomainError::DatabaseError(e.to_string())
}

/// Map constraint violations raised by an INSERT.
///
/// `on_unique` handles a unique violation and `on_missing_parent` a foreign
/// key violation; anything else becomes a database error.
pub fn map_insert_error<U, F>(e: SqlxError, on_unique: U, on_missing_parent: F) -> DomainError
where
    U: FnOnce() -> DomainError,
    F: FnOnce() -> DomainError,
{
    match e.as_database_error() {
        Some(db_err) if db_err.is_unique_violation() => on_unique(),
        Some(db_err) if db_err.is_foreign_key_violation() => on_missing_parent(),
        _ => map_db_error(e),
    }
}
