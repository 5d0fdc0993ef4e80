//! Error type shared by every store operation.
//!
//! The presentation layer only needs two things from a failure: which kind it
//! was (so it can pick a tone for the status line) and a message it can show
//! verbatim. SQLite failures keep the step that failed plus the underlying
//! `rusqlite::Error` as their source.

use rusqlite::{Error as SqlError, ErrorCode};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// A required field is missing or an enumerated value is not recognized.
    #[error("{0}")]
    Validation(String),

    /// A referenced row does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The write would break an invariant the store enforces.
    #[error("{0}")]
    Integrity(String),

    #[error("{context}: {source}")]
    Database {
        context: &'static str,
        #[source]
        source: SqlError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification used at the UI boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Integrity,
    Storage,
}

impl StoreError {
    pub fn validation<S: Into<String>>(message: S) -> Self {
        StoreError::Validation(message.into())
    }

    pub fn not_found<S: Into<String>>(message: S) -> Self {
        StoreError::NotFound(message.into())
    }

    pub fn integrity<S: Into<String>>(message: S) -> Self {
        StoreError::Integrity(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Validation(_) => ErrorKind::Validation,
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::Integrity(_) => ErrorKind::Integrity,
            StoreError::Database { .. } | StoreError::Io(_) => ErrorKind::Storage,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Attach a short "failed to ..." description to raw SQLite results, the same
/// way the binary layer uses `anyhow::Context`.
pub(crate) trait SqlContext<T> {
    fn sql_context(self, context: &'static str) -> Result<T>;
}

impl<T> SqlContext<T> for std::result::Result<T, SqlError> {
    fn sql_context(self, context: &'static str) -> Result<T> {
        self.map_err(|source| StoreError::Database { context, source })
    }
}

/// Turn constraint violations into an `Integrity` error carrying a readable
/// message. Anything else stays a database error.
pub(crate) fn map_constraint(err: SqlError, context: &'static str, message: String) -> StoreError {
    if matches!(err.sqlite_error_code(), Some(ErrorCode::ConstraintViolation)) {
        StoreError::Integrity(message)
    } else {
        StoreError::Database {
            context,
            source: err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_variants() {
        assert_eq!(
            StoreError::validation("x").kind(),
            ErrorKind::Validation
        );
        assert_eq!(StoreError::not_found("x").kind(), ErrorKind::NotFound);
        assert_eq!(StoreError::integrity("x").kind(), ErrorKind::Integrity);
        let db = Err::<(), _>(SqlError::QueryReturnedNoRows)
            .sql_context("failed to load row")
            .unwrap_err();
        assert_eq!(db.kind(), ErrorKind::Storage);
        assert!(db.to_string().starts_with("failed to load row"));
    }

    #[test]
    fn messages_are_shown_verbatim() {
        let err = StoreError::validation("Please choose a key to bind to this action.");
        assert_eq!(err.to_string(), "Please choose a key to bind to this action.");
    }
}
