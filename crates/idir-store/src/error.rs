//! Error types for store operations.

use rusqlite::ErrorCode;
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error not covered by a more specific variant.
    #[error("sqlite error: {0}")]
    Sqlite(rusqlite::Error),
    /// No pooled connection became available within the acquisition timeout.
    #[error("timed out after {waited_ms} ms waiting for a database connection")]
    PoolTimeout {
        /// Configured wait.
        waited_ms: u64,
    },
    /// The database stayed locked beyond its busy timeout.
    #[error("database is busy: {0}")]
    Busy(String),
    /// The pool could not be created.
    #[error("failed to initialize connection pool: {0}")]
    Pool(String),
    /// Schema migration failed.
    #[error("migration failed: {0}")]
    Migration(String),
    /// A uniqueness constraint rejected an insert.
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
    /// A stored value could not be decoded.
    #[error("corrupt value in column {column}: {reason}")]
    Corrupt {
        /// Column that held the value.
        column: &'static str,
        /// Decoder message.
        reason: String,
    },
    /// A value could not be encoded for storage.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Returns true for errors caused by contention rather than data.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::PoolTimeout { .. } | StoreError::Busy(_))
    }

    pub(crate) fn corrupt(column: &'static str, reason: impl ToString) -> Self {
        StoreError::Corrupt {
            column,
            reason: reason.to_string(),
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(failure, message) = &err {
            let detail = message.clone().unwrap_or_else(|| failure.to_string());
            match failure.code {
                ErrorCode::ConstraintViolation
                    if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                        || failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
                {
                    return StoreError::UniqueViolation(detail);
                }
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => {
                    return StoreError::Busy(detail);
                }
                _ => {}
            }
        }
        StoreError::Sqlite(err)
    }
}
