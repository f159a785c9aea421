//! Store error kinds

use hlrcore_common::ValidationError;
use rusqlite::{ffi, ErrorCode};
use thiserror::Error;

/// Errors returned by the subscriber and authentication stores.
///
/// Zero rows affected is `NotFound`; more than one row affected where one
/// is expected is `StorageConsistency`.
#[derive(Debug, Error)]
pub enum DbError {
    /// Malformed IMSI, MSISDN, key material or algorithm. Raised before
    /// any statement runs.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The targeted subscriber or credential row does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A uniqueness constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A statement affected an unexpected number of rows.
    #[error("storage consistency error: {0}")]
    StorageConsistency(String),

    /// The engine failed to prepare or execute a statement.
    #[error("storage I/O error: {context}: {source}")]
    StorageIo {
        context: String,
        #[source]
        source: rusqlite::Error,
    },
}

/// Result type for store operations
pub type DbResult<T> = Result<T, DbError>;

impl DbError {
    /// Classifies an engine error, separating constraint violations from
    /// plain execution failures. A trigger's `RAISE` is an execution failure.
    pub(crate) fn from_sql(context: impl Into<String>, source: rusqlite::Error) -> Self {
        let context = context.into();
        match &source {
            rusqlite::Error::SqliteFailure(e, msg)
                if e.code == ErrorCode::ConstraintViolation
                    && e.extended_code != ffi::SQLITE_CONSTRAINT_TRIGGER =>
            {
                DbError::Conflict(format!(
                    "{context}: {}",
                    msg.as_deref().unwrap_or("constraint violation")
                ))
            }
            _ => DbError::StorageIo { context, source },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound(_))
    }
}

impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        DbError::InvalidInput(err.to_string())
    }
}

/// Applies the single-row rule to a statement's changed-row count.
///
/// `what` describes the target and is only built on failure.
pub(crate) fn expect_one_row(changed: usize, what: impl FnOnce() -> String) -> DbResult<()> {
    match changed {
        1 => Ok(()),
        0 => Err(DbError::NotFound(what())),
        n => {
            let what = what();
            tracing::error!("{}: SQL modified {} rows (expected 1)", what, n);
            Err(DbError::StorageConsistency(format!(
                "{what}: SQL modified {n} rows (expected 1)"
            )))
        }
    }
}
