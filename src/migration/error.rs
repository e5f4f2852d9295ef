//! Migration-specific error types

use crate::executor::DbError;
use crate::transaction::TransactionError;

/// Migration-specific errors
#[derive(Debug)]
pub enum MigrationError {
    /// Database execution error
    Database(DbError),
    /// An applied migration no longer produces the SQL it was applied with
    ChecksumMismatch {
        version: i64,
        name: String,
        stored: String,
        current: String,
    },
    /// Migration lock timeout
    LockTimeout(String),
    /// Migration failed during execution
    ExecutionFailed {
        version: i64,
        name: String,
        error: String,
    },
    /// Two migrations share a version, or a version is not positive
    InvalidVersion(i64),
    /// The database records a migration this binary does not know about
    UnknownApplied { version: i64, name: String },
}

impl std::fmt::Display for MigrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MigrationError::Database(e) => write!(f, "Database error: {e}"),
            MigrationError::ChecksumMismatch {
                version,
                name,
                stored,
                current,
            } => {
                write!(
                    f,
                    "Migration '{name}' (version {version}) has been modified after being applied.\n\
                     Stored checksum: {stored}\n\
                     Current checksum: {current}"
                )
            }
            MigrationError::LockTimeout(msg) => write!(f, "Migration lock timeout: {msg}"),
            MigrationError::ExecutionFailed {
                version,
                name,
                error,
            } => {
                write!(
                    f,
                    "Migration '{name}' (version {version}) failed during execution: {error}"
                )
            }
            MigrationError::InvalidVersion(version) => {
                write!(f, "Invalid or duplicate migration version: {version}")
            }
            MigrationError::UnknownApplied { version, name } => {
                write!(
                    f,
                    "Database has migration '{name}' (version {version}) applied, \
                     but this build does not contain it"
                )
            }
        }
    }
}

impl std::error::Error for MigrationError {}

impl From<DbError> for MigrationError {
    fn from(error: DbError) -> Self {
        MigrationError::Database(error)
    }
}

impl From<TransactionError> for MigrationError {
    fn from(error: TransactionError) -> Self {
        MigrationError::Database(error.into())
    }
}
