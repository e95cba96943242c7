//! The module contains the errors the ledger can return.
//!
//! The errors are:
//!
//! - [`NotFound`] returned when a safe, bank or transaction does not exist.
//! - [`InvalidArgument`] returned for rejected input (amounts, kinds, tank
//!   capacities, windows).
//! - [`ConcurrencyConflict`] returned when a safe is contended; the caller may
//!   retry.
//! - [`Storage`] wraps the underlying database failure.
//!
//!  [`NotFound`]: EngineError::NotFound
//!  [`InvalidArgument`]: EngineError::InvalidArgument
//!  [`ConcurrencyConflict`]: EngineError::ConcurrencyConflict
//!  [`Storage`]: EngineError::Storage
use sea_orm::{ConnAcquireErr, DbErr};
use thiserror::Error;

/// Ledger errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("\"{0}\" not found!")]
    NotFound(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Concurrency conflict: {0}")]
    ConcurrencyConflict(String),
    #[error(transparent)]
    Storage(DbErr),
}

impl EngineError {
    /// Returns `true` when retrying the same operation may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict(_))
    }
}

impl From<DbErr> for EngineError {
    fn from(err: DbErr) -> Self {
        let message = err.to_string();
        let pool_exhausted = matches!(err, DbErr::ConnectionAcquire(ConnAcquireErr::Timeout));
        if pool_exhausted || is_lock_contention(&message) {
            Self::ConcurrencyConflict(message)
        } else {
            Self::Storage(err)
        }
    }
}

// SQLite reports writer contention as SQLITE_BUSY / SQLITE_LOCKED.
fn is_lock_contention(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("database is locked")
        || lower.contains("database table is locked")
        || lower.contains("sqlite_busy")
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::InvalidArgument(a), Self::InvalidArgument(b)) => a == b,
            (Self::ConcurrencyConflict(a), Self::ConcurrencyConflict(b)) => a == b,
            (Self::Storage(a), Self::Storage(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
