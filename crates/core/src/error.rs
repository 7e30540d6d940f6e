//! Errors returned by [`FleetLedger`] operations.
//!
//! Every variant except [`LedgerError::Storage`] is a rejected request that
//! leaves the stored collections untouched.
//!
//! [`FleetLedger`]: crate::ledger::FleetLedger
use thiserror::Error;

/// Ledger failure taxonomy.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// A required input was empty.
    #[error("{0} is required")]
    Validation(&'static str),
    /// The primary key is already taken.
    #[error("{entity} ID '{id}' already exists")]
    Duplicate {
        /// Kind of record, `"Vehicle"` or `"Client"`.
        entity: &'static str,
        /// The id that collided.
        id: String,
    },
    /// A referenced id does not exist.
    #[error("{entity} '{id}' not found")]
    NotFound {
        /// Kind of record that was looked up.
        entity: &'static str,
        /// The id that was not found.
        id: String,
    },
    /// The vehicle is not in a bookable state.
    #[error("vehicle '{0}' is not available")]
    Conflict(String),
    /// Reading or writing the backing files failed.
    #[error("storage failure: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl LedgerError {
    /// Whether the error is a rejected request rather than an I/O failure.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, Self::Storage(_))
    }
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
