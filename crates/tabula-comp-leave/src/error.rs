//! Error types for the comp-leave ledger.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Errors produced by the ledger engines and stores.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Malformed request: bad hour amounts, bad dates, bad deltas.
    /// Rejected synchronously, before any mutation.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Requested comp-leave hours exceed the user's available balance.
    /// Nothing is mutated; the request is never partially granted.
    #[error("Insufficient comp-leave balance: requested {requested}h, available {available}h")]
    InsufficientBalance {
        requested: Decimal,
        available: Decimal,
    },

    /// No grant with this id exists.
    #[error("Grant not found: {0}")]
    GrantNotFound(Uuid),

    /// The employee directory has no salary on record for the user, so an
    /// expiring grant cannot be priced.
    #[error("No monthly base salary on record for user {0}")]
    SalaryUnavailable(Uuid),

    /// Caller is not allowed to touch these grants.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A concurrent update invalidated the planned mutation. Engines replan
    /// a bounded number of times before surfacing this.
    #[error("Concurrent update conflict: {0}")]
    Conflict(String),

    /// Unexpected failure inside the expiry batch; recorded in the execution
    /// ledger rather than thrown at an unattended scheduler.
    #[error("Job execution failed: {0}")]
    JobExecution(String),

    /// A stored row violated a ledger invariant (e.g. unparseable status).
    #[error("Internal error: {0}")]
    Internal(String),

    /// Underlying database failure.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl LedgerError {
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, LedgerError::Validation(_))
    }

    #[must_use]
    pub fn is_insufficient_balance(&self) -> bool {
        matches!(self, LedgerError::InsufficientBalance { .. })
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, LedgerError::GrantNotFound(_))
    }

    #[must_use]
    pub fn is_forbidden(&self) -> bool {
        matches!(self, LedgerError::Forbidden(_))
    }

    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, LedgerError::Conflict(_))
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LedgerError>;
