//! Ledger engines.
//!
//! Each engine is constructed over the store traits so the same logic runs
//! against the in-memory stores in tests and the Postgres-backed stores in
//! the API layer.

pub mod balance;
pub mod consumption;
pub mod expiry;
pub mod reversal;

pub use balance::BalanceProjector;
pub use consumption::{plan_consumption, ConsumptionEngine};
pub use expiry::{ExpiryConverter, ExpiryRunSummary, GrantFailure, COMP_LEAVE_EXPIRY_JOB};
pub use reversal::{ReversalEngine, ReversalReceipt, SkipReason, SkippedCredit};

use rust_decimal::Decimal;

use crate::error::{LedgerError, Result};
use crate::types::is_half_hour_multiple;

/// Leave-hour requests must be positive and sit on the half-hour grid.
pub(crate) fn ensure_valid_request_hours(hours: Decimal) -> Result<()> {
    if hours <= Decimal::ZERO {
        return Err(LedgerError::Validation(
            "Requested hours must be positive".into(),
        ));
    }
    if !is_half_hour_multiple(hours) {
        return Err(LedgerError::Validation(
            "Requested hours must be a multiple of 0.5".into(),
        ));
    }
    Ok(())
}

/// Engines replan this many times when an optimistic apply conflicts with a
/// concurrent update before giving up.
pub(crate) const MAX_CONFLICT_RETRIES: usize = 3;
