//! Compensatory-leave ledger domain logic.
//!
//! This crate tracks time-off-in-lieu earned from overtime: discrete hour
//! grants with an origin date, an expiry date, and the overtime multiplier in
//! effect when the hours were earned. Hours are spent in strict oldest-first
//! order, returned when a leave record is cancelled, and monetized into
//! overtime pay records when they lapse unused.
//!
//! # Engines
//!
//! The [`services`] module provides the four engines:
//! - [`services::ConsumptionEngine`] - FIFO debit when comp leave is taken
//! - [`services::ReversalEngine`] - credit-back when a leave record is cancelled
//! - [`services::ExpiryConverter`] - the scheduled expiry-to-pay batch
//! - [`services::BalanceProjector`] - read-only balance aggregation
//!
//! # Stores
//!
//! Every persistence seam is a trait with an in-memory implementation for
//! tests; Postgres-backed implementations live in the API layer:
//! - [`grants::GrantStore`] - the single source of truth for grant state
//! - [`pay_records::PayRecordStore`] - append-only overtime pay records
//! - [`executions::ExecutionLogStore`] - append-only batch run audit trail
//! - [`salary::SalaryDirectory`] / [`salary::BalanceCache`] - external
//!   collaborator seams (employee directory, read cache)
//!
//! Time is always read through the injected [`clock::Clock`], never from the
//! wall clock inside business logic.

pub mod clock;
pub mod error;
pub mod executions;
pub mod grants;
pub mod pay_records;
pub mod salary;
pub mod services;
pub mod types;

// Re-export commonly used types
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{LedgerError, Result};
pub use executions::{
    ExecutionFilter, ExecutionLedgerEntry, ExecutionLogStore, ExecutionStatus,
    InMemoryExecutionLogStore, NewExecutionEntry,
};
pub use grants::{
    CompGrant, ExpireOutcome, GrantDelta, GrantStore, InMemoryGrantStore, NewCompGrant,
};
pub use pay_records::{InMemoryPayRecordStore, OvertimePayRecord, PayAccumulation, PayRecordStore};
pub use salary::{
    BalanceCache, InMemorySalaryDirectory, NoopBalanceCache, RecordingBalanceCache, SalaryDirectory,
};
pub use services::{
    BalanceProjector, ConsumptionEngine, ExpiryConverter, ExpiryRunSummary, GrantFailure,
    ReversalEngine, ReversalReceipt, SkipReason, SkippedCredit, COMP_LEAVE_EXPIRY_JOB,
};
pub use types::{is_half_hour_multiple, GrantAllocation, GrantStatus, PayrollMonth};
