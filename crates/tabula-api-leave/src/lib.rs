//! Comp-leave HTTP API.
//!
//! Exposes the ledger over axum: grant ingestion and listing, balance reads,
//! the manual batch trigger, and the execution-ledger audit trail. Postgres
//! implementations of the ledger's storage seams live in [`services`]; the
//! scheduled expiry job wrapper in [`jobs`].

pub mod error;
pub mod handlers;
pub mod jobs;
pub mod models;
pub mod router;
pub mod services;

pub use error::{ApiLeaveError, ApiResult, ErrorResponse};
pub use jobs::{CompLeaveExpiryJob, DEFAULT_POLL_INTERVAL_SECS};
pub use router::{leave_router, LeaveState};
pub use services::{PgExecutionLogStore, PgGrantStore, PgPayRecordStore, PgSalaryDirectory};
