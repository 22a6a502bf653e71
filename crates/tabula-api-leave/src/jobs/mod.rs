//! Background jobs.

mod comp_leave_expiry_job;

pub use comp_leave_expiry_job::{CompLeaveExpiryJob, DEFAULT_POLL_INTERVAL_SECS};
