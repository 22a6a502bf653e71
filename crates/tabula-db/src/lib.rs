//! Postgres persistence for the tabula ops platform.
//!
//! Row models, a pooled connection helper, and embedded migrations for the
//! comp-leave ledger schema: employees (salary projection), comp-hour
//! grants, overtime pay records, and the job execution audit trail.

pub mod error;
pub mod migrations;
pub mod models;
pub mod pool;

pub use error::DbError;
pub use migrations::run_migrations;
pub use models::{
    CompGrantRow, CreateCompGrant, CreateEmployee, CreateJobExecution, Employee,
    JobExecutionFilter, JobExecutionRow, OvertimePayRecordRow,
};
pub use pool::DbPool;
