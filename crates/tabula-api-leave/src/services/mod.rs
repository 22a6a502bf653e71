//! Postgres-backed implementations of the ledger's storage seams.

mod pg_execution_log_store;
mod pg_grant_store;
mod pg_pay_record_store;
mod pg_salary_directory;

pub use pg_execution_log_store::PgExecutionLogStore;
pub use pg_grant_store::PgGrantStore;
pub use pg_pay_record_store::PgPayRecordStore;
pub use pg_salary_directory::PgSalaryDirectory;
