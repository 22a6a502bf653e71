//! Database row models.

pub mod comp_grant;
pub mod employee;
pub mod job_execution;
pub mod overtime_pay_record;

pub use comp_grant::{CompGrantRow, CreateCompGrant, GRANT_STATUSES_ALLOCATABLE};
pub use employee::{CreateEmployee, Employee};
pub use job_execution::{CreateJobExecution, JobExecutionFilter, JobExecutionRow};
pub use overtime_pay_record::OvertimePayRecordRow;
