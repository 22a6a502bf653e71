//! Request and response DTOs for the comp-leave API.

mod cron;
mod grant;

pub use cron::{
    ExecuteJobRequest, ExecutionEntryResponse, ExpiryRunResponse, HistoryQuery, HistoryResponse,
};
pub use grant::{BalanceResponse, CreateGrantRequest, GrantListQuery, GrantListResponse, GrantResponse};
