//! DTOs for the manual batch trigger and the execution-ledger audit trail.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tabula_comp_leave::executions::ExecutionLedgerEntry;
use tabula_comp_leave::services::ExpiryRunSummary;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

pub(crate) const DEFAULT_PAGE_SIZE: i64 = 20;
pub(crate) const MAX_PAGE_SIZE: i64 = 100;

/// Body for `POST /cron/execute`.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ExecuteJobRequest {
    /// Name of the job to run; only `comp_leave_expiry` is known.
    #[validate(length(min = 1))]
    pub job_name: String,
    /// Payroll month to backfill (`YYYY-MM`); defaults to the month before
    /// today.
    pub target_month: Option<String>,
}

/// Summary of one expiry conversion run.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExpiryRunResponse {
    /// Payroll month the run targeted (`YYYY-MM`).
    pub month: String,
    /// Last day of the month; the expiry cutoff.
    pub cutoff: NaiveDate,
    pub grants_converted: usize,
    pub grants_skipped: usize,
    pub pay_records_written: usize,
    pub total_hours_expired: Decimal,
    pub total_amount_cents: i64,
    pub converted_grant_ids: Vec<Uuid>,
}

impl From<ExpiryRunSummary> for ExpiryRunResponse {
    fn from(summary: ExpiryRunSummary) -> Self {
        Self {
            month: summary.month.to_string(),
            cutoff: summary.cutoff,
            grants_converted: summary.grants_converted,
            grants_skipped: summary.grants_skipped,
            pay_records_written: summary.pay_records_written,
            total_hours_expired: summary.total_hours_expired,
            total_amount_cents: summary.total_amount_cents,
            converted_grant_ids: summary.converted_grant_ids,
        }
    }
}

/// Query for `GET /cron/history`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct HistoryQuery {
    /// Restrict to one job's runs.
    pub job_name: Option<String>,
    /// 1-based page number.
    #[serde(default = "default_page")]
    pub page: i64,
    /// Page size, capped at 100.
    #[serde(default = "default_per_page", alias = "perPage")]
    pub per_page: i64,
}

fn default_page() -> i64 {
    1
}

fn default_per_page() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl HistoryQuery {
    /// Effective (limit, offset) after clamping.
    pub fn page_bounds(&self) -> (i64, i64) {
        let per_page = self.per_page.clamp(1, MAX_PAGE_SIZE);
        let page = self.page.max(1);
        (per_page, (page - 1) * per_page)
    }
}

/// One execution-ledger entry on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExecutionEntryResponse {
    pub id: Uuid,
    pub job_name: String,
    pub status: String,
    pub executed_at: DateTime<Utc>,
    pub details: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl From<ExecutionLedgerEntry> for ExecutionEntryResponse {
    fn from(entry: ExecutionLedgerEntry) -> Self {
        Self {
            id: entry.id,
            job_name: entry.job_name,
            status: entry.status.to_string(),
            executed_at: entry.executed_at,
            details: entry.details,
            error_message: entry.error_message,
        }
    }
}

/// Paginated run history, newest-first.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HistoryResponse {
    pub items: Vec<ExecutionEntryResponse>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_query_defaults_and_caps() {
        let query: HistoryQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.page_bounds(), (20, 0));

        let query: HistoryQuery =
            serde_json::from_str(r#"{"page": 3, "perPage": 10}"#).unwrap();
        assert_eq!(query.page_bounds(), (10, 20));

        let query: HistoryQuery =
            serde_json::from_str(r#"{"page": 0, "per_page": 1000}"#).unwrap();
        assert_eq!(query.page_bounds(), (100, 0));
    }

    #[test]
    fn test_execute_request_rejects_empty_job_name() {
        let req = ExecuteJobRequest {
            job_name: String::new(),
            target_month: None,
        };
        assert!(req.validate().is_err());

        let req = ExecuteJobRequest {
            job_name: "comp_leave_expiry".to_string(),
            target_month: Some("2024-01".to_string()),
        };
        assert!(req.validate().is_ok());
    }
}
