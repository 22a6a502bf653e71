//! Postgres-backed execution ledger store.

use async_trait::async_trait;
use sqlx::PgPool;
use tabula_comp_leave::error::{LedgerError, Result};
use tabula_comp_leave::executions::{
    ExecutionFilter, ExecutionLedgerEntry, ExecutionLogStore, ExecutionStatus, NewExecutionEntry,
};
use tabula_db::models::{CreateJobExecution, JobExecutionFilter, JobExecutionRow};

/// [`ExecutionLogStore`] backed by the append-only `job_executions` table.
#[derive(Clone)]
pub struct PgExecutionLogStore {
    pool: PgPool,
}

impl PgExecutionLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn entry_from_row(row: JobExecutionRow) -> Result<ExecutionLedgerEntry> {
    let status: ExecutionStatus = row
        .status
        .parse()
        .map_err(|e: String| LedgerError::Internal(format!("Run {}: {e}", row.id)))?;
    Ok(ExecutionLedgerEntry {
        id: row.id,
        job_name: row.job_name,
        status,
        executed_at: row.executed_at,
        details: row.details,
        error_message: row.error_message,
    })
}

#[async_trait]
impl ExecutionLogStore for PgExecutionLogStore {
    async fn append(&self, entry: NewExecutionEntry) -> Result<ExecutionLedgerEntry> {
        let row = JobExecutionRow::create(
            &self.pool,
            &CreateJobExecution {
                job_name: entry.job_name,
                status: entry.status.as_str().to_string(),
                executed_at: entry.executed_at,
                details: entry.details,
                error_message: entry.error_message,
            },
        )
        .await?;
        entry_from_row(row)
    }

    async fn list(&self, filter: ExecutionFilter) -> Result<(Vec<ExecutionLedgerEntry>, i64)> {
        let row_filter = JobExecutionFilter {
            job_name: filter.job_name,
        };
        let limit = if filter.limit > 0 { filter.limit } else { i64::MAX };
        let offset = filter.offset.max(0);

        let total = JobExecutionRow::count(&self.pool, &row_filter).await?;
        let rows = JobExecutionRow::list(&self.pool, &row_filter, limit, offset).await?;
        let entries = rows
            .into_iter()
            .map(entry_from_row)
            .collect::<Result<Vec<_>>>()?;
        Ok((entries, total))
    }
}
