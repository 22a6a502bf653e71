//! Append-only execution ledger for batch runs.
//!
//! Every expiry-converter invocation writes exactly one entry: a success
//! with the run summary as structured details, or a failure with the error
//! message. Entries are never updated or deleted.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::Result;

/// Outcome of a recorded run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ExecutionStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Unknown execution status: {s}")),
        }
    }
}

/// One recorded batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLedgerEntry {
    pub id: Uuid,
    pub job_name: String,
    pub status: ExecutionStatus,
    pub executed_at: DateTime<Utc>,
    /// Structured run summary: cutoff date, counts, affected grant ids.
    pub details: serde_json::Value,
    pub error_message: Option<String>,
}

/// Input for appending a run entry.
#[derive(Debug, Clone)]
pub struct NewExecutionEntry {
    pub job_name: String,
    pub status: ExecutionStatus,
    /// Stamped by the caller from its injected clock.
    pub executed_at: DateTime<Utc>,
    pub details: serde_json::Value,
    pub error_message: Option<String>,
}

/// Filter for listing entries.
#[derive(Debug, Clone, Default)]
pub struct ExecutionFilter {
    pub job_name: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl ExecutionFilter {
    pub fn for_job(job_name: impl Into<String>) -> Self {
        Self {
            job_name: Some(job_name.into()),
            ..Self::default()
        }
    }

    pub fn with_page(mut self, limit: i64, offset: i64) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }
}

/// Append-only storage for run entries.
#[async_trait]
pub trait ExecutionLogStore: Send + Sync {
    /// Append one entry.
    async fn append(&self, entry: NewExecutionEntry) -> Result<ExecutionLedgerEntry>;

    /// Entries newest-first, with the total count before pagination.
    /// A `limit` of zero or less means no limit.
    async fn list(&self, filter: ExecutionFilter) -> Result<(Vec<ExecutionLedgerEntry>, i64)>;
}

/// In-memory [`ExecutionLogStore`] for tests.
#[derive(Debug, Default)]
pub struct InMemoryExecutionLogStore {
    entries: RwLock<Vec<ExecutionLedgerEntry>>,
}

impl InMemoryExecutionLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl ExecutionLogStore for InMemoryExecutionLogStore {
    async fn append(&self, entry: NewExecutionEntry) -> Result<ExecutionLedgerEntry> {
        let recorded = ExecutionLedgerEntry {
            id: Uuid::new_v4(),
            job_name: entry.job_name,
            status: entry.status,
            executed_at: entry.executed_at,
            details: entry.details,
            error_message: entry.error_message,
        };
        self.entries.write().await.push(recorded.clone());
        Ok(recorded)
    }

    async fn list(&self, filter: ExecutionFilter) -> Result<(Vec<ExecutionLedgerEntry>, i64)> {
        let entries = self.entries.read().await;
        let mut matching: Vec<ExecutionLedgerEntry> = entries
            .iter()
            .filter(|e| {
                filter
                    .job_name
                    .as_ref()
                    .map_or(true, |name| &e.job_name == name)
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.executed_at.cmp(&a.executed_at));
        let total = matching.len() as i64;

        let offset = filter.offset.max(0) as usize;
        let mut page: Vec<ExecutionLedgerEntry> = matching.into_iter().skip(offset).collect();
        if filter.limit > 0 {
            page.truncate(filter.limit as usize);
        }
        Ok((page, total))
    }
}
