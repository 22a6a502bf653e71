//! Batch job execution rows. Append-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

/// A recorded batch run.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct JobExecutionRow {
    pub id: Uuid,
    pub job_name: String,
    pub status: String,
    pub executed_at: DateTime<Utc>,
    pub details: JsonValue,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for appending a run.
#[derive(Debug, Clone)]
pub struct CreateJobExecution {
    pub job_name: String,
    pub status: String,
    pub executed_at: DateTime<Utc>,
    pub details: JsonValue,
    pub error_message: Option<String>,
}

/// Filter for listing runs.
#[derive(Debug, Clone, Default)]
pub struct JobExecutionFilter {
    pub job_name: Option<String>,
}

impl JobExecutionRow {
    /// Append a run entry.
    pub async fn create(pool: &PgPool, input: &CreateJobExecution) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            r"
            INSERT INTO job_executions (job_name, status, executed_at, details, error_message)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            ",
        )
        .bind(&input.job_name)
        .bind(&input.status)
        .bind(input.executed_at)
        .bind(&input.details)
        .bind(&input.error_message)
        .fetch_one(pool)
        .await
    }

    /// List runs newest-first.
    pub async fn list(
        pool: &PgPool,
        filter: &JobExecutionFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        match &filter.job_name {
            Some(job_name) => {
                sqlx::query_as(
                    r"
                    SELECT * FROM job_executions
                    WHERE job_name = $1
                    ORDER BY executed_at DESC
                    LIMIT $2 OFFSET $3
                    ",
                )
                .bind(job_name)
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await
            }
            None => {
                sqlx::query_as(
                    r"
                    SELECT * FROM job_executions
                    ORDER BY executed_at DESC
                    LIMIT $1 OFFSET $2
                    ",
                )
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await
            }
        }
    }

    /// Count runs matching the filter.
    pub async fn count(pool: &PgPool, filter: &JobExecutionFilter) -> Result<i64, sqlx::Error> {
        match &filter.job_name {
            Some(job_name) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM job_executions WHERE job_name = $1")
                    .bind(job_name)
                    .fetch_one(pool)
                    .await
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM job_executions")
                    .fetch_one(pool)
                    .await
            }
        }
    }
}
