//! Comp-hour grant rows.
//!
//! Statuses are stored as TEXT with a CHECK constraint; the domain layer
//! parses them back into its enum. All ordered retrieval uses the FIFO
//! index: generated date ascending, ties broken by insertion order.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Statuses a grant row may carry.
pub const GRANT_STATUSES_ALLOCATABLE: [&str; 2] = ["active", "partially_used"];

/// A comp-hour grant row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CompGrantRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub hours_granted: Decimal,
    pub hours_used: Decimal,
    pub hours_remaining: Decimal,
    pub original_rate: Decimal,
    pub generated_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for inserting a grant row. New grants start unconsumed and active;
/// the counters derive from `hours_granted`.
#[derive(Debug, Clone)]
pub struct CreateCompGrant {
    pub user_id: Uuid,
    pub hours_granted: Decimal,
    pub original_rate: Decimal,
    pub generated_date: NaiveDate,
    pub expiry_date: NaiveDate,
}

impl CompGrantRow {
    /// Insert a new grant.
    pub async fn create(pool: &PgPool, input: &CreateCompGrant) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            r"
            INSERT INTO comp_grants (
                user_id, hours_granted, hours_used, hours_remaining,
                original_rate, generated_date, expiry_date, status
            )
            VALUES ($1, $2, 0, $2, $3, $4, $5, 'active')
            RETURNING *
            ",
        )
        .bind(input.user_id)
        .bind(input.hours_granted)
        .bind(input.original_rate)
        .bind(input.generated_date)
        .bind(input.expiry_date)
        .fetch_one(pool)
        .await
    }

    /// Find a grant by ID.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM comp_grants WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All of a user's grants in FIFO order.
    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            SELECT * FROM comp_grants
            WHERE user_id = $1
            ORDER BY generated_date ASC, created_at ASC, id ASC
            ",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// The user's allocatable grants in FIFO order.
    pub async fn list_active_for_user(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            SELECT * FROM comp_grants
            WHERE user_id = $1 AND status IN ('active', 'partially_used')
            ORDER BY generated_date ASC, created_at ASC, id ASC
            ",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Grants lapsing exactly at `cutoff` that still hold allocatable
    /// hours, ordered by user then FIFO.
    pub async fn list_expiring(
        pool: &PgPool,
        cutoff: NaiveDate,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            SELECT * FROM comp_grants
            WHERE expiry_date = $1
              AND status IN ('active', 'partially_used')
              AND hours_remaining > 0
            ORDER BY user_id, generated_date ASC, created_at ASC, id ASC
            ",
        )
        .bind(cutoff)
        .fetch_all(pool)
        .await
    }
}
