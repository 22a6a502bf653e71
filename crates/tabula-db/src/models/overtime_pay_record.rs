//! Overtime pay record rows.
//!
//! One row per (user, payroll month), accumulating every grant of that
//! user's that lapsed into the month. The unique constraint on
//! `(user_id, payroll_month)` is what makes the batch's upsert aggregate.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// An overtime pay record row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OvertimePayRecordRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub payroll_month: String,
    pub hours_expired: Decimal,
    pub amount_cents: i64,
    pub source_grant_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OvertimePayRecordRow {
    /// Fold one grant's payout into the (user, month) record, creating the
    /// record when absent. Idempotent per grant: a grant id already among
    /// the record's sources leaves the row unchanged.
    pub async fn accumulate(
        pool: &PgPool,
        user_id: Uuid,
        payroll_month: &str,
        grant_id: Uuid,
        hours: Decimal,
        amount_cents: i64,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            r"
            INSERT INTO overtime_pay_records (
                user_id, payroll_month, hours_expired, amount_cents, source_grant_ids
            )
            VALUES ($1, $2, $3, $4, ARRAY[$5]::uuid[])
            ON CONFLICT (user_id, payroll_month) DO UPDATE SET
                hours_expired = overtime_pay_records.hours_expired
                    + CASE WHEN $5 = ANY(overtime_pay_records.source_grant_ids)
                           THEN 0 ELSE $3 END,
                amount_cents = overtime_pay_records.amount_cents
                    + CASE WHEN $5 = ANY(overtime_pay_records.source_grant_ids)
                           THEN 0 ELSE $4 END,
                source_grant_ids = CASE
                    WHEN $5 = ANY(overtime_pay_records.source_grant_ids)
                    THEN overtime_pay_records.source_grant_ids
                    ELSE array_append(overtime_pay_records.source_grant_ids, $5) END,
                updated_at = CASE
                    WHEN $5 = ANY(overtime_pay_records.source_grant_ids)
                    THEN overtime_pay_records.updated_at
                    ELSE NOW() END
            RETURNING *
            ",
        )
        .bind(user_id)
        .bind(payroll_month)
        .bind(hours)
        .bind(amount_cents)
        .bind(grant_id)
        .fetch_one(pool)
        .await
    }

    /// The record for one user and month, if any.
    pub async fn find_by_user_month(
        pool: &PgPool,
        user_id: Uuid,
        payroll_month: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            "SELECT * FROM overtime_pay_records WHERE user_id = $1 AND payroll_month = $2",
        )
        .bind(user_id)
        .bind(payroll_month)
        .fetch_optional(pool)
        .await
    }

    /// Every record for a payroll month, ordered by user for stable pay-run
    /// assembly.
    pub async fn list_for_month(
        pool: &PgPool,
        payroll_month: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            "SELECT * FROM overtime_pay_records WHERE payroll_month = $1 ORDER BY user_id",
        )
        .bind(payroll_month)
        .fetch_all(pool)
        .await
    }
}
