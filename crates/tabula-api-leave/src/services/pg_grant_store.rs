//! Postgres-backed grant store.
//!
//! Simple reads go through the row model; the two compound mutations run
//! their own transactions here. `apply_deltas` locks the affected rows with
//! `SELECT ... FOR UPDATE` so a consumption and a reversal racing on the
//! same grants serialize; `expire_grant` is a single guarded UPDATE, the
//! compare-and-set the expiry batch prices against.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tabula_comp_leave::error::{LedgerError, Result};
use tabula_comp_leave::grants::{CompGrant, ExpireOutcome, GrantDelta, GrantStore, NewCompGrant};
use tabula_comp_leave::types::GrantStatus;
use tabula_db::models::{CompGrantRow, CreateCompGrant};
use uuid::Uuid;

/// [`GrantStore`] backed by the `comp_grants` table.
#[derive(Clone)]
pub struct PgGrantStore {
    pool: PgPool,
}

impl PgGrantStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn grant_from_row(row: CompGrantRow) -> Result<CompGrant> {
    let status: GrantStatus = row
        .status
        .parse()
        .map_err(|e: String| LedgerError::Internal(format!("Grant {} has {e}", row.id)))?;
    Ok(CompGrant {
        id: row.id,
        user_id: row.user_id,
        hours_granted: row.hours_granted,
        hours_used: row.hours_used,
        hours_remaining: row.hours_remaining,
        original_rate: row.original_rate,
        generated_date: row.generated_date,
        expiry_date: row.expiry_date,
        status,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn grants_from_rows(rows: Vec<CompGrantRow>) -> Result<Vec<CompGrant>> {
    rows.into_iter().map(grant_from_row).collect()
}

#[async_trait]
impl GrantStore for PgGrantStore {
    async fn create_grant(&self, input: NewCompGrant) -> Result<CompGrant> {
        input.validate()?;
        let row = CompGrantRow::create(
            &self.pool,
            &CreateCompGrant {
                user_id: input.user_id,
                hours_granted: input.hours_granted,
                original_rate: input.original_rate,
                generated_date: input.generated_date,
                expiry_date: input.expiry_date,
            },
        )
        .await?;
        grant_from_row(row)
    }

    async fn find_grant(&self, grant_id: Uuid) -> Result<Option<CompGrant>> {
        let row = CompGrantRow::find_by_id(&self.pool, grant_id).await?;
        row.map(grant_from_row).transpose()
    }

    async fn active_grants_for_user(&self, user_id: Uuid) -> Result<Vec<CompGrant>> {
        let rows = CompGrantRow::list_active_for_user(&self.pool, user_id).await?;
        grants_from_rows(rows)
    }

    async fn grants_for_user(&self, user_id: Uuid) -> Result<Vec<CompGrant>> {
        let rows = CompGrantRow::list_for_user(&self.pool, user_id).await?;
        grants_from_rows(rows)
    }

    async fn apply_deltas(&self, user_id: Uuid, deltas: &[GrantDelta]) -> Result<Vec<CompGrant>> {
        if deltas.is_empty() {
            return Ok(Vec::new());
        }
        for delta in deltas {
            if delta.used_delta + delta.remaining_delta != Decimal::ZERO {
                return Err(LedgerError::Validation(format!(
                    "Delta for grant {} violates hour conservation",
                    delta.grant_id
                )));
            }
        }

        let mut tx = self.pool.begin().await?;

        // Lock in stable id order so concurrent delta sets cannot deadlock.
        let mut ids: Vec<Uuid> = deltas.iter().map(|d| d.grant_id).collect();
        ids.sort();
        ids.dedup();
        let rows: Vec<CompGrantRow> =
            sqlx::query_as("SELECT * FROM comp_grants WHERE id = ANY($1) FOR UPDATE")
                .bind(&ids)
                .fetch_all(&mut *tx)
                .await?;

        let mut staged: HashMap<Uuid, CompGrant> = HashMap::with_capacity(rows.len());
        for row in rows {
            let grant = grant_from_row(row)?;
            staged.insert(grant.id, grant);
        }

        // Stage every delta against the locked state; any rejection rolls
        // the transaction back on drop.
        let mut order: Vec<Uuid> = Vec::new();
        for delta in deltas {
            let grant = staged
                .get_mut(&delta.grant_id)
                .ok_or(LedgerError::GrantNotFound(delta.grant_id))?;
            if grant.user_id != user_id {
                return Err(LedgerError::Validation(format!(
                    "Grant {} does not belong to user {}",
                    delta.grant_id, user_id
                )));
            }
            if grant.status.is_terminal() {
                return Err(LedgerError::Conflict(format!(
                    "Grant {} is expired and can no longer be mutated",
                    delta.grant_id
                )));
            }
            let new_used = grant.hours_used + delta.used_delta;
            let new_remaining = grant.hours_remaining + delta.remaining_delta;
            if new_used < Decimal::ZERO || new_remaining < Decimal::ZERO {
                return Err(LedgerError::Conflict(format!(
                    "Delta for grant {} would drive an hour counter negative",
                    delta.grant_id
                )));
            }
            grant.hours_used = new_used;
            grant.hours_remaining = new_remaining;
            grant.status = GrantStatus::derive(new_used, new_remaining);
            if !order.contains(&delta.grant_id) {
                order.push(delta.grant_id);
            }
        }

        let mut updated = Vec::with_capacity(order.len());
        for grant_id in order {
            let grant = &staged[&grant_id];
            let row: CompGrantRow = sqlx::query_as(
                r"
                UPDATE comp_grants
                SET hours_used = $1, hours_remaining = $2, status = $3, updated_at = NOW()
                WHERE id = $4
                RETURNING *
                ",
            )
            .bind(grant.hours_used)
            .bind(grant.hours_remaining)
            .bind(grant.status.as_str())
            .bind(grant_id)
            .fetch_one(&mut *tx)
            .await?;
            updated.push(grant_from_row(row)?);
        }

        tx.commit().await?;
        Ok(updated)
    }

    async fn expiring_grants(&self, cutoff: NaiveDate) -> Result<Vec<CompGrant>> {
        let rows = CompGrantRow::list_expiring(&self.pool, cutoff).await?;
        grants_from_rows(rows)
    }

    async fn expire_grant(
        &self,
        grant_id: Uuid,
        expected_remaining: Decimal,
    ) -> Result<ExpireOutcome> {
        let row: Option<CompGrantRow> = sqlx::query_as(
            r"
            UPDATE comp_grants
            SET status = 'expired', updated_at = NOW()
            WHERE id = $1
              AND status IN ('active', 'partially_used')
              AND hours_remaining > 0
              AND hours_remaining = $2
            RETURNING *
            ",
        )
        .bind(grant_id)
        .bind(expected_remaining)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(ExpireOutcome::Expired(grant_from_row(row)?));
        }
        match CompGrantRow::find_by_id(&self.pool, grant_id).await? {
            Some(row) => Ok(ExpireOutcome::Conflict(grant_from_row(row)?)),
            None => Ok(ExpireOutcome::NotFound),
        }
    }
}
