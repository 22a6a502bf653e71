//! Postgres-backed overtime pay record store.

use async_trait::async_trait;
use sqlx::PgPool;
use tabula_comp_leave::error::{LedgerError, Result};
use tabula_comp_leave::pay_records::{OvertimePayRecord, PayAccumulation, PayRecordStore};
use tabula_comp_leave::types::PayrollMonth;
use tabula_db::models::OvertimePayRecordRow;
use uuid::Uuid;

/// [`PayRecordStore`] backed by the `overtime_pay_records` table. The
/// idempotent-per-grant aggregation lives in the row model's upsert.
#[derive(Clone)]
pub struct PgPayRecordStore {
    pool: PgPool,
}

impl PgPayRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn record_from_row(row: OvertimePayRecordRow) -> Result<OvertimePayRecord> {
    let payroll_month: PayrollMonth = row
        .payroll_month
        .parse()
        .map_err(|e: String| LedgerError::Internal(format!("Pay record {}: {e}", row.id)))?;
    Ok(OvertimePayRecord {
        id: row.id,
        user_id: row.user_id,
        payroll_month,
        hours_expired: row.hours_expired,
        amount_cents: row.amount_cents,
        source_grant_ids: row.source_grant_ids,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

#[async_trait]
impl PayRecordStore for PgPayRecordStore {
    async fn accumulate(&self, entry: PayAccumulation) -> Result<OvertimePayRecord> {
        let row = OvertimePayRecordRow::accumulate(
            &self.pool,
            entry.user_id,
            &entry.month.to_string(),
            entry.grant_id,
            entry.hours,
            entry.amount_cents,
        )
        .await?;
        record_from_row(row)
    }

    async fn find_record(
        &self,
        user_id: Uuid,
        month: PayrollMonth,
    ) -> Result<Option<OvertimePayRecord>> {
        let row =
            OvertimePayRecordRow::find_by_user_month(&self.pool, user_id, &month.to_string())
                .await?;
        row.map(record_from_row).transpose()
    }

    async fn records_for_month(&self, month: PayrollMonth) -> Result<Vec<OvertimePayRecord>> {
        let rows = OvertimePayRecordRow::list_for_month(&self.pool, &month.to_string()).await?;
        rows.into_iter().map(record_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[test]
    fn test_row_maps_to_domain_record() {
        let now = Utc::now();
        let grant = Uuid::new_v4();
        let record = record_from_row(OvertimePayRecordRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            payroll_month: "2024-01".to_string(),
            hours_expired: dec!(4),
            amount_cents: 107_200,
            source_grant_ids: vec![grant],
            created_at: now,
            updated_at: now,
        })
        .unwrap();
        assert_eq!(record.payroll_month.to_string(), "2024-01");
        assert_eq!(record.source_grant_ids, vec![grant]);
    }
}
