//! Overtime pay records produced by the expiry batch.
//!
//! One record per (user, payroll month) aggregates every grant of that
//! user's that lapsed into the month's pay run. Payroll consumes these rows
//! when assembling the month; the ledger only ever appends to them.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::Result;
use crate::types::PayrollMonth;

/// Monetized lapsed comp hours for one user and payroll month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OvertimePayRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub payroll_month: PayrollMonth,
    /// Total comp hours that lapsed into this record.
    pub hours_expired: Decimal,
    /// Cash value in cents, summed over the source grants.
    pub amount_cents: i64,
    /// Grants swept into this record; a grant appears at most once.
    pub source_grant_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One grant's contribution to a user/month pay record.
#[derive(Debug, Clone, PartialEq)]
pub struct PayAccumulation {
    pub user_id: Uuid,
    pub month: PayrollMonth,
    pub grant_id: Uuid,
    pub hours: Decimal,
    pub amount_cents: i64,
}

/// Storage for overtime pay records.
#[async_trait]
pub trait PayRecordStore: Send + Sync {
    /// Fold one grant's payout into the (user, month) record, creating the
    /// record if absent. Idempotent per grant: accumulating a grant id that
    /// is already among the record's sources is a no-op returning the
    /// current record.
    async fn accumulate(&self, entry: PayAccumulation) -> Result<OvertimePayRecord>;

    /// The record for one user and month, if any.
    async fn find_record(
        &self,
        user_id: Uuid,
        month: PayrollMonth,
    ) -> Result<Option<OvertimePayRecord>>;

    /// Every record for a payroll month, ordered by user id for stable
    /// pay-run assembly.
    async fn records_for_month(&self, month: PayrollMonth) -> Result<Vec<OvertimePayRecord>>;
}

/// In-memory [`PayRecordStore`] for tests.
#[derive(Debug, Default)]
pub struct InMemoryPayRecordStore {
    records: RwLock<HashMap<(Uuid, PayrollMonth), OvertimePayRecord>>,
}

impl InMemoryPayRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl PayRecordStore for InMemoryPayRecordStore {
    async fn accumulate(&self, entry: PayAccumulation) -> Result<OvertimePayRecord> {
        let mut records = self.records.write().await;
        let now = Utc::now();
        let record = records
            .entry((entry.user_id, entry.month))
            .or_insert_with(|| OvertimePayRecord {
                id: Uuid::new_v4(),
                user_id: entry.user_id,
                payroll_month: entry.month,
                hours_expired: Decimal::ZERO,
                amount_cents: 0,
                source_grant_ids: Vec::new(),
                created_at: now,
                updated_at: now,
            });
        if !record.source_grant_ids.contains(&entry.grant_id) {
            record.hours_expired += entry.hours;
            record.amount_cents += entry.amount_cents;
            record.source_grant_ids.push(entry.grant_id);
            record.updated_at = now;
        }
        Ok(record.clone())
    }

    async fn find_record(
        &self,
        user_id: Uuid,
        month: PayrollMonth,
    ) -> Result<Option<OvertimePayRecord>> {
        Ok(self.records.read().await.get(&(user_id, month)).cloned())
    }

    async fn records_for_month(&self, month: PayrollMonth) -> Result<Vec<OvertimePayRecord>> {
        let records = self.records.read().await;
        let mut out: Vec<OvertimePayRecord> = records
            .values()
            .filter(|r| r.payroll_month == month)
            .cloned()
            .collect();
        out.sort_by_key(|r| r.user_id);
        Ok(out)
    }
}
