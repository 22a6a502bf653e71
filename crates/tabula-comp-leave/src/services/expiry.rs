//! Expiry-to-overtime-pay conversion batch.
//!
//! On each run the converter resolves a target payroll month (explicit for
//! backfill, otherwise the month before "now" per the injected clock), takes
//! its last day as the cutoff, and sweeps every grant lapsing on that date
//! that still holds allocatable hours into a monetary overtime pay record.
//! Re-running a swept cutoff is a no-op: expired grants no longer match the
//! eligibility query.
//!
//! Each grant converts as its own unit. The grant is CAS-expired against the
//! remaining-hours preimage the payout was priced on, then folded into the
//! user/month pay record; expiring before paying means a retry can never
//! double-pay, and the accumulate is idempotent per grant id besides. One
//! grant's failure never blocks the rest of the batch; failures are counted
//! and recorded in the run's execution-ledger entry.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{LedgerError, Result};
use crate::executions::{ExecutionLogStore, ExecutionStatus, NewExecutionEntry};
use crate::grants::{CompGrant, ExpireOutcome, GrantStore};
use crate::pay_records::{PayAccumulation, PayRecordStore};
use crate::salary::{BalanceCache, SalaryDirectory};
use crate::types::PayrollMonth;

/// Job name recorded in the execution ledger and accepted by the manual
/// trigger endpoint.
pub const COMP_LEAVE_EXPIRY_JOB: &str = "comp_leave_expiry";

/// Working hours a monthly base salary is spread over when deriving the
/// hourly rate.
pub const MONTHLY_WORKING_HOURS: u32 = 240;

/// Cash value in cents of lapsed comp hours.
///
/// `hourly_rate = monthly_base_salary / 240`, then
/// `cents = round(hours * hourly_rate * original_rate * 100)`, rounding
/// half away from zero.
pub fn payout_cents(
    monthly_base_salary: Decimal,
    hours: Decimal,
    original_rate: Decimal,
) -> Result<i64> {
    let hourly_rate = monthly_base_salary / Decimal::from(MONTHLY_WORKING_HOURS);
    let cents = (hours * hourly_rate * original_rate * Decimal::from(100))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    cents
        .to_i64()
        .ok_or_else(|| LedgerError::Internal(format!("Payout amount out of range: {cents} cents")))
}

/// One grant the batch could not convert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantFailure {
    pub grant_id: Uuid,
    pub user_id: Uuid,
    pub error: String,
}

/// Outcome of one converter run; serialized into the run's execution-ledger
/// entry as its structured details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpiryRunSummary {
    /// The payroll month the run targeted.
    pub month: PayrollMonth,
    /// Last day of the target month; only grants expiring exactly on this
    /// date are considered.
    pub cutoff: NaiveDate,
    /// Grants expired and priced into a pay record.
    pub grants_converted: usize,
    /// Grants that became ineligible between the query and the expiry CAS
    /// (consumed concurrently, or swept by a racing run).
    pub grants_skipped: usize,
    /// Distinct (user, month) pay records touched.
    pub pay_records_written: usize,
    pub total_hours_expired: Decimal,
    pub total_amount_cents: i64,
    pub converted_grant_ids: Vec<Uuid>,
    pub failures: Vec<GrantFailure>,
}

impl ExpiryRunSummary {
    fn new(month: PayrollMonth) -> Self {
        Self {
            month,
            cutoff: month.last_day(),
            grants_converted: 0,
            grants_skipped: 0,
            pay_records_written: 0,
            total_hours_expired: Decimal::ZERO,
            total_amount_cents: 0,
            converted_grant_ids: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// True when every eligible grant converted cleanly.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Sweeps lapsed comp-hour grants into overtime pay records.
#[derive(Clone)]
pub struct ExpiryConverter {
    grants: Arc<dyn GrantStore>,
    pay_records: Arc<dyn PayRecordStore>,
    executions: Arc<dyn ExecutionLogStore>,
    salaries: Arc<dyn SalaryDirectory>,
    balance_cache: Arc<dyn BalanceCache>,
    clock: Arc<dyn Clock>,
}

impl ExpiryConverter {
    pub fn new(
        grants: Arc<dyn GrantStore>,
        pay_records: Arc<dyn PayRecordStore>,
        executions: Arc<dyn ExecutionLogStore>,
        salaries: Arc<dyn SalaryDirectory>,
        balance_cache: Arc<dyn BalanceCache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            grants,
            pay_records,
            executions,
            salaries,
            balance_cache,
            clock,
        }
    }

    /// Run one conversion batch and append its execution-ledger entry.
    ///
    /// A `target` month backfills explicitly; otherwise the run covers the
    /// calendar month before the clock's today. The summary is returned even
    /// when individual grants failed; only a failure to read the eligible
    /// set at all surfaces as an error (recorded in the ledger too).
    #[instrument(skip(self))]
    pub async fn run(&self, target: Option<PayrollMonth>) -> Result<ExpiryRunSummary> {
        let month = target.unwrap_or_else(|| PayrollMonth::previous_of(self.clock.today()));

        match self.sweep(month).await {
            Ok(summary) => {
                self.record(&summary).await?;
                Ok(summary)
            }
            Err(err) => {
                // Top-level failure: the run still leaves a ledger entry.
                let entry = NewExecutionEntry {
                    job_name: COMP_LEAVE_EXPIRY_JOB.to_string(),
                    status: ExecutionStatus::Failed,
                    executed_at: self.clock.now(),
                    details: serde_json::json!({
                        "month": month.to_string(),
                        "cutoff": month.last_day(),
                    }),
                    error_message: Some(err.to_string()),
                };
                if let Err(append_err) = self.executions.append(entry).await {
                    warn!(error = %append_err, "failed to record failed expiry run");
                }
                Err(LedgerError::JobExecution(err.to_string()))
            }
        }
    }

    async fn sweep(&self, month: PayrollMonth) -> Result<ExpiryRunSummary> {
        let mut summary = ExpiryRunSummary::new(month);
        let cutoff = summary.cutoff;

        let expiring = self.grants.expiring_grants(cutoff).await?;
        if expiring.is_empty() {
            debug!(%month, %cutoff, "no grants lapsing at cutoff");
            return Ok(summary);
        }
        info!(%month, %cutoff, grants = expiring.len(), "sweeping lapsed comp-hour grants");

        let mut users_paid: HashSet<Uuid> = HashSet::new();
        let mut users_touched: HashSet<Uuid> = HashSet::new();
        for grant in expiring {
            match self.convert_grant(&grant, month, cutoff).await {
                Ok(Some(accumulated)) => {
                    summary.grants_converted += 1;
                    summary.total_hours_expired += accumulated.hours;
                    summary.total_amount_cents += accumulated.amount_cents;
                    summary.converted_grant_ids.push(accumulated.grant_id);
                    users_paid.insert(grant.user_id);
                    users_touched.insert(grant.user_id);
                }
                Ok(None) => {
                    summary.grants_skipped += 1;
                }
                Err(err) => {
                    warn!(
                        grant_id = %grant.id,
                        user_id = %grant.user_id,
                        error = %err,
                        "grant conversion failed, continuing with the batch"
                    );
                    summary.failures.push(GrantFailure {
                        grant_id: grant.id,
                        user_id: grant.user_id,
                        error: err.to_string(),
                    });
                }
            }
        }
        summary.pay_records_written = users_paid.len();

        for user_id in users_touched {
            self.balance_cache.invalidate(user_id).await;
        }

        info!(
            %month,
            converted = summary.grants_converted,
            skipped = summary.grants_skipped,
            failed = summary.failures.len(),
            total_hours = %summary.total_hours_expired,
            total_cents = summary.total_amount_cents,
            "expiry conversion run complete"
        );
        Ok(summary)
    }

    /// Convert one grant: price it, CAS-expire it, fold it into the user's
    /// pay record. `Ok(None)` means the grant became ineligible underneath
    /// the run and was skipped.
    async fn convert_grant(
        &self,
        grant: &CompGrant,
        month: PayrollMonth,
        cutoff: NaiveDate,
    ) -> Result<Option<PayAccumulation>> {
        let salary = self
            .salaries
            .monthly_base_salary(grant.user_id)
            .await?
            .ok_or(LedgerError::SalaryUnavailable(grant.user_id))?;

        let mut current = grant.clone();
        // One replan when a concurrent consumption moved the remaining
        // hours between the eligibility read and the CAS.
        for attempt in 0..2 {
            let amount_cents = payout_cents(salary, current.hours_remaining, current.original_rate)?;
            match self
                .grants
                .expire_grant(current.id, current.hours_remaining)
                .await?
            {
                ExpireOutcome::Expired(expired) => {
                    let accumulation = PayAccumulation {
                        user_id: expired.user_id,
                        month,
                        grant_id: expired.id,
                        hours: expired.hours_remaining,
                        amount_cents,
                    };
                    self.pay_records.accumulate(accumulation.clone()).await?;
                    debug!(
                        grant_id = %expired.id,
                        user_id = %expired.user_id,
                        hours = %expired.hours_remaining,
                        amount_cents,
                        "grant expired into overtime pay"
                    );
                    return Ok(Some(accumulation));
                }
                ExpireOutcome::Conflict(now) => {
                    let still_eligible = now.status.is_allocatable()
                        && now.hours_remaining > Decimal::ZERO
                        && now.expiry_date == cutoff;
                    if !still_eligible || attempt == 1 {
                        debug!(grant_id = %now.id, "grant no longer eligible, skipping");
                        return Ok(None);
                    }
                    current = now;
                }
                ExpireOutcome::NotFound => {
                    return Err(LedgerError::GrantNotFound(current.id));
                }
            }
        }
        Ok(None)
    }

    async fn record(&self, summary: &ExpiryRunSummary) -> Result<()> {
        let status = if summary.is_clean() {
            ExecutionStatus::Success
        } else {
            ExecutionStatus::Failed
        };
        let details = serde_json::to_value(summary)
            .map_err(|e| LedgerError::Internal(format!("Unserializable run summary: {e}")))?;
        let error_message = (!summary.is_clean()).then(|| {
            format!(
                "{} of {} eligible grants failed to convert",
                summary.failures.len(),
                summary.failures.len() + summary.grants_converted + summary.grants_skipped
            )
        });
        self.executions
            .append(NewExecutionEntry {
                job_name: COMP_LEAVE_EXPIRY_JOB.to_string(),
                status,
                executed_at: self.clock.now(),
                details,
                error_message,
            })
            .await?;
        Ok(())
    }
}
