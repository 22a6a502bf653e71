//! Credit-back of consumed comp hours when a leave record is cancelled.
//!
//! The preferred path replays the exact (grant, hours) allocations recorded
//! at consumption time. When those are unavailable, a FIFO replay over the
//! user's consumed grants approximates the original walk. Either way,
//! credits that can no longer land (the grant has since been swept by the
//! expiry converter) are reported explicitly, never dropped.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::error::{LedgerError, Result};
use crate::grants::{GrantDelta, GrantStore};
use crate::salary::BalanceCache;
use crate::types::{GrantAllocation, GrantStatus};

use super::{ensure_valid_request_hours, MAX_CONFLICT_RETRIES};

/// Why part of a reversal could not be restored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The grant was swept into an overtime pay record; expired grants are
    /// never resurrected. Monetary remediation belongs to payroll.
    GrantExpired,
    /// No such grant exists.
    GrantMissing,
    /// The recorded allocation exceeds the hours currently consumed from
    /// the grant; only the consumed portion was returned.
    ExceedsUsedHours,
}

/// A credit the engine refused, with the hours it covered.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkippedCredit {
    pub grant_id: Uuid,
    pub hours: Decimal,
    pub reason: SkipReason,
}

/// Outcome of a reversal: what was restored, what was not, and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReversalReceipt {
    /// Hours the caller asked to return.
    pub requested: Decimal,
    /// Credits applied, grant by grant.
    pub restored: Vec<GrantAllocation>,
    /// Credits refused, grant by grant.
    pub skipped: Vec<SkippedCredit>,
    /// Hours for which no consumed grant could be found at all (FIFO
    /// fallback only).
    pub unreturned: Decimal,
}

impl ReversalReceipt {
    pub fn restored_hours(&self) -> Decimal {
        self.restored.iter().map(|a| a.hours).sum()
    }

    pub fn skipped_hours(&self) -> Decimal {
        self.skipped.iter().map(|s| s.hours).sum()
    }

    /// True when every requested hour landed back on a grant.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty() && self.unreturned.is_zero()
    }
}

/// Returns consumed hours to their grants when a comp-leave record is
/// deleted or cancelled.
#[derive(Clone)]
pub struct ReversalEngine {
    grants: Arc<dyn GrantStore>,
    balance_cache: Arc<dyn BalanceCache>,
}

impl ReversalEngine {
    pub fn new(grants: Arc<dyn GrantStore>, balance_cache: Arc<dyn BalanceCache>) -> Self {
        Self {
            grants,
            balance_cache,
        }
    }

    /// Replay the allocations recorded at consumption time.
    ///
    /// Each credit lands on its original grant, clamped to the hours still
    /// consumed there. All applicable credits are applied as one atomic
    /// unit; refused credits are listed in the receipt.
    #[instrument(skip(self, allocations), fields(allocations = allocations.len()))]
    pub async fn reverse_allocations(
        &self,
        user_id: Uuid,
        allocations: &[GrantAllocation],
    ) -> Result<ReversalReceipt> {
        for allocation in allocations {
            ensure_valid_request_hours(allocation.hours)?;
        }
        let requested: Decimal = allocations.iter().map(|a| a.hours).sum();

        let mut attempt = 0;
        loop {
            let grants = self.grants.grants_for_user(user_id).await?;
            let by_id: HashMap<Uuid, _> = grants.iter().map(|g| (g.id, g)).collect();

            let mut receipt = ReversalReceipt {
                requested,
                restored: Vec::new(),
                skipped: Vec::new(),
                unreturned: Decimal::ZERO,
            };
            let mut deltas = Vec::new();
            // Hours already staged for credit per grant, so repeated
            // allocations against one grant never exceed its used hours.
            let mut staged_credit: HashMap<Uuid, Decimal> = HashMap::new();

            for allocation in allocations {
                let Some(grant) = by_id.get(&allocation.grant_id) else {
                    receipt.skipped.push(SkippedCredit {
                        grant_id: allocation.grant_id,
                        hours: allocation.hours,
                        reason: SkipReason::GrantMissing,
                    });
                    continue;
                };
                if grant.status == GrantStatus::Expired {
                    receipt.skipped.push(SkippedCredit {
                        grant_id: grant.id,
                        hours: allocation.hours,
                        reason: SkipReason::GrantExpired,
                    });
                    continue;
                }
                let already = staged_credit
                    .get(&grant.id)
                    .copied()
                    .unwrap_or(Decimal::ZERO);
                let creditable = (grant.hours_used - already).max(Decimal::ZERO);
                let credit = allocation.hours.min(creditable);
                if credit > Decimal::ZERO {
                    deltas.push(GrantDelta::credit(grant.id, credit));
                    receipt.restored.push(GrantAllocation {
                        grant_id: grant.id,
                        hours: credit,
                    });
                    staged_credit.insert(grant.id, already + credit);
                }
                if credit < allocation.hours {
                    receipt.skipped.push(SkippedCredit {
                        grant_id: grant.id,
                        hours: allocation.hours - credit,
                        reason: SkipReason::ExceedsUsedHours,
                    });
                }
            }

            match self.apply(user_id, &deltas, receipt).await {
                Ok(receipt) => return Ok(receipt),
                Err(err) if err.is_conflict() && attempt < MAX_CONFLICT_RETRIES => {
                    attempt += 1;
                    tracing::debug!(%user_id, attempt, "reversal raced with a concurrent update, replanning");
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// FIFO fallback when the recorded allocations are unavailable: walk the
    /// user's consumed grants oldest-first, crediting each up to its used
    /// hours, mirroring the original consumption walk.
    #[instrument(skip(self))]
    pub async fn reverse_fifo(&self, user_id: Uuid, hours: Decimal) -> Result<ReversalReceipt> {
        ensure_valid_request_hours(hours)?;

        let mut attempt = 0;
        loop {
            let grants = self.grants.grants_for_user(user_id).await?;

            let mut receipt = ReversalReceipt {
                requested: hours,
                restored: Vec::new(),
                skipped: Vec::new(),
                unreturned: Decimal::ZERO,
            };
            let mut deltas = Vec::new();
            let mut outstanding = hours;

            for grant in &grants {
                if outstanding.is_zero() {
                    break;
                }
                let potential = grant.hours_used.min(outstanding);
                if potential <= Decimal::ZERO {
                    continue;
                }
                // The replay attributes these hours to this grant whether or
                // not they can land; an expired grant blocks its share.
                if grant.status == GrantStatus::Expired {
                    receipt.skipped.push(SkippedCredit {
                        grant_id: grant.id,
                        hours: potential,
                        reason: SkipReason::GrantExpired,
                    });
                } else {
                    deltas.push(GrantDelta::credit(grant.id, potential));
                    receipt.restored.push(GrantAllocation {
                        grant_id: grant.id,
                        hours: potential,
                    });
                }
                outstanding -= potential;
            }
            receipt.unreturned = outstanding;

            match self.apply(user_id, &deltas, receipt).await {
                Ok(receipt) => return Ok(receipt),
                Err(err) if err.is_conflict() && attempt < MAX_CONFLICT_RETRIES => {
                    attempt += 1;
                    tracing::debug!(%user_id, attempt, "reversal raced with a concurrent update, replanning");
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Apply staged credits and finalize the receipt.
    async fn apply(
        &self,
        user_id: Uuid,
        deltas: &[GrantDelta],
        receipt: ReversalReceipt,
    ) -> Result<ReversalReceipt> {
        if !deltas.is_empty() {
            self.grants.apply_deltas(user_id, deltas).await?;
            self.balance_cache.invalidate(user_id).await;
        }
        if !receipt.is_complete() {
            tracing::warn!(
                %user_id,
                requested = %receipt.requested,
                restored = %receipt.restored_hours(),
                skipped = %receipt.skipped_hours(),
                unreturned = %receipt.unreturned,
                "reversal could not restore every hour"
            );
        } else {
            tracing::info!(
                %user_id,
                restored = %receipt.restored_hours(),
                "comp leave reversal restored all hours"
            );
        }
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grants::{InMemoryGrantStore, NewCompGrant};
    use crate::salary::RecordingBalanceCache;
    use crate::services::consumption::ConsumptionEngine;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    struct Fixture {
        store: Arc<InMemoryGrantStore>,
        cache: Arc<RecordingBalanceCache>,
        consumption: ConsumptionEngine,
        reversal: ReversalEngine,
        user: Uuid,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryGrantStore::new());
        let cache = Arc::new(RecordingBalanceCache::new());
        Fixture {
            consumption: ConsumptionEngine::new(store.clone(), cache.clone()),
            reversal: ReversalEngine::new(store.clone(), cache.clone()),
            store,
            cache,
            user: Uuid::new_v4(),
        }
    }

    async fn seed_grant(fx: &Fixture, hours: Decimal, generated: NaiveDate) -> crate::grants::CompGrant {
        fx.store
            .create_grant(NewCompGrant {
                user_id: fx.user,
                hours_granted: hours,
                original_rate: dec!(1.34),
                generated_date: generated,
                expiry_date: ymd(2024, 12, 31),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_reversal_restores_pre_consumption_state() {
        let fx = fixture();
        let g1 = seed_grant(&fx, dec!(10), ymd(2024, 1, 1)).await;
        let g2 = seed_grant(&fx, dec!(5), ymd(2024, 2, 1)).await;

        let allocations = fx.consumption.consume(fx.user, dec!(12)).await.unwrap();
        let receipt = fx
            .reversal
            .reverse_allocations(fx.user, &allocations)
            .await
            .unwrap();

        assert!(receipt.is_complete());
        assert_eq!(receipt.restored_hours(), dec!(12));

        let g1 = fx.store.find_grant(g1.id).await.unwrap().unwrap();
        assert_eq!(g1.hours_remaining, dec!(10));
        assert_eq!(g1.hours_used, dec!(0));
        assert_eq!(g1.status, GrantStatus::Active);

        let g2 = fx.store.find_grant(g2.id).await.unwrap().unwrap();
        assert_eq!(g2.hours_remaining, dec!(5));
        assert_eq!(g2.hours_used, dec!(0));
        assert_eq!(g2.status, GrantStatus::Active);
    }

    #[tokio::test]
    async fn test_partial_reversal_touches_only_recorded_grants() {
        let fx = fixture();
        seed_grant(&fx, dec!(10), ymd(2024, 1, 1)).await;
        let g2 = seed_grant(&fx, dec!(5), ymd(2024, 2, 1)).await;

        // Two separate leave records; only the second is cancelled.
        let first = fx.consumption.consume(fx.user, dec!(10)).await.unwrap();
        let second = fx.consumption.consume(fx.user, dec!(3)).await.unwrap();
        assert_eq!(second[0].grant_id, g2.id);

        let receipt = fx
            .reversal
            .reverse_allocations(fx.user, &second)
            .await
            .unwrap();
        assert!(receipt.is_complete());

        let g2 = fx.store.find_grant(g2.id).await.unwrap().unwrap();
        assert_eq!(g2.hours_used, dec!(0));
        assert_eq!(g2.hours_remaining, dec!(5));

        // The first record's debit is untouched.
        let g1 = fx.store.find_grant(first[0].grant_id).await.unwrap().unwrap();
        assert_eq!(g1.hours_used, dec!(10));
        assert_eq!(g1.status, GrantStatus::FullyUsed);
    }

    #[tokio::test]
    async fn test_reversal_after_expiry_reports_skipped_credit() {
        let fx = fixture();
        let g1 = seed_grant(&fx, dec!(10), ymd(2024, 1, 1)).await;
        let g2 = seed_grant(&fx, dec!(5), ymd(2024, 2, 1)).await;

        let allocations = fx.consumption.consume(fx.user, dec!(12)).await.unwrap();

        // The expiry batch sweeps g2's leftover 3 hours.
        let g2_current = fx.store.find_grant(g2.id).await.unwrap().unwrap();
        fx.store
            .expire_grant(g2.id, g2_current.hours_remaining)
            .await
            .unwrap();

        let receipt = fx
            .reversal
            .reverse_allocations(fx.user, &allocations)
            .await
            .unwrap();

        assert!(!receipt.is_complete());
        assert_eq!(receipt.restored_hours(), dec!(10));
        assert_eq!(
            receipt.skipped,
            vec![SkippedCredit {
                grant_id: g2.id,
                hours: dec!(2),
                reason: SkipReason::GrantExpired,
            }]
        );

        // The restorable credit landed; the expired grant is untouched.
        let g1 = fx.store.find_grant(g1.id).await.unwrap().unwrap();
        assert_eq!(g1.hours_used, dec!(0));
        let g2 = fx.store.find_grant(g2.id).await.unwrap().unwrap();
        assert_eq!(g2.status, GrantStatus::Expired);
        assert_eq!(g2.hours_used, dec!(2));
        assert_eq!(g2.hours_remaining, dec!(3));
    }

    #[tokio::test]
    async fn test_reversal_clamps_credit_to_used_hours() {
        let fx = fixture();
        let grant = seed_grant(&fx, dec!(10), ymd(2024, 1, 1)).await;
        fx.consumption.consume(fx.user, dec!(3)).await.unwrap();

        // A stale record claims 5 hours came from this grant.
        let stale = vec![GrantAllocation {
            grant_id: grant.id,
            hours: dec!(5),
        }];
        let receipt = fx
            .reversal
            .reverse_allocations(fx.user, &stale)
            .await
            .unwrap();

        assert_eq!(receipt.restored_hours(), dec!(3));
        assert_eq!(
            receipt.skipped,
            vec![SkippedCredit {
                grant_id: grant.id,
                hours: dec!(2),
                reason: SkipReason::ExceedsUsedHours,
            }]
        );

        let grant = fx.store.find_grant(grant.id).await.unwrap().unwrap();
        assert_eq!(grant.hours_used, dec!(0));
    }

    #[tokio::test]
    async fn test_reversal_reports_missing_grant() {
        let fx = fixture();
        seed_grant(&fx, dec!(4), ymd(2024, 1, 1)).await;

        let bogus = vec![GrantAllocation {
            grant_id: Uuid::new_v4(),
            hours: dec!(2),
        }];
        let receipt = fx
            .reversal
            .reverse_allocations(fx.user, &bogus)
            .await
            .unwrap();
        assert_eq!(receipt.restored_hours(), dec!(0));
        assert_eq!(receipt.skipped[0].reason, SkipReason::GrantMissing);
        // Nothing restored, so the cache was not told to invalidate.
        assert!(fx.cache.invalidations().await.is_empty());
    }

    #[tokio::test]
    async fn test_fifo_fallback_round_trips() {
        let fx = fixture();
        let g1 = seed_grant(&fx, dec!(10), ymd(2024, 1, 1)).await;
        let g2 = seed_grant(&fx, dec!(5), ymd(2024, 2, 1)).await;
        fx.consumption.consume(fx.user, dec!(12)).await.unwrap();

        let receipt = fx.reversal.reverse_fifo(fx.user, dec!(12)).await.unwrap();
        assert!(receipt.is_complete());
        assert_eq!(
            receipt.restored,
            vec![
                GrantAllocation {
                    grant_id: g1.id,
                    hours: dec!(10)
                },
                GrantAllocation {
                    grant_id: g2.id,
                    hours: dec!(2)
                },
            ]
        );

        let g1 = fx.store.find_grant(g1.id).await.unwrap().unwrap();
        assert_eq!((g1.hours_used, g1.hours_remaining), (dec!(0), dec!(10)));
        assert_eq!(g1.status, GrantStatus::Active);
    }

    #[tokio::test]
    async fn test_fifo_fallback_credits_oldest_first() {
        let fx = fixture();
        let g1 = seed_grant(&fx, dec!(10), ymd(2024, 1, 1)).await;
        let g2 = seed_grant(&fx, dec!(5), ymd(2024, 2, 1)).await;
        fx.consumption.consume(fx.user, dec!(12)).await.unwrap();

        let receipt = fx.reversal.reverse_fifo(fx.user, dec!(4)).await.unwrap();
        assert!(receipt.is_complete());
        assert_eq!(receipt.restored.len(), 1);
        assert_eq!(receipt.restored[0].grant_id, g1.id);

        let g1 = fx.store.find_grant(g1.id).await.unwrap().unwrap();
        assert_eq!(g1.hours_used, dec!(6));
        let g2 = fx.store.find_grant(g2.id).await.unwrap().unwrap();
        assert_eq!(g2.hours_used, dec!(2));
    }

    #[tokio::test]
    async fn test_fifo_fallback_reports_unreturned_hours() {
        let fx = fixture();
        seed_grant(&fx, dec!(10), ymd(2024, 1, 1)).await;
        fx.consumption.consume(fx.user, dec!(4)).await.unwrap();

        let receipt = fx.reversal.reverse_fifo(fx.user, dec!(6)).await.unwrap();
        assert!(!receipt.is_complete());
        assert_eq!(receipt.restored_hours(), dec!(4));
        assert_eq!(receipt.unreturned, dec!(2));
    }

    #[tokio::test]
    async fn test_reversal_validates_hours() {
        let fx = fixture();
        seed_grant(&fx, dec!(4), ymd(2024, 1, 1)).await;

        let err = fx
            .reversal
            .reverse_fifo(fx.user, dec!(1.25))
            .await
            .unwrap_err();
        assert!(err.is_validation());

        let bad = vec![GrantAllocation {
            grant_id: Uuid::new_v4(),
            hours: dec!(-2),
        }];
        let err = fx
            .reversal
            .reverse_allocations(fx.user, &bad)
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }
}
