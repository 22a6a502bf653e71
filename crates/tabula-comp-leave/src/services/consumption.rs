//! FIFO debit of comp-hour grants when leave is taken.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{LedgerError, Result};
use crate::grants::{CompGrant, GrantDelta, GrantStore};
use crate::salary::BalanceCache;
use crate::types::GrantAllocation;

use super::{ensure_valid_request_hours, MAX_CONFLICT_RETRIES};

/// Walk FIFO-ordered grants and split `hours` across them oldest-first.
///
/// Pure planning step: takes `min(remaining, outstanding)` from each grant
/// until the request is covered. Callers must have verified that the total
/// remaining covers `hours`.
pub fn plan_consumption(grants: &[CompGrant], hours: Decimal) -> Vec<GrantAllocation> {
    let mut outstanding = hours;
    let mut allocations = Vec::new();
    for grant in grants {
        if outstanding.is_zero() {
            break;
        }
        let take = grant.hours_remaining.min(outstanding);
        if take > Decimal::ZERO {
            allocations.push(GrantAllocation {
                grant_id: grant.id,
                hours: take,
            });
            outstanding -= take;
        }
    }
    allocations
}

/// Debits grants in strict earliest-first order when comp leave is taken.
#[derive(Clone)]
pub struct ConsumptionEngine {
    grants: Arc<dyn GrantStore>,
    balance_cache: Arc<dyn BalanceCache>,
}

impl ConsumptionEngine {
    pub fn new(grants: Arc<dyn GrantStore>, balance_cache: Arc<dyn BalanceCache>) -> Self {
        Self {
            grants,
            balance_cache,
        }
    }

    /// Consume `hours` of comp leave for the user.
    ///
    /// Fails with `InsufficientBalance` (reporting the available total) when
    /// the request cannot be fully funded; nothing is mutated in that case.
    /// Returns the per-grant allocations, to be recorded alongside the leave
    /// request so a later reversal can replay them exactly.
    #[instrument(skip(self))]
    pub async fn consume(&self, user_id: Uuid, hours: Decimal) -> Result<Vec<GrantAllocation>> {
        ensure_valid_request_hours(hours)?;

        let mut attempt = 0;
        loop {
            let grants = self.grants.active_grants_for_user(user_id).await?;
            let available: Decimal = grants.iter().map(|g| g.hours_remaining).sum();
            if available < hours {
                return Err(LedgerError::InsufficientBalance {
                    requested: hours,
                    available,
                });
            }

            let allocations = plan_consumption(&grants, hours);
            let deltas: Vec<GrantDelta> = allocations
                .iter()
                .map(|a| GrantDelta::debit(a.grant_id, a.hours))
                .collect();

            match self.grants.apply_deltas(user_id, &deltas).await {
                Ok(_) => {
                    self.balance_cache.invalidate(user_id).await;
                    tracing::info!(
                        %user_id,
                        %hours,
                        grants = allocations.len(),
                        "comp leave consumed"
                    );
                    return Ok(allocations);
                }
                Err(err) if err.is_conflict() && attempt < MAX_CONFLICT_RETRIES => {
                    attempt += 1;
                    tracing::debug!(
                        %user_id,
                        attempt,
                        "consumption raced with a concurrent update, replanning"
                    );
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grants::{InMemoryGrantStore, NewCompGrant};
    use crate::salary::RecordingBalanceCache;
    use crate::types::GrantStatus;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    struct Fixture {
        store: Arc<InMemoryGrantStore>,
        cache: Arc<RecordingBalanceCache>,
        engine: ConsumptionEngine,
        user: Uuid,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryGrantStore::new());
        let cache = Arc::new(RecordingBalanceCache::new());
        let engine = ConsumptionEngine::new(store.clone(), cache.clone());
        Fixture {
            store,
            cache,
            engine,
            user: Uuid::new_v4(),
        }
    }

    async fn seed_grant(
        fx: &Fixture,
        hours: Decimal,
        generated: NaiveDate,
    ) -> crate::grants::CompGrant {
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
    async fn test_fifo_allocation_spans_grants_oldest_first() {
        let fx = fixture();
        let g1 = seed_grant(&fx, dec!(10), ymd(2024, 1, 1)).await;
        let g2 = seed_grant(&fx, dec!(5), ymd(2024, 2, 1)).await;

        let allocations = fx.engine.consume(fx.user, dec!(12)).await.unwrap();
        assert_eq!(
            allocations,
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
        assert_eq!(g1.hours_remaining, dec!(0));
        assert_eq!(g1.status, GrantStatus::FullyUsed);

        let g2 = fx.store.find_grant(g2.id).await.unwrap().unwrap();
        assert_eq!(g2.hours_remaining, dec!(3));
        assert_eq!(g2.status, GrantStatus::PartiallyUsed);
    }

    #[tokio::test]
    async fn test_insufficient_balance_leaves_grants_untouched() {
        let fx = fixture();
        let g1 = seed_grant(&fx, dec!(10), ymd(2024, 1, 1)).await;
        let g2 = seed_grant(&fx, dec!(5), ymd(2024, 2, 1)).await;

        let err = fx.engine.consume(fx.user, dec!(16)).await.unwrap_err();
        let LedgerError::InsufficientBalance {
            requested,
            available,
        } = err
        else {
            panic!("expected insufficient balance");
        };
        assert_eq!(requested, dec!(16));
        assert_eq!(available, dec!(15));

        assert_eq!(fx.store.find_grant(g1.id).await.unwrap().unwrap(), g1);
        assert_eq!(fx.store.find_grant(g2.id).await.unwrap().unwrap(), g2);
        assert!(fx.cache.invalidations().await.is_empty());
    }

    #[tokio::test]
    async fn test_zero_grant_user_fails_with_zero_available() {
        let fx = fixture();
        let err = fx.engine.consume(fx.user, dec!(0.5)).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientBalance { available, .. } if available == dec!(0)
        ));
    }

    #[tokio::test]
    async fn test_rejects_invalid_hour_requests() {
        let fx = fixture();
        seed_grant(&fx, dec!(10), ymd(2024, 1, 1)).await;

        for bad in [dec!(0), dec!(-1), dec!(1.25), dec!(0.3)] {
            let err = fx.engine.consume(fx.user, bad).await.unwrap_err();
            assert!(err.is_validation(), "expected validation error for {bad}");
        }

        // No mutation happened.
        let grants = fx.store.active_grants_for_user(fx.user).await.unwrap();
        assert_eq!(grants[0].hours_used, dec!(0));
        assert!(fx.cache.invalidations().await.is_empty());
    }

    #[tokio::test]
    async fn test_exact_exhaustion_flips_to_fully_used() {
        let fx = fixture();
        let grant = seed_grant(&fx, dec!(8), ymd(2024, 1, 1)).await;

        fx.engine.consume(fx.user, dec!(8)).await.unwrap();
        let grant = fx.store.find_grant(grant.id).await.unwrap().unwrap();
        assert_eq!(grant.status, GrantStatus::FullyUsed);
        assert_eq!(grant.hours_used + grant.hours_remaining, grant.hours_granted);
    }

    #[tokio::test]
    async fn test_successful_consumption_notifies_balance_cache() {
        let fx = fixture();
        seed_grant(&fx, dec!(8), ymd(2024, 1, 1)).await;

        fx.engine.consume(fx.user, dec!(2)).await.unwrap();
        assert_eq!(fx.cache.invalidations().await, vec![fx.user]);
    }

    #[tokio::test]
    async fn test_consumption_skips_other_users_grants() {
        let fx = fixture();
        seed_grant(&fx, dec!(4), ymd(2024, 1, 1)).await;
        let other = Uuid::new_v4();
        fx.store
            .create_grant(NewCompGrant {
                user_id: other,
                hours_granted: dec!(40),
                original_rate: dec!(1),
                generated_date: ymd(2024, 1, 1),
                expiry_date: ymd(2024, 12, 31),
            })
            .await
            .unwrap();

        let err = fx.engine.consume(fx.user, dec!(5)).await.unwrap_err();
        assert!(err.is_insufficient_balance());
    }

    #[tokio::test]
    async fn test_concurrent_requests_never_overdraw() {
        let fx = fixture();
        seed_grant(&fx, dec!(10), ymd(2024, 1, 1)).await;

        let a = {
            let engine = fx.engine.clone();
            let user = fx.user;
            tokio::spawn(async move { engine.consume(user, dec!(8)).await })
        };
        let b = {
            let engine = fx.engine.clone();
            let user = fx.user;
            tokio::spawn(async move { engine.consume(user, dec!(8)).await })
        };

        let results = [a.await.unwrap(), b.await.unwrap()];
        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1, "exactly one racing request may win");

        let grants = fx.store.grants_for_user(fx.user).await.unwrap();
        assert_eq!(grants[0].hours_used, dec!(8));
        assert_eq!(grants[0].hours_remaining, dec!(2));
        assert_eq!(
            grants[0].hours_used + grants[0].hours_remaining,
            grants[0].hours_granted
        );
    }

    #[test]
    fn test_plan_consumption_takes_min_of_remaining_and_outstanding() {
        let user = Uuid::new_v4();
        let template = |hours: Decimal| CompGrant {
            id: Uuid::new_v4(),
            user_id: user,
            hours_granted: hours,
            hours_used: Decimal::ZERO,
            hours_remaining: hours,
            original_rate: dec!(1),
            generated_date: ymd(2024, 1, 1),
            expiry_date: ymd(2024, 12, 31),
            status: GrantStatus::Active,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        let grants = vec![template(dec!(3)), template(dec!(3))];

        let plan = plan_consumption(&grants, dec!(4.5));
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].hours, dec!(3));
        assert_eq!(plan[1].hours, dec!(1.5));

        let total: Decimal = plan.iter().map(|a| a.hours).sum();
        assert_eq!(total, dec!(4.5));

        // A covered request stops walking early.
        let plan = plan_consumption(&grants, dec!(2));
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].grant_id, grants[0].id);
    }
}
