//! Comp-hour grant storage.
//!
//! A grant is a block of comp hours earned from overtime, carrying the
//! overtime multiplier in effect when the hours were earned. Grants are
//! created by the upstream timesheet process and mutated only through the
//! ledger engines; they are never hard-deleted.
//!
//! [`GrantStore`] is the single source of truth for grant state. The
//! in-memory implementation backs unit tests; the Postgres-backed
//! implementation lives in the API crate.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{LedgerError, Result};
use crate::types::GrantStatus;

/// A compensatory-leave hour grant.
///
/// Invariant: `hours_used + hours_remaining == hours_granted` at all times,
/// with both fields non-negative. `status` is derived from the counters via
/// [`GrantStatus::derive`], except the terminal `expired` state which only
/// the expiry converter enters. An expired grant keeps its remaining hours
/// for audit; they are simply no longer allocatable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompGrant {
    pub id: Uuid,
    pub user_id: Uuid,
    pub hours_granted: Decimal,
    pub hours_used: Decimal,
    pub hours_remaining: Decimal,
    /// Overtime multiplier in effect when the hours were earned (e.g. 1.34).
    pub original_rate: Decimal,
    /// Date the overtime was worked; FIFO consumption orders by this.
    pub generated_date: NaiveDate,
    /// Last day the hours may be taken as leave. Always a month-end; the
    /// expiry batch for that month sweeps whatever is left.
    pub expiry_date: NaiveDate,
    pub status: GrantStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a grant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCompGrant {
    pub user_id: Uuid,
    pub hours_granted: Decimal,
    pub original_rate: Decimal,
    pub generated_date: NaiveDate,
    pub expiry_date: NaiveDate,
}

impl NewCompGrant {
    /// Validate the input before persistence.
    pub fn validate(&self) -> Result<()> {
        if self.hours_granted <= Decimal::ZERO {
            return Err(LedgerError::Validation(
                "hours_granted must be positive".into(),
            ));
        }
        if !crate::is_half_hour_multiple(self.hours_granted) {
            return Err(LedgerError::Validation(
                "hours_granted must be a multiple of 0.5".into(),
            ));
        }
        if self.original_rate <= Decimal::ZERO {
            return Err(LedgerError::Validation(
                "original_rate must be positive".into(),
            ));
        }
        if self.expiry_date < self.generated_date {
            return Err(LedgerError::Validation(
                "expiry_date must not precede generated_date".into(),
            ));
        }
        Ok(())
    }
}

/// One conserving mutation of a grant's hour counters.
///
/// `used_delta + remaining_delta` must be zero: hours move between the two
/// counters, they are never created or destroyed by a delta.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrantDelta {
    pub grant_id: Uuid,
    pub used_delta: Decimal,
    pub remaining_delta: Decimal,
}

impl GrantDelta {
    /// Consume `hours` from the grant.
    pub fn debit(grant_id: Uuid, hours: Decimal) -> Self {
        Self {
            grant_id,
            used_delta: hours,
            remaining_delta: -hours,
        }
    }

    /// Return `hours` to the grant.
    pub fn credit(grant_id: Uuid, hours: Decimal) -> Self {
        Self {
            grant_id,
            used_delta: -hours,
            remaining_delta: hours,
        }
    }
}

/// Result of the compare-and-set transition to `expired`.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpireOutcome {
    /// The grant was expired with the expected remaining hours.
    Expired(CompGrant),
    /// The grant changed since it was read (consumed, already expired, or
    /// drained); current state returned so the caller can replan.
    Conflict(CompGrant),
    /// No such grant.
    NotFound,
}

/// Persistence and ordered retrieval of comp-hour grants.
#[async_trait]
pub trait GrantStore: Send + Sync {
    /// Persist a new grant. Validates the input; new grants start with
    /// `hours_used = 0` and status `active`.
    async fn create_grant(&self, input: NewCompGrant) -> Result<CompGrant>;

    /// Fetch one grant.
    async fn find_grant(&self, grant_id: Uuid) -> Result<Option<CompGrant>>;

    /// Grants the user can still draw on (`active`/`partially_used`),
    /// ordered ascending by `generated_date`, ties broken by insertion
    /// order. This is the FIFO consumption order.
    async fn active_grants_for_user(&self, user_id: Uuid) -> Result<Vec<CompGrant>>;

    /// All of the user's grants regardless of status, in FIFO order.
    async fn grants_for_user(&self, user_id: Uuid) -> Result<Vec<CompGrant>>;

    /// Apply a set of conserving deltas as one atomic unit: either every
    /// delta lands or none does. Rejects deltas that violate conservation
    /// (`Validation`), touch another user's or a missing grant
    /// (`Validation`/`GrantNotFound`), touch an expired grant or would drive
    /// a counter negative (`Conflict`, so optimistic callers can replan).
    /// Status is recomputed from the resulting counters.
    async fn apply_deltas(&self, user_id: Uuid, deltas: &[GrantDelta]) -> Result<Vec<CompGrant>>;

    /// Grants lapsing exactly at `cutoff` that still hold allocatable hours:
    /// `expiry_date == cutoff AND status ∈ {active, partially_used} AND
    /// hours_remaining > 0`. Ordered by user, then FIFO.
    async fn expiring_grants(&self, cutoff: NaiveDate) -> Result<Vec<CompGrant>>;

    /// Transition a grant to terminal `expired`, guarded by the remaining
    /// hours the caller priced the payout against. Remaining hours are not
    /// zeroed. Only `active`/`partially_used` grants with the expected
    /// remaining qualify; anything else reports a conflict.
    async fn expire_grant(
        &self,
        grant_id: Uuid,
        expected_remaining: Decimal,
    ) -> Result<ExpireOutcome>;
}

/// In-memory [`GrantStore`] for tests.
#[derive(Debug, Default)]
pub struct InMemoryGrantStore {
    inner: RwLock<GrantMap>,
}

#[derive(Debug, Default)]
struct GrantMap {
    grants: HashMap<Uuid, CompGrant>,
    /// Creation order; the FIFO tie-break for equal generated dates.
    insertion: Vec<Uuid>,
}

impl InMemoryGrantStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored grants.
    pub async fn count(&self) -> usize {
        self.inner.read().await.grants.len()
    }

    /// Remove all grants.
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.grants.clear();
        inner.insertion.clear();
    }
}

impl GrantMap {
    /// User's grants in insertion order, then stable-sorted by generated
    /// date so ties keep insertion order.
    fn fifo_for_user(&self, user_id: Uuid) -> Vec<CompGrant> {
        let mut grants: Vec<CompGrant> = self
            .insertion
            .iter()
            .filter_map(|id| self.grants.get(id))
            .filter(|g| g.user_id == user_id)
            .cloned()
            .collect();
        grants.sort_by_key(|g| g.generated_date);
        grants
    }
}

#[async_trait]
impl GrantStore for InMemoryGrantStore {
    async fn create_grant(&self, input: NewCompGrant) -> Result<CompGrant> {
        input.validate()?;
        let now = Utc::now();
        let grant = CompGrant {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            hours_granted: input.hours_granted,
            hours_used: Decimal::ZERO,
            hours_remaining: input.hours_granted,
            original_rate: input.original_rate,
            generated_date: input.generated_date,
            expiry_date: input.expiry_date,
            status: GrantStatus::Active,
            created_at: now,
            updated_at: now,
        };
        let mut inner = self.inner.write().await;
        inner.insertion.push(grant.id);
        inner.grants.insert(grant.id, grant.clone());
        Ok(grant)
    }

    async fn find_grant(&self, grant_id: Uuid) -> Result<Option<CompGrant>> {
        Ok(self.inner.read().await.grants.get(&grant_id).cloned())
    }

    async fn active_grants_for_user(&self, user_id: Uuid) -> Result<Vec<CompGrant>> {
        let inner = self.inner.read().await;
        Ok(inner
            .fifo_for_user(user_id)
            .into_iter()
            .filter(|g| g.status.is_allocatable())
            .collect())
    }

    async fn grants_for_user(&self, user_id: Uuid) -> Result<Vec<CompGrant>> {
        Ok(self.inner.read().await.fifo_for_user(user_id))
    }

    async fn apply_deltas(&self, user_id: Uuid, deltas: &[GrantDelta]) -> Result<Vec<CompGrant>> {
        if deltas.is_empty() {
            return Ok(Vec::new());
        }
        let mut inner = self.inner.write().await;

        // Stage every delta against current state first; nothing is mutated
        // until the whole set checks out.
        let mut staged: HashMap<Uuid, (Decimal, Decimal)> = HashMap::new();
        for delta in deltas {
            let grant = inner
                .grants
                .get(&delta.grant_id)
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
            if delta.used_delta + delta.remaining_delta != Decimal::ZERO {
                return Err(LedgerError::Validation(format!(
                    "Delta for grant {} violates hour conservation",
                    delta.grant_id
                )));
            }
            let (used, remaining) = staged
                .get(&delta.grant_id)
                .copied()
                .unwrap_or((grant.hours_used, grant.hours_remaining));
            let new_used = used + delta.used_delta;
            let new_remaining = remaining + delta.remaining_delta;
            if new_used < Decimal::ZERO || new_remaining < Decimal::ZERO {
                return Err(LedgerError::Conflict(format!(
                    "Delta for grant {} would drive an hour counter negative",
                    delta.grant_id
                )));
            }
            staged.insert(delta.grant_id, (new_used, new_remaining));
        }

        let now = Utc::now();
        let mut updated = Vec::with_capacity(staged.len());
        let mut seen: Vec<Uuid> = Vec::with_capacity(staged.len());
        for delta in deltas {
            if seen.contains(&delta.grant_id) {
                continue;
            }
            seen.push(delta.grant_id);
            let (new_used, new_remaining) = staged[&delta.grant_id];
            let grant = inner
                .grants
                .get_mut(&delta.grant_id)
                .expect("staged grant exists");
            grant.hours_used = new_used;
            grant.hours_remaining = new_remaining;
            grant.status = GrantStatus::derive(new_used, new_remaining);
            grant.updated_at = now;
            updated.push(grant.clone());
        }
        Ok(updated)
    }

    async fn expiring_grants(&self, cutoff: NaiveDate) -> Result<Vec<CompGrant>> {
        let inner = self.inner.read().await;
        let mut grants: Vec<CompGrant> = inner
            .insertion
            .iter()
            .filter_map(|id| inner.grants.get(id))
            .filter(|g| {
                g.expiry_date == cutoff
                    && g.status.is_allocatable()
                    && g.hours_remaining > Decimal::ZERO
            })
            .cloned()
            .collect();
        grants.sort_by_key(|g| (g.user_id, g.generated_date));
        Ok(grants)
    }

    async fn expire_grant(
        &self,
        grant_id: Uuid,
        expected_remaining: Decimal,
    ) -> Result<ExpireOutcome> {
        let mut inner = self.inner.write().await;
        let Some(grant) = inner.grants.get_mut(&grant_id) else {
            return Ok(ExpireOutcome::NotFound);
        };
        let eligible = grant.status.is_allocatable()
            && grant.hours_remaining > Decimal::ZERO
            && grant.hours_remaining == expected_remaining;
        if !eligible {
            return Ok(ExpireOutcome::Conflict(grant.clone()));
        }
        grant.status = GrantStatus::Expired;
        grant.updated_at = Utc::now();
        Ok(ExpireOutcome::Expired(grant.clone()))
    }
}
