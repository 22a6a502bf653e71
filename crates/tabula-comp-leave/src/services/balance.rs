//! Read-only projection of a user's available comp hours.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::Result;
use crate::grants::GrantStore;

/// Projects the currently available comp-hour balance from grant state.
///
/// The balance is the sum of `hours_remaining` over the user's
/// `active`/`partially_used` grants; expired and drained grants contribute
/// nothing. The projector never mutates anything; the engines invalidate the
/// external cache after their writes so this read stays consistent.
#[derive(Clone)]
pub struct BalanceProjector {
    grants: Arc<dyn GrantStore>,
}

impl BalanceProjector {
    pub fn new(grants: Arc<dyn GrantStore>) -> Self {
        Self { grants }
    }

    /// The user's available comp hours.
    pub async fn balance(&self, user_id: Uuid) -> Result<Decimal> {
        let grants = self.grants.active_grants_for_user(user_id).await?;
        Ok(grants.iter().map(|g| g.hours_remaining).sum())
    }

    /// Balances for a set of users, for dashboard-style bulk reads.
    pub async fn balances(&self, user_ids: &[Uuid]) -> Result<HashMap<Uuid, Decimal>> {
        let mut out = HashMap::with_capacity(user_ids.len());
        for &user_id in user_ids {
            out.insert(user_id, self.balance(user_id).await?);
        }
        Ok(out)
    }
}
