//! External collaborator seams: the employee directory and the balance
//! cache.
//!
//! The ledger does not own employee data or the read cache; it consumes the
//! salary lookup and notifies the cache after mutations.

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::Result;

/// Salary lookup against the employee directory.
#[async_trait]
pub trait SalaryDirectory: Send + Sync {
    /// Monthly base salary for the user, if the directory knows them.
    async fn monthly_base_salary(&self, user_id: Uuid) -> Result<Option<Decimal>>;
}

/// In-memory [`SalaryDirectory`] for tests.
#[derive(Debug, Default)]
pub struct InMemorySalaryDirectory {
    salaries: RwLock<HashMap<Uuid, Decimal>>,
}

impl InMemorySalaryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_salary(&self, user_id: Uuid, monthly_base_salary: Decimal) {
        self.salaries
            .write()
            .await
            .insert(user_id, monthly_base_salary);
    }
}

#[async_trait]
impl SalaryDirectory for InMemorySalaryDirectory {
    async fn monthly_base_salary(&self, user_id: Uuid) -> Result<Option<Decimal>> {
        Ok(self.salaries.read().await.get(&user_id).copied())
    }
}

/// Invalidation hook for the external balance cache.
///
/// Engines call this after every successful consumption, reversal, or
/// expiry so stale balances are never served. The cache itself lives
/// outside the ledger.
#[async_trait]
pub trait BalanceCache: Send + Sync {
    async fn invalidate(&self, user_id: Uuid);
}

/// Default no-op cache hook.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBalanceCache;

#[async_trait]
impl BalanceCache for NoopBalanceCache {
    async fn invalidate(&self, _user_id: Uuid) {}
}

/// Cache double recording every invalidation, for asserting notification
/// behavior in tests.
#[derive(Debug, Default)]
pub struct RecordingBalanceCache {
    invalidated: RwLock<Vec<Uuid>>,
}

impl RecordingBalanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn invalidations(&self) -> Vec<Uuid> {
        self.invalidated.read().await.clone()
    }
}

#[async_trait]
impl BalanceCache for RecordingBalanceCache {
    async fn invalidate(&self, user_id: Uuid) {
        self.invalidated.write().await.push(user_id);
    }
}
