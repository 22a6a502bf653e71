//! Salary lookup against the employees table.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tabula_comp_leave::error::Result;
use tabula_comp_leave::salary::SalaryDirectory;
use tabula_db::models::Employee;
use uuid::Uuid;

/// [`SalaryDirectory`] reading the employee directory projection.
#[derive(Clone)]
pub struct PgSalaryDirectory {
    pool: PgPool,
}

impl PgSalaryDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SalaryDirectory for PgSalaryDirectory {
    async fn monthly_base_salary(&self, user_id: Uuid) -> Result<Option<Decimal>> {
        Ok(Employee::monthly_base_salary(&self.pool, user_id).await?)
    }
}
