//! Employee directory projection.
//!
//! The ops platform owns the full employee record elsewhere; the ledger's
//! schema carries only what the expiry conversion needs, chiefly the
//! monthly base salary.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// An employee row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Employee {
    pub id: Uuid,
    pub display_name: String,
    pub monthly_base_salary: Option<Decimal>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an employee row.
#[derive(Debug, Clone)]
pub struct CreateEmployee {
    pub display_name: String,
    pub monthly_base_salary: Option<Decimal>,
}

impl Employee {
    /// Create a new employee.
    pub async fn create(pool: &PgPool, input: &CreateEmployee) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            r"
            INSERT INTO employees (display_name, monthly_base_salary)
            VALUES ($1, $2)
            RETURNING *
            ",
        )
        .bind(&input.display_name)
        .bind(input.monthly_base_salary)
        .fetch_one(pool)
        .await
    }

    /// Find an employee by ID.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM employees WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Monthly base salary for an employee, if the row exists and carries
    /// one.
    pub async fn monthly_base_salary(
        pool: &PgPool,
        id: Uuid,
    ) -> Result<Option<Decimal>, sqlx::Error> {
        let salary: Option<Option<Decimal>> =
            sqlx::query_scalar("SELECT monthly_base_salary FROM employees WHERE id = $1")
                .bind(id)
                .fetch_optional(pool)
                .await?;
        Ok(salary.flatten())
    }
}
