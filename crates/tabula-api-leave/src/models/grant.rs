//! DTOs for the grant ingestion, listing, and balance endpoints.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tabula_comp_leave::grants::{CompGrant, NewCompGrant};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Body for `POST /comp-leave/grants`. Hour and rate constraints are
/// enforced by the ledger's own validation.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateGrantRequest {
    pub user_id: Uuid,
    /// Comp hours earned; positive multiple of 0.5.
    pub hours_granted: Decimal,
    /// Overtime multiplier in effect when the hours were earned.
    pub original_rate: Decimal,
    /// Date the overtime was worked.
    pub generated_date: NaiveDate,
    /// Last day the hours may be taken as leave.
    pub expiry_date: NaiveDate,
}

impl From<CreateGrantRequest> for NewCompGrant {
    fn from(req: CreateGrantRequest) -> Self {
        Self {
            user_id: req.user_id,
            hours_granted: req.hours_granted,
            original_rate: req.original_rate,
            generated_date: req.generated_date,
            expiry_date: req.expiry_date,
        }
    }
}

/// Query for `GET /comp-leave/grants`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct GrantListQuery {
    pub user_id: Uuid,
}

/// One grant on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GrantResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub hours_granted: Decimal,
    pub hours_used: Decimal,
    pub hours_remaining: Decimal,
    pub original_rate: Decimal,
    pub generated_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CompGrant> for GrantResponse {
    fn from(grant: CompGrant) -> Self {
        Self {
            id: grant.id,
            user_id: grant.user_id,
            hours_granted: grant.hours_granted,
            hours_used: grant.hours_used,
            hours_remaining: grant.hours_remaining,
            original_rate: grant.original_rate,
            generated_date: grant.generated_date,
            expiry_date: grant.expiry_date,
            status: grant.status.to_string(),
            created_at: grant.created_at,
            updated_at: grant.updated_at,
        }
    }
}

/// A user's grants in FIFO order.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GrantListResponse {
    pub items: Vec<GrantResponse>,
    pub total: i64,
}

/// Response for `GET /comp-leave/balance/{user_id}`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BalanceResponse {
    pub user_id: Uuid,
    /// Sum of remaining hours over the user's allocatable grants.
    pub balance_hours: Decimal,
}
