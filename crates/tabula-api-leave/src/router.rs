//! Router assembly and shared state for the comp-leave API.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::{middleware, Extension, Router};
use sqlx::PgPool;
use tabula_auth::{jwt_auth_middleware, JwtSecret};
use tabula_comp_leave::clock::Clock;
use tabula_comp_leave::executions::ExecutionLogStore;
use tabula_comp_leave::grants::GrantStore;
use tabula_comp_leave::salary::BalanceCache;
use tabula_comp_leave::services::{BalanceProjector, ExpiryConverter};

use crate::handlers;
use crate::jobs::CompLeaveExpiryJob;
use crate::services::{
    PgExecutionLogStore, PgGrantStore, PgPayRecordStore, PgSalaryDirectory,
};

/// Shared state for the comp-leave handlers.
#[derive(Clone)]
pub struct LeaveState {
    pub grants: Arc<dyn GrantStore>,
    pub balance: BalanceProjector,
    pub executions: Arc<dyn ExecutionLogStore>,
    pub expiry_job: Arc<CompLeaveExpiryJob>,
}

impl LeaveState {
    /// Wire the Postgres-backed stores and the expiry job over one pool.
    pub fn new(pool: PgPool, clock: Arc<dyn Clock>, balance_cache: Arc<dyn BalanceCache>) -> Self {
        let grants: Arc<dyn GrantStore> = Arc::new(PgGrantStore::new(pool.clone()));
        let executions: Arc<dyn ExecutionLogStore> =
            Arc::new(PgExecutionLogStore::new(pool.clone()));
        let converter = ExpiryConverter::new(
            grants.clone(),
            Arc::new(PgPayRecordStore::new(pool.clone())),
            executions.clone(),
            Arc::new(PgSalaryDirectory::new(pool)),
            balance_cache,
            clock,
        );
        Self {
            balance: BalanceProjector::new(grants.clone()),
            grants,
            executions,
            expiry_job: Arc::new(CompLeaveExpiryJob::new(converter)),
        }
    }
}

/// The comp-leave API router; every route sits behind the JWT middleware.
pub fn leave_router(state: LeaveState, secret: JwtSecret) -> Router {
    Router::new()
        .route("/cron/execute", post(handlers::execute_job))
        .route("/cron/history", get(handlers::job_history))
        .route(
            "/comp-leave/grants",
            post(handlers::create_grant).get(handlers::list_grants),
        )
        .route("/comp-leave/balance/:user_id", get(handlers::user_balance))
        .layer(middleware::from_fn(jwt_auth_middleware))
        .layer(Extension(secret))
        .with_state(state)
}
