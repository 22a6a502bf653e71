//! Grant ingestion, listing, and balance endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use tabula_auth::AuthClaims;
use uuid::Uuid;

use super::{require_admin, require_self_or_admin};
use crate::error::{ApiResult, ErrorResponse};
use crate::models::{
    BalanceResponse, CreateGrantRequest, GrantListQuery, GrantListResponse, GrantResponse,
};
use crate::router::LeaveState;

/// Record a comp-hour grant.
///
/// Ingestion surface for the upstream overtime process and manual backfill.
#[utoipa::path(
    post,
    path = "/comp-leave/grants",
    tag = "comp-leave",
    request_body = CreateGrantRequest,
    responses(
        (status = 201, description = "Grant recorded", body = GrantResponse),
        (status = 400, description = "Invalid hours, rate, or dates", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_grant(
    State(state): State<LeaveState>,
    Extension(claims): Extension<AuthClaims>,
    Json(request): Json<CreateGrantRequest>,
) -> ApiResult<(StatusCode, Json<GrantResponse>)> {
    require_admin(&claims)?;
    let grant = state.grants.create_grant(request.into()).await?;
    Ok((StatusCode::CREATED, Json(grant.into())))
}

/// A user's grants, oldest first.
#[utoipa::path(
    get,
    path = "/comp-leave/grants",
    tag = "comp-leave",
    params(GrantListQuery),
    responses(
        (status = 200, description = "Grants in consumption order", body = GrantListResponse),
        (status = 403, description = "Not your grants", body = ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_grants(
    State(state): State<LeaveState>,
    Extension(claims): Extension<AuthClaims>,
    Query(query): Query<GrantListQuery>,
) -> ApiResult<Json<GrantListResponse>> {
    require_self_or_admin(&claims, query.user_id)?;
    let grants = state.grants.grants_for_user(query.user_id).await?;
    let total = grants.len() as i64;
    Ok(Json(GrantListResponse {
        items: grants.into_iter().map(GrantResponse::from).collect(),
        total,
    }))
}

/// The user's available comp-hour balance.
#[utoipa::path(
    get,
    path = "/comp-leave/balance/{user_id}",
    tag = "comp-leave",
    params(("user_id" = Uuid, Path, description = "User to read the balance for")),
    responses(
        (status = 200, description = "Available hours", body = BalanceResponse),
        (status = 403, description = "Not your balance", body = ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn user_balance(
    State(state): State<LeaveState>,
    Extension(claims): Extension<AuthClaims>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<BalanceResponse>> {
    require_self_or_admin(&claims, user_id)?;
    let balance_hours = state.balance.balance(user_id).await?;
    Ok(Json(BalanceResponse {
        user_id,
        balance_hours,
    }))
}
