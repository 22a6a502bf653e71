//! Manual batch trigger and run-history endpoints.

use axum::extract::{Query, State};
use axum::{Extension, Json};
use tabula_auth::AuthClaims;
use tabula_comp_leave::executions::ExecutionFilter;
use tabula_comp_leave::services::COMP_LEAVE_EXPIRY_JOB;
use tabula_comp_leave::types::PayrollMonth;
use validator::Validate;

use super::require_admin;
use crate::error::{ApiLeaveError, ApiResult, ErrorResponse};
use crate::models::{ExecuteJobRequest, ExpiryRunResponse, HistoryQuery, HistoryResponse};
use crate::router::LeaveState;

/// Run a batch job now.
///
/// Only `comp_leave_expiry` is known. An explicit `target_month` backfills
/// that month; otherwise the run covers the previous calendar month.
#[utoipa::path(
    post,
    path = "/cron/execute",
    tag = "cron",
    request_body = ExecuteJobRequest,
    responses(
        (status = 200, description = "Run summary", body = ExpiryRunResponse),
        (status = 400, description = "Unknown job or bad month", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 500, description = "Run failed", body = ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn execute_job(
    State(state): State<LeaveState>,
    Extension(claims): Extension<AuthClaims>,
    Json(request): Json<ExecuteJobRequest>,
) -> ApiResult<Json<ExpiryRunResponse>> {
    require_admin(&claims)?;
    request.validate()?;
    if request.job_name != COMP_LEAVE_EXPIRY_JOB {
        return Err(ApiLeaveError::UnknownJob(request.job_name));
    }
    let target: Option<PayrollMonth> = request
        .target_month
        .as_deref()
        .map(str::parse)
        .transpose()
        .map_err(ApiLeaveError::Validation)?;

    let summary = state.expiry_job.run_once(target).await?;
    if !summary.is_clean() {
        let eligible =
            summary.grants_converted + summary.grants_skipped + summary.failures.len();
        return Err(ApiLeaveError::JobFailed(format!(
            "{} of {} eligible grants failed to convert",
            summary.failures.len(),
            eligible
        )));
    }
    Ok(Json(summary.into()))
}

/// Paginated batch run history, newest-first.
#[utoipa::path(
    get,
    path = "/cron/history",
    tag = "cron",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Run history", body = HistoryResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn job_history(
    State(state): State<LeaveState>,
    Extension(claims): Extension<AuthClaims>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<HistoryResponse>> {
    require_admin(&claims)?;
    let (per_page, offset) = query.page_bounds();
    let filter = ExecutionFilter {
        job_name: query.job_name.clone(),
        ..ExecutionFilter::default()
    }
    .with_page(per_page, offset);

    let (entries, total) = state.executions.list(filter).await?;
    Ok(Json(HistoryResponse {
        items: entries.into_iter().map(Into::into).collect(),
        total,
        page: query.page.max(1),
        per_page,
    }))
}
