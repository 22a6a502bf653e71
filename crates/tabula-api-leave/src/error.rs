//! Error types for the comp-leave API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tabula_comp_leave::LedgerError;
use thiserror::Error;
use utoipa::ToSchema;

/// Wire format for error responses.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Errors surfaced by comp-leave API handlers.
#[derive(Debug, Error)]
pub enum ApiLeaveError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Missing or invalid authentication token")]
    Unauthorized,

    #[error("Insufficient permissions")]
    Forbidden,

    #[error("Unknown job: {0}")]
    UnknownJob(String),

    #[error("Job run failed: {0}")]
    JobFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<validator::ValidationErrors> for ApiLeaveError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

impl ApiLeaveError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Ledger(err) => match err {
                LedgerError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
                LedgerError::InsufficientBalance { .. } => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "insufficient_balance")
                }
                LedgerError::GrantNotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
                LedgerError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
                LedgerError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
                LedgerError::SalaryUnavailable(_)
                | LedgerError::JobExecution(_)
                | LedgerError::Internal(_)
                | LedgerError::Database(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
                }
            },
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            Self::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
            Self::UnknownJob(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            Self::JobFailed(_) => (StatusCode::INTERNAL_SERVER_ERROR, "job_failed"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::Ledger(LedgerError::InsufficientBalance {
                requested,
                available,
            }) => Some(json!({
                "requested": requested.to_string(),
                "available": available.to_string(),
            })),
            _ => None,
        }
    }
}

impl IntoResponse for ApiLeaveError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Never leak storage internals to clients.
        let message = match &self {
            Self::Ledger(LedgerError::Database(err)) => {
                tracing::error!(error = %err, "database error in comp-leave API");
                "An internal error occurred".to_string()
            }
            Self::Ledger(LedgerError::Internal(msg)) | Self::Internal(msg) => {
                tracing::error!(error = %msg, "internal error in comp-leave API");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorResponse {
            error: code.to_string(),
            message,
            details: self.details(),
        };

        (status, Json(body)).into_response()
    }
}

/// Result alias for comp-leave handlers.
pub type ApiResult<T> = Result<T, ApiLeaveError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    #[test]
    fn ledger_errors_map_to_documented_statuses() {
        let cases: Vec<(ApiLeaveError, StatusCode, &str)> = vec![
            (
                LedgerError::Validation("hours must be positive".into()).into(),
                StatusCode::BAD_REQUEST,
                "validation_error",
            ),
            (
                LedgerError::InsufficientBalance {
                    requested: dec!(8),
                    available: dec!(2.5),
                }
                .into(),
                StatusCode::UNPROCESSABLE_ENTITY,
                "insufficient_balance",
            ),
            (
                LedgerError::GrantNotFound(Uuid::new_v4()).into(),
                StatusCode::NOT_FOUND,
                "not_found",
            ),
            (
                LedgerError::Forbidden("not yours".into()).into(),
                StatusCode::FORBIDDEN,
                "forbidden",
            ),
            (
                LedgerError::Conflict("grant changed underneath us".into()).into(),
                StatusCode::CONFLICT,
                "conflict",
            ),
            (
                LedgerError::JobExecution("sweep failed".into()).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
            ),
        ];

        for (err, status, code) in cases {
            let (got_status, got_code) = err.status_and_code();
            assert_eq!(got_status, status, "{err}");
            assert_eq!(got_code, code, "{err}");
        }
    }

    #[test]
    fn insufficient_balance_carries_details() {
        let err: ApiLeaveError = LedgerError::InsufficientBalance {
            requested: dec!(8),
            available: dec!(2.5),
        }
        .into();

        let details = err.details().expect("details");
        assert_eq!(details["requested"], "8");
        assert_eq!(details["available"], "2.5");
    }

    #[test]
    fn auth_errors_map_to_401_and_403() {
        assert_eq!(
            ApiLeaveError::Unauthorized.status_and_code().0,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiLeaveError::Forbidden.status_and_code().0,
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn unknown_job_is_a_client_error() {
        let err = ApiLeaveError::UnknownJob("nightly_reindex".into());
        assert_eq!(
            err.status_and_code(),
            (StatusCode::BAD_REQUEST, "validation_error")
        );
    }
}
