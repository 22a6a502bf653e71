//! Authentication and authorization behavior of the comp-leave router.
//!
//! These paths reject before any storage access, so a lazy (unconnected)
//! pool is enough.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tabula_api_leave::{leave_router, LeaveState};
use tabula_auth::{encode_token, AuthClaims, JwtSecret};
use tabula_comp_leave::{NoopBalanceCache, SystemClock};
use tower::ServiceExt;
use uuid::Uuid;

const SECRET: &[u8] = b"router-auth-test-secret";

fn test_router() -> Router {
    let pool = PgPoolOptions::new()
        .connect_lazy("postgres://postgres@localhost/unused")
        .expect("lazy pool");
    let state = LeaveState::new(pool, Arc::new(SystemClock), Arc::new(NoopBalanceCache));
    leave_router(state, JwtSecret::new(SECRET))
}

fn bearer(user_id: Uuid, roles: &[&str]) -> String {
    let claims = AuthClaims::new(
        user_id,
        roles.iter().map(|r| r.to_string()).collect(),
        3600,
    );
    format!("Bearer {}", encode_token(&claims, SECRET).unwrap())
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let response = test_router()
        .oneshot(
            Request::builder()
                .uri("/cron/history")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_garbage_token_is_unauthorized() {
    let response = test_router()
        .oneshot(
            Request::builder()
                .uri("/cron/history")
                .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cron_history_requires_admin() {
    let response = test_router()
        .oneshot(
            Request::builder()
                .uri("/cron/history")
                .header(header::AUTHORIZATION, bearer(Uuid::new_v4(), &["user"]))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_balance_of_another_user_is_forbidden() {
    let me = Uuid::new_v4();
    let other = Uuid::new_v4();
    let response = test_router()
        .oneshot(
            Request::builder()
                .uri(format!("/comp-leave/balance/{other}"))
                .header(header::AUTHORIZATION, bearer(me, &["user"]))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_unknown_job_name_is_rejected_before_running() {
    let response = test_router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/cron/execute")
                .header(header::AUTHORIZATION, bearer(Uuid::new_v4(), &["admin"]))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"job_name": "nightly_reindex"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_bad_target_month_is_rejected_before_running() {
    let response = test_router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/cron/execute")
                .header(
                    header::AUTHORIZATION,
                    bearer(Uuid::new_v4(), &["super_admin"]),
                )
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"job_name": "comp_leave_expiry", "target_month": "2024-13"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
