//! JWT authentication middleware.
//!
//! Extracts and validates the Bearer token from the Authorization header,
//! then inserts [`AuthClaims`] into the request extensions for handlers to
//! consume.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::claims::AuthClaims;
use crate::jwt::decode_token;

/// Shared signing secret, inserted into the router as an
/// `axum::Extension` so the middleware can reach it.
#[derive(Clone)]
pub struct JwtSecret(pub Arc<Vec<u8>>);

impl JwtSecret {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self(Arc::new(secret.into()))
    }
}

/// JWT authentication middleware.
///
/// This middleware:
/// 1. Extracts the Bearer token from the Authorization header
/// 2. Decodes and validates the JWT against the shared secret
/// 3. Inserts [`AuthClaims`] into request extensions
///
/// # Usage
///
/// ```rust,ignore
/// let router = Router::new()
///     .route("/comp-leave/grants", post(create_grant))
///     .layer(middleware::from_fn(jwt_auth_middleware))
///     .layer(Extension(JwtSecret::new(secret)));
/// ```
pub async fn jwt_auth_middleware(
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    let secret = request
        .extensions()
        .get::<JwtSecret>()
        .ok_or_else(|| {
            tracing::error!("JWT secret not configured");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Server configuration error",
            )
                .into_response()
        })?
        .0
        .clone();

    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            (StatusCode::UNAUTHORIZED, "Missing Authorization header").into_response()
        })?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        (
            StatusCode::UNAUTHORIZED,
            "Invalid Authorization header format",
        )
            .into_response()
    })?;

    if token.is_empty() {
        tracing::warn!("Rejected empty bearer token");
        return Err((StatusCode::UNAUTHORIZED, "Empty bearer token").into_response());
    }

    let claims = decode_token(token, &secret).map_err(|e| {
        tracing::warn!("JWT validation failed: {}", e);
        (StatusCode::UNAUTHORIZED, "Invalid or expired token").into_response()
    })?;

    request.extensions_mut().insert::<AuthClaims>(claims);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::encode_token;
    use axum::{middleware, routing::get, Extension, Router};
    use tower::ServiceExt;
    use uuid::Uuid;

    const SECRET: &[u8] = b"test-secret-at-least-32-bytes-long";

    async fn whoami(Extension(claims): Extension<AuthClaims>) -> String {
        claims.sub
    }

    fn app() -> Router {
        Router::new()
            .route("/whoami", get(whoami))
            .layer(middleware::from_fn(jwt_auth_middleware))
            .layer(Extension(JwtSecret::new(SECRET)))
    }

    fn request(auth: Option<&str>) -> axum::http::Request<Body> {
        let mut builder = axum::http::Request::builder().uri("/whoami");
        if let Some(value) = auth {
            builder = builder.header("Authorization", value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_valid_token_reaches_handler_with_claims() {
        let user = Uuid::new_v4();
        let claims = AuthClaims::new(user, vec!["admin".to_string()], 3600);
        let token = encode_token(&claims, SECRET).unwrap();

        let response = app()
            .oneshot(request(Some(&format!("Bearer {token}"))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(body, user.to_string().as_bytes());
    }

    #[tokio::test]
    async fn test_missing_header_is_unauthorized() {
        let response = app().oneshot(request(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_malformed_header_is_unauthorized() {
        let response = app().oneshot(request(Some("Basic abc"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app().oneshot(request(Some("Bearer "))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_bad_token_is_unauthorized() {
        let response = app()
            .oneshot(request(Some("Bearer not-a-jwt")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
