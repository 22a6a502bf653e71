//! Authentication for the tabula ops platform.
//!
//! Internal single-issuer JWTs: [`AuthClaims`] with a role hierarchy
//! (`super_admin` implies `admin`), HS256 encode/decode against a shared
//! platform secret, and an axum middleware that validates Bearer tokens and
//! hands the claims to handlers.

pub mod claims;
pub mod error;
pub mod jwt;
pub mod middleware;

pub use claims::{AuthClaims, TOKEN_ISSUER};
pub use error::AuthError;
pub use jwt::{decode_token, encode_token};
pub use middleware::{jwt_auth_middleware, JwtSecret};
