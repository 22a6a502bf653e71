//! HTTP handlers for the comp-leave API.

mod cron;
mod grants;

pub use cron::*;
pub use grants::*;

use tabula_auth::AuthClaims;
use uuid::Uuid;

use crate::error::ApiLeaveError;

/// Admin-only surface.
fn require_admin(claims: &AuthClaims) -> Result<(), ApiLeaveError> {
    if claims.has_role("admin") {
        Ok(())
    } else {
        Err(ApiLeaveError::Forbidden)
    }
}

/// Users may read their own data; admins may read anyone's.
fn require_self_or_admin(claims: &AuthClaims, user_id: Uuid) -> Result<(), ApiLeaveError> {
    if claims.user_id() == Some(user_id) || claims.has_role("admin") {
        Ok(())
    } else {
        Err(ApiLeaveError::Forbidden)
    }
}
