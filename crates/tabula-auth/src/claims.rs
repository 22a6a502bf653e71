//! JWT claims for the internal platform token.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims carried by a platform access token.
///
/// # Standard Claims (RFC 7519)
///
/// - `sub`: Subject (the employee's user ID)
/// - `iss`: Issuer
/// - `exp`: Expiration time (Unix timestamp)
/// - `iat`: Issued at (Unix timestamp)
/// - `jti`: JWT ID (unique identifier)
///
/// # Custom Claims
///
/// - `roles`: Platform roles for authorization
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthClaims {
    /// Subject - the user ID.
    pub sub: String,

    /// Issuer - who created the token.
    pub iss: String,

    /// Expiration time as Unix timestamp.
    pub exp: i64,

    /// Issued at as Unix timestamp.
    pub iat: i64,

    /// JWT ID - unique identifier for this token.
    pub jti: String,

    /// Platform roles for authorization.
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Issuer stamped on platform tokens.
pub const TOKEN_ISSUER: &str = "tabula";

impl AuthClaims {
    /// Build claims for a user with the given roles and lifetime.
    pub fn new(user_id: Uuid, roles: Vec<String>, expires_in_secs: i64) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id.to_string(),
            iss: TOKEN_ISSUER.to_string(),
            exp: (now + Duration::seconds(expires_in_secs)).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
            roles,
        }
    }

    /// The subject parsed as a user ID, when it is one.
    pub fn user_id(&self) -> Option<Uuid> {
        self.sub.parse().ok()
    }

    /// Check if the claims include a role.
    ///
    /// Role hierarchy: `super_admin` implies `admin`.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
            || (role == "admin" && self.roles.iter().any(|r| r == "super_admin"))
    }

    /// Check if the claims include any of the given roles.
    #[must_use]
    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        roles.iter().any(|r| self.has_role(r))
    }

    /// Whether the token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.exp < Utc::now().timestamp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_claims_reference_user_and_roles() {
        let user = Uuid::new_v4();
        let claims = AuthClaims::new(user, vec!["admin".to_string()], 3600);

        assert_eq!(claims.user_id(), Some(user));
        assert_eq!(claims.iss, TOKEN_ISSUER);
        assert!(!claims.is_expired());
        assert!(claims.exp > claims.iat);
        assert!(!claims.jti.is_empty());
    }

    #[test]
    fn test_has_role() {
        let claims = AuthClaims::new(
            Uuid::new_v4(),
            vec!["admin".to_string(), "user".to_string()],
            3600,
        );
        assert!(claims.has_role("admin"));
        assert!(claims.has_role("user"));
        assert!(!claims.has_role("super_admin"));
        assert!(claims.has_any_role(&["super_admin", "user"]));
        assert!(!claims.has_any_role(&["super_admin"]));
    }

    #[test]
    fn test_super_admin_implies_admin() {
        let claims = AuthClaims::new(Uuid::new_v4(), vec!["super_admin".to_string()], 3600);
        assert!(claims.has_role("super_admin"));
        assert!(claims.has_role("admin"));
        assert!(!claims.has_role("user"));
    }

    #[test]
    fn test_expired_claims() {
        let claims = AuthClaims::new(Uuid::new_v4(), vec![], -10);
        assert!(claims.is_expired());
    }

    #[test]
    fn test_non_uuid_subject_yields_no_user_id() {
        let mut claims = AuthClaims::new(Uuid::new_v4(), vec![], 3600);
        claims.sub = "service:payroll".to_string();
        assert_eq!(claims.user_id(), None);
    }
}
