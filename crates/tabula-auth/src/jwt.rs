//! JWT encoding and decoding with HS256.
//!
//! The platform is a single-issuer internal service, so tokens are signed
//! with a shared secret rather than rotating RSA keys.

use jsonwebtoken::{
    decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};

use crate::claims::{AuthClaims, TOKEN_ISSUER};
use crate::error::AuthError;

/// Clock skew tolerance in seconds for exp/iat validation.
const LEEWAY_SECS: u64 = 60;

/// Encode claims into a signed token string.
///
/// # Errors
///
/// Returns `AuthError::InvalidToken` if encoding fails.
pub fn encode_token(claims: &AuthClaims, secret: &[u8]) -> Result<String, AuthError> {
    let key = EncodingKey::from_secret(secret);
    let header = Header::new(Algorithm::HS256);
    encode(&header, claims, &key)
        .map_err(|e| AuthError::InvalidToken(format!("Encoding failed: {e}")))
}

/// Decode and validate a token string.
///
/// Validates the signature, expiration (with leeway), and issuer.
///
/// # Errors
///
/// Returns `AuthError::TokenExpired`, `AuthError::InvalidSignature`, or
/// `AuthError::InvalidToken` depending on the failure.
pub fn decode_token(token: &str, secret: &[u8]) -> Result<AuthClaims, AuthError> {
    let key = DecodingKey::from_secret(secret);
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = LEEWAY_SECS;
    validation.set_issuer(&[TOKEN_ISSUER]);
    validation.set_required_spec_claims(&["exp", "iss", "sub"]);

    decode::<AuthClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            _ => AuthError::InvalidToken(e.to_string()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    const SECRET: &[u8] = b"test-secret-at-least-32-bytes-long";

    #[test]
    fn test_encode_decode_roundtrip() {
        let claims = AuthClaims::new(Uuid::new_v4(), vec!["admin".to_string()], 3600);
        let token = encode_token(&claims, SECRET).unwrap();
        let decoded = decode_token(&token, SECRET).unwrap();
        assert_eq!(decoded, claims);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let claims = AuthClaims::new(Uuid::new_v4(), vec![], 3600);
        let token = encode_token(&claims, SECRET).unwrap();
        let err = decode_token(&token, b"some-other-secret").unwrap_err();
        assert!(err.is_invalid_signature());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        // Past the 60s leeway.
        let claims = AuthClaims::new(Uuid::new_v4(), vec![], -3600);
        let token = encode_token(&claims, SECRET).unwrap();
        let err = decode_token(&token, SECRET).unwrap_err();
        assert!(err.is_expired());
    }

    #[test]
    fn test_foreign_issuer_is_rejected() {
        let mut claims = AuthClaims::new(Uuid::new_v4(), vec![], 3600);
        claims.iss = "someone-else".to_string();
        let token = encode_token(&claims, SECRET).unwrap();
        assert!(decode_token(&token, SECRET).is_err());
    }

    #[test]
    fn test_garbage_token_is_rejected() {
        assert!(decode_token("not-a-jwt", SECRET).is_err());
    }
}
