//! Minimal JWT claim inspection
//!
//! The cache only needs the `exp` claim to compute a token's remaining
//! lifetime; signatures are verified server-side, never here.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Deserialize)]
struct Claims {
    exp: i64,
}

/// Extract the expiry timestamp from a JWT's payload, if present and
/// well-formed.
pub(crate) fn expiry(jwt: &str) -> Option<DateTime<Utc>> {
    let payload = jwt.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let claims: Claims = serde_json::from_slice(&bytes).ok()?;
    DateTime::<Utc>::from_timestamp(claims.exp, 0)
}

#[cfg(test)]
mod tests {
    //! Unit tests for JWT expiry extraction.
    use super::*;

    fn make_jwt(payload: &str) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#);
        let payload = URL_SAFE_NO_PAD.encode(payload.as_bytes());
        format!("{header}.{payload}.sig")
    }

    #[test]
    fn test_expiry_from_exp_claim() {
        let jwt = make_jwt(r#"{"sub": "sess_1", "exp": 1700000000}"#);
        let expires_at = expiry(&jwt).unwrap();
        assert_eq!(expires_at.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_missing_exp_claim() {
        let jwt = make_jwt(r#"{"sub": "sess_1"}"#);
        assert!(expiry(&jwt).is_none());
    }

    #[test]
    fn test_malformed_tokens() {
        assert!(expiry("not-a-jwt").is_none());
        assert!(expiry("a.!!!.c").is_none());
        assert!(expiry("").is_none());
    }
}
