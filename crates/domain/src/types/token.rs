//! Session token types with expiry tracking
//!
//! A [`SessionToken`] wraps the raw JWT together with its absolute expiry
//! timestamp so cache reads can honor a caller-supplied expiration buffer
//! without re-parsing the JWT.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A session JWT plus its expiry metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionToken {
    /// Raw JWT attached to authenticated requests
    pub jwt: String,

    /// Absolute expiration timestamp (UTC), `None` when the JWT carries no
    /// `exp` claim
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl SessionToken {
    /// Create a new token with a known expiry.
    #[must_use]
    pub fn new(jwt: String, expires_at: Option<DateTime<Utc>>) -> Self {
        Self { jwt, expires_at }
    }

    /// Check whether the token is expired or will expire within the given
    /// buffer.
    ///
    /// Returns `false` when no expiry is set.
    #[must_use]
    pub fn is_expired(&self, buffer_seconds: i64) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() + chrono::Duration::seconds(buffer_seconds) >= expires_at,
            None => false,
        }
    }

    /// Get seconds until token expiration, `None` when no expiry is set.
    #[must_use]
    pub fn seconds_until_expiry(&self) -> Option<i64> {
        self.expires_at.map(|expires_at| (expires_at - Utc::now()).num_seconds())
    }
}

/// Raw wire shape of the token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub object: Option<String>,
    pub jwt: String,
}
