//! Client snapshot types
//!
//! The API piggy-backs a snapshot of the device-scoped client (its sessions
//! and any in-progress sign-in/sign-up) on most responses. The SDK keeps the
//! last successfully decoded snapshot as process-wide state; external flow
//! logic reads it, only response postprocessors overwrite it.

use serde::{Deserialize, Serialize};

/// Device-scoped client snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,

    /// Ids of every session attached to this client
    #[serde(default)]
    pub session_ids: Vec<String>,

    #[serde(default)]
    pub last_active_session_id: Option<String>,

    /// In-progress sign-in, if any
    #[serde(default)]
    pub sign_in: Option<SignIn>,

    /// In-progress sign-up, if any
    #[serde(default)]
    pub sign_up: Option<SignUp>,

    #[serde(default)]
    pub sessions: Vec<Session>,

    /// Server-side last update, unix milliseconds
    #[serde(default)]
    pub updated_at: Option<i64>,
}

/// An authenticated session belonging to the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub status: SessionStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Expired,
    Removed,
    Ended,
    Revoked,
    #[serde(other)]
    Unknown,
}

impl SessionStatus {
    /// Whether the session has been torn down on the server.
    #[must_use]
    pub fn is_terminated(self) -> bool {
        matches!(self, Self::Removed | Self::Ended | Self::Revoked)
    }
}

/// An in-progress or completed sign-in attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignIn {
    pub id: String,
    pub status: SignInStatus,
    #[serde(default)]
    pub created_session_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignInStatus {
    Complete,
    NeedsIdentifier,
    NeedsFirstFactor,
    NeedsSecondFactor,
    NeedsNewPassword,
    Abandoned,
    #[serde(other)]
    Unknown,
}

/// An in-progress or completed sign-up attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignUp {
    pub id: String,
    pub status: SignUpStatus,
    #[serde(default)]
    pub created_session_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignUpStatus {
    Complete,
    MissingRequirements,
    Abandoned,
    #[serde(other)]
    Unknown,
}

/// Piggy-backed wrapper shape: primary resource plus client snapshot
///
/// `{"response": <resource>, "client": <client>}`
#[derive(Debug, Clone, Deserialize)]
pub struct ClientPayload {
    #[serde(default)]
    pub response: Option<serde_json::Value>,
    pub client: Client,
}

#[cfg(test)]
mod tests {
    //! Unit tests for client snapshot types.
    use super::*;

    #[test]
    fn test_client_decodes_with_defaults() {
        let client: Client = serde_json::from_str(r#"{"id": "client_1"}"#).unwrap();

        assert_eq!(client.id, "client_1");
        assert!(client.session_ids.is_empty());
        assert!(client.sign_in.is_none());
        assert!(client.sign_up.is_none());
        assert!(client.sessions.is_empty());
    }

    #[test]
    fn test_status_enums_decode_snake_case() {
        let session: Session =
            serde_json::from_str(r#"{"id": "sess_1", "status": "removed"}"#).unwrap();
        assert_eq!(session.status, SessionStatus::Removed);
        assert!(session.status.is_terminated());

        let sign_in: SignIn =
            serde_json::from_str(r#"{"id": "si_1", "status": "needs_first_factor"}"#).unwrap();
        assert_eq!(sign_in.status, SignInStatus::NeedsFirstFactor);
    }

    #[test]
    fn test_unrecognized_status_maps_to_unknown() {
        let session: Session =
            serde_json::from_str(r#"{"id": "sess_1", "status": "pending_v2"}"#).unwrap();
        assert_eq!(session.status, SessionStatus::Unknown);
        assert!(!session.status.is_terminated());
    }

    #[test]
    fn test_client_payload_wrapper() {
        let body = r#"{
            "response": {"id": "si_1", "status": "complete"},
            "client": {"id": "client_1", "session_ids": ["sess_1"]}
        }"#;

        let payload: ClientPayload = serde_json::from_str(body).unwrap();
        assert_eq!(payload.client.id, "client_1");
        assert!(payload.response.is_some());
    }
}
