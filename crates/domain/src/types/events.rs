//! Domain events published by the request pipeline
//!
//! Events are emitted in the order postprocessors observe the underlying
//! resources, which is pipeline-completion order rather than request-issuance
//! order. Subscribers on the broadcast channel each receive every event.

use serde::{Deserialize, Serialize};

use super::client::{Session, SignIn, SignUp};

/// Event published when a response reveals a completed or removed resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthEvent {
    /// A sign-in attempt reached the `complete` status
    SignInCompleted(SignIn),

    /// A sign-up attempt reached the `complete` status
    SignUpCompleted(SignUp),

    /// A session was removed, ended, or revoked
    SessionRemoved(Session),
}

#[cfg(test)]
mod tests {
    //! Unit tests for domain events.
    use crate::types::client::{SignIn, SignInStatus};

    use super::*;

    #[test]
    fn test_event_round_trips_tagged() {
        let event = AuthEvent::SignInCompleted(SignIn {
            id: "si_1".to_string(),
            status: SignInStatus::Complete,
            created_session_id: Some("sess_1".to_string()),
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"sign_in_completed\""));

        let back: AuthEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
