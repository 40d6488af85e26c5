//! Error types used throughout the SDK
//!
//! The taxonomy separates transport failures (retriable by policy), local
//! configuration mistakes (never retried), decode mismatches on the primary
//! response contract (never retried), and structured API errors carried in a
//! non-2xx response envelope (retried only for recognized codes).
//!
//! Every error type is `Clone` so a single failure can be fanned out to all
//! waiters of a shared in-flight operation.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Well-known API error codes that drive retry coordination.
pub mod codes {
    /// The request must carry a fresh device assertion.
    pub const REQUIRES_ASSERTION: &str = "requires_assertion";

    /// The device must complete a full attestation handshake.
    pub const REQUIRES_DEVICE_ATTESTATION: &str = "requires_device_attestation";

    /// The session token attached to the request is no longer valid.
    pub const AUTHENTICATION_INVALID: &str = "authentication_invalid";
}

/// Main error type for Clasp SDK operations
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Connectivity-level failure (DNS, TLS, connection reset, ...)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The transport exchange did not complete within the deadline
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Local misconfiguration, e.g. a relative path without a base URL
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The validated response body did not match the decode contract
    #[error("Decoding error: {0}")]
    Decoding(String),

    /// Structured API error derived from a non-2xx response envelope
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl Error {
    /// Return the API error code when this is a structured API error.
    #[must_use]
    pub fn api_code(&self) -> Option<&str> {
        match self {
            Self::Api(err) => Some(err.code.as_str()),
            _ => None,
        }
    }
}

/// Result type alias for SDK operations
pub type Result<T> = std::result::Result<T, Error>;

/// Structured API error translated from a non-2xx error envelope
///
/// Carries the first entry of the envelope's `errors` list plus the trace id
/// and HTTP status of the originating response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("API error {code} (status {status}): {message}")]
pub struct ApiError {
    /// Machine-readable error code (e.g. `authentication_invalid`)
    pub code: String,

    /// Short human-readable message
    pub message: String,

    /// Extended message, when the server provides one
    pub long_message: Option<String>,

    /// Server-side trace id for support correlation
    pub trace_id: Option<String>,

    /// HTTP status of the response the error was derived from
    pub status: u16,
}

impl ApiError {
    /// Build a fallback error for a non-2xx response without a parseable
    /// envelope.
    #[must_use]
    pub fn from_status(status: u16) -> Self {
        Self {
            code: format!("http_{status}"),
            message: format!("Request failed with status {status}"),
            long_message: None,
            trace_id: None,
            status,
        }
    }
}

/// Wire shape of one entry in the error envelope's `errors` list
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub long_message: Option<String>,
    #[serde(default)]
    pub meta: Option<serde_json::Value>,
}

/// Structured error envelope returned by the API on failure
///
/// `{"errors": [{"code", "message", "long_message"?, "meta"?}], "clerk_trace_id"?}`
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    pub errors: Vec<ApiErrorDetail>,
    #[serde(default)]
    pub clerk_trace_id: Option<String>,
}

impl ErrorEnvelope {
    /// Translate the envelope into an [`ApiError`], taking the first entry of
    /// the error list. Returns a status-derived fallback when the list is
    /// empty.
    #[must_use]
    pub fn into_api_error(self, status: u16) -> ApiError {
        match self.errors.into_iter().next() {
            Some(detail) => ApiError {
                code: detail.code,
                message: detail.message,
                long_message: detail.long_message,
                trace_id: self.clerk_trace_id,
                status,
            },
            None => ApiError::from_status(status),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the error taxonomy.
    use super::*;

    /// Validates envelope translation for the first-entry-wins scenario.
    ///
    /// Assertions:
    /// - Confirms the translated code equals the first list entry's code.
    /// - Confirms the trace id is carried over.
    #[test]
    fn test_envelope_translation_takes_first_entry() {
        let body = r#"{
            "errors": [
                {"code": "authentication_invalid", "message": "Invalid token"},
                {"code": "other", "message": "secondary"}
            ],
            "clerk_trace_id": "trace-123"
        }"#;

        let envelope: ErrorEnvelope = serde_json::from_str(body).unwrap();
        let err = envelope.into_api_error(401);

        assert_eq!(err.code, codes::AUTHENTICATION_INVALID);
        assert_eq!(err.message, "Invalid token");
        assert_eq!(err.trace_id, Some("trace-123".to_string()));
        assert_eq!(err.status, 401);
    }

    /// Validates envelope translation for the empty error list scenario.
    #[test]
    fn test_envelope_translation_empty_list_falls_back_to_status() {
        let envelope: ErrorEnvelope = serde_json::from_str(r#"{"errors": []}"#).unwrap();
        let err = envelope.into_api_error(500);

        assert_eq!(err.code, "http_500");
        assert_eq!(err.status, 500);
    }

    /// Validates `Error::api_code` behavior across variants.
    #[test]
    fn test_api_code_accessor() {
        let api = Error::Api(ApiError::from_status(422));
        assert_eq!(api.api_code(), Some("http_422"));

        let transport = Error::Transport("connection reset".to_string());
        assert_eq!(transport.api_code(), None);
        assert_eq!(Error::Timeout(Duration::from_secs(30)).api_code(), None);
    }

    /// Validates optional envelope fields deserialize when absent.
    #[test]
    fn test_envelope_optional_fields() {
        let body = r#"{"errors": [{"code": "c", "message": "m"}]}"#;
        let envelope: ErrorEnvelope = serde_json::from_str(body).unwrap();

        assert!(envelope.clerk_trace_id.is_none());
        assert!(envelope.errors[0].long_message.is_none());
        assert!(envelope.errors[0].meta.is_none());
    }
}
