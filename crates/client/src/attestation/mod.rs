//! Device attestation and assertion handshakes
//!
//! Attestation registers a hardware-backed device key with the service;
//! assertion proves possession of that key. Both are expensive asynchronous
//! operations, so the [`AttestationCoordinator`] de-duplicates and sequences
//! them across overlapping callers.

pub mod coordinator;

use async_trait::async_trait;
use clasp_domain::{codes, Result};

pub use coordinator::AttestationCoordinator;

/// Endpoint that consumes attestation material; a successful
/// device-attestation handshake already covers a request that targeted it.
pub const VERIFICATION_PATH: &str = "/v1/client/verify";

/// Error class driving the handshake kind
///
/// Ordered by priority: a device-attestation error preempts an in-flight
/// assertion handshake, never the other way around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorClass {
    /// The request needs a fresh per-request assertion
    Assertion,
    /// The device must (re-)register its key before asserting
    DeviceAttestation,
}

impl ErrorClass {
    /// Map a structured API error code to its handshake class.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            codes::REQUIRES_ASSERTION => Some(Self::Assertion),
            codes::REQUIRES_DEVICE_ATTESTATION => Some(Self::DeviceAttestation),
            _ => None,
        }
    }
}

/// Trait for the platform attestation collaborator
#[async_trait]
pub trait AttestationProvider: Send + Sync {
    /// Generate fresh attestation material for the device key.
    ///
    /// # Errors
    /// Raises structured errors on platform or network failure.
    async fn perform_attestation(&self) -> Result<String>;

    /// Prove possession of the registered device key.
    ///
    /// # Errors
    /// Raises a `requires_device_attestation` API error when the key is not
    /// (or no longer) registered.
    async fn perform_assertion(&self) -> Result<()>;
}
