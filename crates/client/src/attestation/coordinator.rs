//! Attestation handshake coordinator
//!
//! De-duplicates handshakes across overlapping callers: concurrent
//! same-class errors share one handshake, while a device-attestation error
//! preempts an in-flight assertion-only handshake with a superseding one.
//! Handshakes run on spawned tasks; a cancelled waiter detaches without
//! cancelling the work for the remaining waiters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use clasp_domain::{codes, Error, Result};
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::http::RequestDescriptor;
use crate::pipeline::RequestExecutor;

use super::{AttestationProvider, ErrorClass, VERIFICATION_PATH};

type SharedHandshake = Shared<BoxFuture<'static, Result<()>>>;

struct InFlightHandshake {
    class: ErrorClass,
    generation: u64,
    shared: SharedHandshake,
}

/// Coordinates device attestation/assertion handshakes
pub struct AttestationCoordinator {
    provider: Arc<dyn AttestationProvider>,
    executor: Arc<RequestExecutor>,
    in_flight: Arc<Mutex<Option<InFlightHandshake>>>,
    generation: AtomicU64,
}

impl AttestationCoordinator {
    /// Create a coordinator using the given provider and executor (used for
    /// the handshake's verification step).
    #[must_use]
    pub fn new(provider: Arc<dyn AttestationProvider>, executor: Arc<RequestExecutor>) -> Self {
        Self {
            provider,
            executor,
            in_flight: Arc::new(Mutex::new(None)),
            generation: AtomicU64::new(0),
        }
    }

    /// Run (or join) the handshake for the given error class.
    ///
    /// Returns whether the original request should be retried: `false` only
    /// when a device-attestation handshake succeeded for a request that
    /// targeted the verification endpoint itself, whose own verification step
    /// already supersedes it.
    ///
    /// # Errors
    /// Propagates the shared handshake outcome; callers map a failed
    /// handshake to "do not retry" so the original error surfaces.
    pub async fn resolve(&self, class: ErrorClass, path: &str) -> Result<bool> {
        let shared = {
            let mut guard = self.in_flight.lock().await;
            match guard.as_ref() {
                Some(current) if class <= current.class => {
                    debug!(?class, current = ?current.class, "joining in-flight handshake");
                    current.shared.clone()
                }
                _ => {
                    if guard.is_some() {
                        info!("superseding in-flight assertion handshake with device attestation");
                    }
                    let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
                    let shared = self.spawn_handshake(class, generation);
                    *guard = Some(InFlightHandshake { class, generation, shared: shared.clone() });
                    shared
                }
            }
        };

        shared.await?;

        if class == ErrorClass::DeviceAttestation && path.ends_with(VERIFICATION_PATH) {
            return Ok(false);
        }
        Ok(true)
    }

    fn spawn_handshake(&self, class: ErrorClass, generation: u64) -> SharedHandshake {
        let provider = Arc::clone(&self.provider);
        let executor = Arc::clone(&self.executor);
        let in_flight = Arc::clone(&self.in_flight);

        let handle = tokio::spawn(async move {
            let result = match class {
                ErrorClass::Assertion => Self::assert_with_escalation(&provider, &executor).await,
                ErrorClass::DeviceAttestation => {
                    Self::attest_and_assert(&provider, &executor).await
                }
            };

            // Clear our slot before the waiters resume, unless a superseding
            // handshake has already replaced it.
            let mut guard = in_flight.lock().await;
            if guard.as_ref().is_some_and(|current| current.generation == generation) {
                *guard = None;
            }
            drop(guard);

            result
        });

        async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => Err(Error::Transport(format!("attestation task failed: {e}"))),
            }
        }
        .boxed()
        .shared()
    }

    async fn assert_with_escalation(
        provider: &Arc<dyn AttestationProvider>,
        executor: &Arc<RequestExecutor>,
    ) -> Result<()> {
        match provider.perform_assertion().await {
            Ok(()) => Ok(()),
            Err(err) if err.api_code() == Some(codes::REQUIRES_DEVICE_ATTESTATION) => {
                debug!("assertion rejected, escalating to full attestation");
                Self::attest_and_assert(provider, executor).await
            }
            Err(err) => Err(err),
        }
    }

    async fn attest_and_assert(
        provider: &Arc<dyn AttestationProvider>,
        executor: &Arc<RequestExecutor>,
    ) -> Result<()> {
        let attestation = provider.perform_attestation().await?;

        let descriptor =
            RequestDescriptor::post(VERIFICATION_PATH).form([("attestation", attestation)]);
        let _: serde_json::Value = executor.send(&descriptor).await?;

        provider.perform_assertion().await?;
        info!("device attestation handshake completed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for handshake sequencing. Preemption under concurrency is
    //! covered by the attestation integration tests.
    use crate::pipeline::Pipeline;
    use crate::testing::{MockAttestationProvider, MockTransport};

    use super::*;

    fn coordinator_with(
        provider: Arc<MockAttestationProvider>,
        transport: Arc<MockTransport>,
    ) -> AttestationCoordinator {
        let executor = Arc::new(RequestExecutor::new(transport, Pipeline::new(), 1));
        AttestationCoordinator::new(provider, executor)
    }

    #[tokio::test]
    async fn test_assertion_class_runs_assertion_only() {
        let provider = Arc::new(MockAttestationProvider::new());
        let transport = Arc::new(MockTransport::new());
        let coordinator = coordinator_with(provider.clone(), transport.clone());

        let retry = coordinator.resolve(ErrorClass::Assertion, "/v1/me").await.unwrap();

        assert!(retry);
        assert_eq!(provider.assertions(), 1);
        assert_eq!(provider.attestations(), 0);
        assert_eq!(transport.exchanges(), 0);
    }

    #[tokio::test]
    async fn test_device_attestation_class_attests_verifies_and_asserts() {
        let provider = Arc::new(MockAttestationProvider::new());
        let transport = Arc::new(MockTransport::new());
        let coordinator = coordinator_with(provider.clone(), transport.clone());

        let retry = coordinator.resolve(ErrorClass::DeviceAttestation, "/v1/me").await.unwrap();

        assert!(retry);
        assert_eq!(provider.attestations(), 1);
        assert_eq!(provider.assertions(), 1);
        assert_eq!(transport.exchanges(), 1);
        let verify = transport.last_request().unwrap();
        assert_eq!(verify.path, VERIFICATION_PATH);
    }

    #[tokio::test]
    async fn test_assertion_escalates_when_device_key_unregistered() {
        let provider = Arc::new(MockAttestationProvider::new());
        provider.fail_next_assertion_with(codes::REQUIRES_DEVICE_ATTESTATION);
        let transport = Arc::new(MockTransport::new());
        let coordinator = coordinator_with(provider.clone(), transport.clone());

        let retry = coordinator.resolve(ErrorClass::Assertion, "/v1/me").await.unwrap();

        assert!(retry);
        // Failed assertion, attestation, verification, fresh assertion.
        assert_eq!(provider.assertions(), 2);
        assert_eq!(provider.attestations(), 1);
        assert_eq!(transport.exchanges(), 1);
    }

    #[tokio::test]
    async fn test_verification_endpoint_request_is_not_retried() {
        let provider = Arc::new(MockAttestationProvider::new());
        let transport = Arc::new(MockTransport::new());
        let coordinator = coordinator_with(provider.clone(), transport);

        let retry = coordinator
            .resolve(ErrorClass::DeviceAttestation, VERIFICATION_PATH)
            .await
            .unwrap();

        assert!(!retry);
    }

    #[tokio::test]
    async fn test_handshake_failure_propagates_and_clears_slot() {
        let provider = Arc::new(MockAttestationProvider::new());
        provider.fail_next_assertion_with("assertion_failed");
        let transport = Arc::new(MockTransport::new());
        let coordinator = coordinator_with(provider.clone(), transport);

        let failed = coordinator.resolve(ErrorClass::Assertion, "/v1/me").await;
        assert!(failed.is_err());
        assert!(coordinator.in_flight.lock().await.is_none());

        // A later error starts a fresh handshake.
        let retry = coordinator.resolve(ErrorClass::Assertion, "/v1/me").await.unwrap();
        assert!(retry);
        assert_eq!(provider.assertions(), 2);
    }
}
