//! Integration tests for the attestation coordinator and its retrier
//!
//! Preemption is driven through the provider's assertion delay so a
//! device-attestation failure reliably lands while an assertion-only
//! handshake is still in flight.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use clasp_client::attestation::{AttestationCoordinator, ErrorClass, VERIFICATION_PATH};
use clasp_client::http::Body;
use clasp_client::pipeline::{Pipeline, RequestExecutor};
use clasp_client::testing::{MemoryStorage, MockAttestationProvider, MockTransport};
use clasp_client::{AuthClient, Error, RequestDescriptor, SdkConfig};

fn coordinator_with(
    provider: Arc<MockAttestationProvider>,
    transport: Arc<MockTransport>,
) -> Arc<AttestationCoordinator> {
    let executor = Arc::new(RequestExecutor::new(transport, Pipeline::new(), 1));
    Arc::new(AttestationCoordinator::new(provider, executor))
}

fn client_with(
    transport: Arc<MockTransport>,
    provider: Arc<MockAttestationProvider>,
) -> AuthClient {
    AuthClient::new(
        SdkConfig::new("https://api.example.com"),
        transport,
        Arc::new(MemoryStorage::new()),
        provider,
    )
}

/// Validates handshake sharing and preemption across overlapping callers.
///
/// Two assertion-class callers overlap with one device-attestation-class
/// caller arriving mid-handshake.
///
/// Assertions:
/// - Confirms the assertion-class callers share one handshake.
/// - Confirms the device-attestation caller supersedes it rather than joining.
/// - Confirms exactly one assertion-only and one attestation+assertion
///   handshake run in total.
#[tokio::test]
async fn test_device_attestation_preempts_in_flight_assertion() {
    let provider = Arc::new(MockAttestationProvider::new());
    provider.set_assertion_delay(Duration::from_millis(80));
    let transport = Arc::new(MockTransport::new());
    let coordinator = coordinator_with(provider.clone(), transport.clone());

    let first = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { coordinator.resolve(ErrorClass::Assertion, "/v1/me").await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    let second = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { coordinator.resolve(ErrorClass::Assertion, "/v1/me").await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    let superseder = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move {
            coordinator.resolve(ErrorClass::DeviceAttestation, "/v1/me").await
        })
    };

    assert!(first.await.unwrap().unwrap());
    assert!(second.await.unwrap().unwrap());
    assert!(superseder.await.unwrap().unwrap());

    // Shared assertion handshake plus the superseding handshake's assertion.
    assert_eq!(provider.assertions(), 2);
    assert_eq!(provider.attestations(), 1);
    // Only the superseding handshake performs the verification exchange.
    assert_eq!(transport.exchanges(), 1);
}

/// Validates the full pipeline round trip for an assertion-class rejection.
#[tokio::test]
async fn test_assertion_rejection_is_resolved_and_retried() {
    let transport = Arc::new(MockTransport::new());
    transport.push_json(
        401,
        r#"{"errors": [{"code": "requires_assertion", "message": "Assertion required"}]}"#,
    );
    transport.set_default_json(200, r#"{"response": {"ok": true}}"#);
    let provider = Arc::new(MockAttestationProvider::new());
    let client = client_with(transport.clone(), provider.clone());

    let body: Value = client.send(&RequestDescriptor::get("/v1/me")).await.unwrap();

    assert_eq!(body["ok"], true);
    assert_eq!(transport.exchanges(), 2);
    assert_eq!(provider.assertions(), 1);
    assert_eq!(provider.attestations(), 0);
}

/// Validates the full attestation handshake for a device-attestation-class
/// rejection, including the wire shape of the verification call.
#[tokio::test]
async fn test_device_attestation_rejection_runs_full_handshake() {
    let transport = Arc::new(MockTransport::new());
    transport.push_json(
        401,
        r#"{"errors": [{"code": "requires_device_attestation", "message": "Attest first"}]}"#,
    );
    transport.set_default_json(200, r#"{"response": {"ok": true}}"#);
    let provider = Arc::new(MockAttestationProvider::new());
    let client = client_with(transport.clone(), provider.clone());

    let body: Value = client.send(&RequestDescriptor::get("/v1/me")).await.unwrap();

    assert_eq!(body["ok"], true);
    assert_eq!(provider.attestations(), 1);
    assert_eq!(provider.assertions(), 1);

    // Original attempt, verification call, retried attempt.
    let requests = transport.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[1].path, VERIFICATION_PATH);
    assert_eq!(requests[1].body, Body::Raw(b"attestation=attestation-blob".to_vec()));
    assert_eq!(requests[2].path, "/v1/me");
}

/// Validates that a request to the verification endpoint itself is not
/// retried after a successful device-attestation handshake.
#[tokio::test]
async fn test_verification_endpoint_rejection_surfaces_after_handshake() {
    let transport = Arc::new(MockTransport::new());
    transport.push_json(
        401,
        r#"{"errors": [{"code": "requires_device_attestation", "message": "Attest first"}]}"#,
    );
    transport.set_default_json(200, "{}");
    let provider = Arc::new(MockAttestationProvider::new());
    let client = client_with(transport.clone(), provider.clone());

    let result: Result<Value, _> =
        client.send(&RequestDescriptor::post(VERIFICATION_PATH)).await;

    match result {
        Err(Error::Api(err)) => assert_eq!(err.code, "requires_device_attestation"),
        other => panic!("expected API error, got {other:?}"),
    }
    // The handshake still ran its own verification call.
    assert_eq!(provider.attestations(), 1);
    assert_eq!(transport.exchanges(), 2);
}

/// Validates that a failed handshake maps to no-retry so the original error
/// surfaces unchanged.
#[tokio::test]
async fn test_failed_handshake_surfaces_original_error() {
    let transport = Arc::new(MockTransport::new());
    transport.set_default_json(
        401,
        r#"{"errors": [{"code": "requires_assertion", "message": "Assertion required"}]}"#,
    );
    let provider = Arc::new(MockAttestationProvider::new());
    provider.fail_next_assertion_with("assertion_failed");
    let client = client_with(transport.clone(), provider);

    let result: Result<Value, _> = client.send(&RequestDescriptor::get("/v1/me")).await;

    match result {
        Err(Error::Api(err)) => assert_eq!(err.code, "requires_assertion"),
        other => panic!("expected API error, got {other:?}"),
    }
    assert_eq!(transport.exchanges(), 1);
}
