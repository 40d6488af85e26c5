//! Test doubles shared by unit and integration tests
//!
//! These are deliberately compiled into the library so the integration test
//! binaries can drive the pipeline without a real network or platform
//! attestation service.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use clasp_domain::{ApiError, Error, Result};
use parking_lot::Mutex;

use crate::attestation::AttestationProvider;
use crate::http::{Transport, WireRequest, WireResponse};
use crate::storage::Storage;

/// Scripted transport
///
/// Returns queued responses in order, falling back to a configurable default
/// (initially an empty 200). Records every exchanged request.
pub struct MockTransport {
    script: Mutex<VecDeque<Result<WireResponse>>>,
    default_response: Mutex<WireResponse>,
    requests: Mutex<Vec<WireRequest>>,
    latency: Mutex<Option<Duration>>,
    exchange_latencies: Mutex<VecDeque<Duration>>,
}

impl MockTransport {
    #[must_use]
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            default_response: Mutex::new(WireResponse::new(200, Vec::new(), Vec::new())),
            requests: Mutex::new(Vec::new()),
            latency: Mutex::new(None),
            exchange_latencies: Mutex::new(VecDeque::new()),
        }
    }

    /// Replace the fallback response with a JSON body.
    pub fn set_default_json(&self, status: u16, body: &str) {
        *self.default_response.lock() =
            WireResponse::new(status, Vec::new(), body.as_bytes().to_vec());
    }

    /// Queue one JSON response.
    pub fn push_json(&self, status: u16, body: &str) {
        self.push_response(WireResponse::new(status, Vec::new(), body.as_bytes().to_vec()));
    }

    /// Queue one response.
    pub fn push_response(&self, response: WireResponse) {
        self.script.lock().push_back(Ok(response));
    }

    /// Queue one transport-level failure.
    pub fn push_error(&self, error: Error) {
        self.script.lock().push_back(Err(error));
    }

    /// Delay every exchange; lets concurrency tests hold a fetch in flight.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = Some(latency);
    }

    /// Queue a latency for one exchange, consumed in exchange-start order.
    /// Exchanges without a queued latency fall back to the global latency.
    /// Lets ordering tests make an earlier request finish later.
    pub fn push_latency(&self, latency: Duration) {
        self.exchange_latencies.lock().push_back(latency);
    }

    /// Number of exchanges performed so far.
    #[must_use]
    pub fn exchanges(&self) -> usize {
        self.requests.lock().len()
    }

    /// The most recently exchanged request.
    #[must_use]
    pub fn last_request(&self) -> Option<WireRequest> {
        self.requests.lock().last().cloned()
    }

    /// All exchanged requests, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<WireRequest> {
        self.requests.lock().clone()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn exchange(&self, request: WireRequest) -> Result<WireResponse> {
        let latency = self.exchange_latencies.lock().pop_front().or_else(|| *self.latency.lock());
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        self.requests.lock().push(request);
        match self.script.lock().pop_front() {
            Some(scripted) => scripted,
            None => Ok(self.default_response.lock().clone()),
        }
    }
}

/// In-memory key/value storage
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self { entries: Mutex::new(HashMap::new()) }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.entries.lock().insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }

    async fn has(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }
}

/// Scripted attestation provider with call counters
///
/// Assertions succeed unless a failure code is queued; attestations always
/// yield a fixed blob. An optional delay holds handshakes in flight so
/// concurrency tests can overlap them deterministically.
pub struct MockAttestationProvider {
    attestations: AtomicU32,
    assertions: AtomicU32,
    assertion_failures: Mutex<VecDeque<String>>,
    assertion_delay: Mutex<Option<Duration>>,
}

impl MockAttestationProvider {
    #[must_use]
    pub fn new() -> Self {
        Self {
            attestations: AtomicU32::new(0),
            assertions: AtomicU32::new(0),
            assertion_failures: Mutex::new(VecDeque::new()),
            assertion_delay: Mutex::new(None),
        }
    }

    /// Queue one assertion failure with the given API error code.
    pub fn fail_next_assertion_with(&self, code: &str) {
        self.assertion_failures.lock().push_back(code.to_string());
    }

    /// Delay every assertion.
    pub fn set_assertion_delay(&self, delay: Duration) {
        *self.assertion_delay.lock() = Some(delay);
    }

    /// Number of attestations performed.
    #[must_use]
    pub fn attestations(&self) -> u32 {
        self.attestations.load(Ordering::SeqCst)
    }

    /// Number of assertions attempted, including scripted failures.
    #[must_use]
    pub fn assertions(&self) -> u32 {
        self.assertions.load(Ordering::SeqCst)
    }
}

impl Default for MockAttestationProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AttestationProvider for MockAttestationProvider {
    async fn perform_attestation(&self) -> Result<String> {
        self.attestations.fetch_add(1, Ordering::SeqCst);
        Ok("attestation-blob".to_string())
    }

    async fn perform_assertion(&self) -> Result<()> {
        let delay = *self.assertion_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.assertions.fetch_add(1, Ordering::SeqCst);
        match self.assertion_failures.lock().pop_front() {
            Some(code) => Err(Error::Api(ApiError {
                code,
                message: "assertion rejected".to_string(),
                long_message: None,
                trace_id: None,
                status: 401,
            })),
            None => Ok(()),
        }
    }
}
