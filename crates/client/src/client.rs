//! SDK entry point
//!
//! [`AuthClient::new`] wires every component once; there are no global
//! singletons. Two executors share the transport and the stateless stages:
//! the base executor (no retriers) serves token fetches and handshake
//! verification so corrective work can never recurse into itself, and the
//! main executor adds the token-refresh and attestation retriers on top.

use std::sync::Arc;

use clasp_domain::{AuthEvent, Client, Result, SessionToken};
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;

use crate::attestation::{AttestationCoordinator, AttestationProvider};
use crate::config::SdkConfig;
use crate::events::EventBus;
use crate::http::{HttpTransport, RequestDescriptor, Transport};
use crate::pipeline::postprocessors::{EmitEvents, PersistDeviceToken, SyncClient, TranslateErrors};
use crate::pipeline::preprocessors::{DefaultHeaders, FormEncodeBody, ResolveUrl, SessionQuery};
use crate::pipeline::retriers::{RefreshSessionToken, ResolveAttestation};
use crate::pipeline::{Pipeline, RequestExecutor};
use crate::state::ClientState;
use crate::storage::Storage;
use crate::token::{GetTokenOptions, TokenCache};

/// Client for a hosted authentication service
pub struct AuthClient {
    executor: RequestExecutor,
    token_cache: Arc<TokenCache>,
    state: Arc<ClientState>,
    events: Arc<EventBus>,
}

impl AuthClient {
    /// Wire the SDK from its collaborators.
    #[must_use]
    pub fn new(
        config: SdkConfig,
        transport: Arc<dyn Transport>,
        storage: Arc<dyn Storage>,
        attestation_provider: Arc<dyn AttestationProvider>,
    ) -> Self {
        let config = Arc::new(config);
        let state = Arc::new(ClientState::new());
        let events = Arc::new(EventBus::new());

        let base_pipeline = Pipeline::new()
            .with_preprocessor(Arc::new(ResolveUrl::new(Arc::clone(&config))))
            .with_preprocessor(Arc::new(DefaultHeaders::new(
                Arc::clone(&config),
                Arc::clone(&storage),
            )))
            .with_preprocessor(Arc::new(SessionQuery))
            .with_preprocessor(Arc::new(FormEncodeBody))
            .with_postprocessor(Arc::new(PersistDeviceToken::new(Arc::clone(&storage))))
            .with_postprocessor(Arc::new(SyncClient::new(Arc::clone(&state))))
            .with_postprocessor(Arc::new(EmitEvents::new(Arc::clone(&events))))
            .with_postprocessor(Arc::new(TranslateErrors));

        // Single attempt: the base executor backs the retriers' own corrective
        // calls, which must not retry in turn.
        let base_executor =
            Arc::new(RequestExecutor::new(Arc::clone(&transport), base_pipeline.clone(), 1));

        let token_cache =
            Arc::new(TokenCache::new(Arc::clone(&base_executor), config.token_expiration_buffer));
        let coordinator =
            Arc::new(AttestationCoordinator::new(attestation_provider, base_executor));

        let pipeline = base_pipeline
            .with_retrier(Arc::new(RefreshSessionToken::new(Arc::clone(&token_cache))))
            .with_retrier(Arc::new(ResolveAttestation::new(coordinator)));
        let executor = RequestExecutor::new(transport, pipeline, config.max_attempts);

        Self { executor, token_cache, state, events }
    }

    /// Wire the SDK with the real HTTP transport.
    ///
    /// # Errors
    /// Returns a configuration error when the HTTP client cannot be built.
    pub fn with_http_transport(
        config: SdkConfig,
        storage: Arc<dyn Storage>,
        attestation_provider: Arc<dyn AttestationProvider>,
    ) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(config.timeout)?);
        Ok(Self::new(config, transport, storage, attestation_provider))
    }

    /// Send a request through the authenticated pipeline and decode the
    /// response body.
    ///
    /// # Errors
    /// See [`RequestExecutor::send`].
    pub async fn send<T: DeserializeOwned>(&self, descriptor: &RequestDescriptor) -> Result<T> {
        self.executor.send(descriptor).await
    }

    /// Retrieve a session token, cached or freshly fetched.
    ///
    /// # Errors
    /// See [`TokenCache::get_token`].
    pub async fn get_token(
        &self,
        session_id: &str,
        options: GetTokenOptions,
    ) -> Result<SessionToken> {
        self.token_cache.get_token(session_id, options).await
    }

    /// Subscribe to domain events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    /// The last-known-good client snapshot.
    #[must_use]
    pub fn client(&self) -> Option<Client> {
        self.state.get()
    }

    /// Shared snapshot state, for external flow logic.
    #[must_use]
    pub fn state(&self) -> Arc<ClientState> {
        Arc::clone(&self.state)
    }
}

#[cfg(test)]
mod tests {
    //! Wiring smoke tests. Full pipeline behavior lives in the integration
    //! tests.
    use serde_json::Value;

    use crate::testing::{MemoryStorage, MockAttestationProvider, MockTransport};

    use super::*;

    fn client_with(transport: Arc<MockTransport>) -> AuthClient {
        AuthClient::new(
            SdkConfig::new("https://api.example.com"),
            transport,
            Arc::new(MemoryStorage::new()),
            Arc::new(MockAttestationProvider::new()),
        )
    }

    #[tokio::test]
    async fn test_send_decodes_and_syncs_snapshot() {
        let transport = Arc::new(MockTransport::new());
        transport.set_default_json(
            200,
            r#"{"response": {"object": "sign_in", "id": "si_1", "status": "needs_first_factor"},
                "client": {"id": "client_1"}}"#,
        );
        let client = client_with(transport);

        let body: Value = client.send(&RequestDescriptor::post("/v1/client/sign_ins")).await.unwrap();

        assert_eq!(body["id"], "si_1");
        assert_eq!(client.client().unwrap().id, "client_1");
    }

    #[tokio::test]
    async fn test_subscribers_observe_pipeline_events() {
        let transport = Arc::new(MockTransport::new());
        transport.set_default_json(
            200,
            r#"{"response": {"object": "sign_in", "id": "si_1", "status": "complete"}}"#,
        );
        let client = client_with(transport);
        let mut events = client.subscribe();

        let _: Value = client.send(&RequestDescriptor::post("/v1/client/sign_ins")).await.unwrap();

        match events.try_recv().unwrap() {
            AuthEvent::SignInCompleted(sign_in) => assert_eq!(sign_in.id, "si_1"),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_get_token_goes_through_base_pipeline() {
        let transport = Arc::new(MockTransport::new());
        transport.set_default_json(200, r#"{"object": "token", "jwt": "jwt-1"}"#);
        let client = client_with(transport.clone());

        let token = client.get_token("sess_1", GetTokenOptions::default()).await.unwrap();

        assert_eq!(token.jwt, "jwt-1");
        let request = transport.last_request().unwrap();
        assert_eq!(request.path, "/v1/client/sessions/sess_1/tokens");
        assert!(request.header("x-api-version").is_some());
    }
}
