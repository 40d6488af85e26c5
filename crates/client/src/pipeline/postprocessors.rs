//! Response postprocessors
//!
//! Registration order: device-token persistence → client sync → event
//! emission → error translation. The side-effect stages are best-effort and
//! run regardless of status code; malformed side-channel payloads are
//! silently absorbed so they can never mask the primary response. The error
//! translator runs last and is the only stage that raises.

use std::sync::Arc;

use async_trait::async_trait;
use clasp_domain::{
    AuthEvent, Client, ClientPayload, Error, ErrorEnvelope, Result, Session, SignIn, SignInStatus,
    SignUp, SignUpStatus,
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{headers, storage_keys};
use crate::events::EventBus;
use crate::http::WireResponse;
use crate::state::ClientState;
use crate::storage::Storage;

use super::{PipelineContext, Postprocessor};

/// Persists the device credential surfaced in a response header
///
/// Runs independently of status code: the server may rotate the credential
/// on error responses too.
pub struct PersistDeviceToken {
    storage: Arc<dyn Storage>,
}

impl PersistDeviceToken {
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl Postprocessor for PersistDeviceToken {
    async fn validate(&self, _ctx: &PipelineContext<'_>, response: &WireResponse) -> Result<()> {
        if let Some(token) = response.header(headers::AUTHORIZATION) {
            if !token.is_empty() {
                if let Err(e) =
                    self.storage.set(storage_keys::DEVICE_TOKEN, token.as_bytes().to_vec()).await
                {
                    warn!(error = %e, "failed to persist device token");
                }
            }
        }
        Ok(())
    }
}

/// Merges a piggy-backed client snapshot into the process-wide state
///
/// Wrapper shapes are tried in priority order: `{"response": ..., "client":
/// ...}` first, then a top-level client object (recognized by its `object`
/// tag). The first successful decode wins; anything else is a silent no-op.
pub struct SyncClient {
    state: Arc<ClientState>,
}

impl SyncClient {
    #[must_use]
    pub fn new(state: Arc<ClientState>) -> Self {
        Self { state }
    }

    fn extract(body: &[u8]) -> Option<Client> {
        if let Ok(payload) = serde_json::from_slice::<ClientPayload>(body) {
            return Some(payload.client);
        }

        let value: Value = serde_json::from_slice(body).ok()?;
        if value.get("object").and_then(Value::as_str) == Some("client") {
            return serde_json::from_value(value).ok();
        }
        None
    }
}

#[async_trait]
impl Postprocessor for SyncClient {
    async fn validate(&self, _ctx: &PipelineContext<'_>, response: &WireResponse) -> Result<()> {
        if let Some(client) = Self::extract(&response.body) {
            debug!(client_id = %client.id, "syncing client snapshot");
            self.state.set(client);
        }
        Ok(())
    }
}

/// Publishes domain events for completed/removed resources in the body
///
/// Scans the primary resource (wrapper `response` or the top level) for
/// sign-in, sign-up, and session shapes tagged by their `object` field.
/// Emission order follows postprocessor execution order, not request
/// issuance order. Never raises.
pub struct EmitEvents {
    bus: Arc<EventBus>,
}

impl EmitEvents {
    #[must_use]
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }

    fn event_for(resource: &Value) -> Option<AuthEvent> {
        match resource.get("object").and_then(Value::as_str)? {
            "sign_in" => {
                let sign_in: SignIn = serde_json::from_value(resource.clone()).ok()?;
                (sign_in.status == SignInStatus::Complete)
                    .then_some(AuthEvent::SignInCompleted(sign_in))
            }
            "sign_up" => {
                let sign_up: SignUp = serde_json::from_value(resource.clone()).ok()?;
                (sign_up.status == SignUpStatus::Complete)
                    .then_some(AuthEvent::SignUpCompleted(sign_up))
            }
            "session" => {
                let session: Session = serde_json::from_value(resource.clone()).ok()?;
                session.status.is_terminated().then_some(AuthEvent::SessionRemoved(session))
            }
            _ => None,
        }
    }
}

#[async_trait]
impl Postprocessor for EmitEvents {
    async fn validate(&self, _ctx: &PipelineContext<'_>, response: &WireResponse) -> Result<()> {
        let Ok(value) = serde_json::from_slice::<Value>(&response.body) else {
            return Ok(());
        };

        let resource = match value.get("response") {
            Some(inner) => inner,
            None => &value,
        };
        if let Some(event) = Self::event_for(resource) {
            self.bus.publish(event);
        }
        Ok(())
    }
}

/// Translates non-2xx responses into structured API errors
pub struct TranslateErrors;

#[async_trait]
impl Postprocessor for TranslateErrors {
    async fn validate(&self, _ctx: &PipelineContext<'_>, response: &WireResponse) -> Result<()> {
        if response.is_success() {
            return Ok(());
        }

        let api_error = match serde_json::from_slice::<ErrorEnvelope>(&response.body) {
            Ok(envelope) => envelope.into_api_error(response.status),
            Err(_) => clasp_domain::ApiError::from_status(response.status),
        };

        Err(Error::Api(api_error))
    }
}
