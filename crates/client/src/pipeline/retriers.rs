//! Retriers
//!
//! Retriers perform their corrective work (token refresh, attestation
//! handshake) before answering. An internal failure during that work is
//! logged and mapped to `false` so the original error surfaces unchanged.

use std::sync::Arc;

use async_trait::async_trait;
use clasp_domain::{codes, Error};
use tracing::{debug, warn};

use crate::attestation::{AttestationCoordinator, ErrorClass};
use crate::token::{GetTokenOptions, TokenCache};

use super::{PipelineContext, Retrier};

/// Refreshes the session token after an `authentication_invalid` rejection
///
/// Only applies to session-scoped descriptors; the forced fetch skips the
/// cache so the retried attempt sees a fresh credential.
pub struct RefreshSessionToken {
    cache: Arc<TokenCache>,
}

impl RefreshSessionToken {
    #[must_use]
    pub fn new(cache: Arc<TokenCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl Retrier for RefreshSessionToken {
    async fn should_retry(&self, ctx: &PipelineContext<'_>, error: &Error) -> bool {
        if error.api_code() != Some(codes::AUTHENTICATION_INVALID) {
            return false;
        }
        let Some(session_id) = &ctx.descriptor.session_id else {
            return false;
        };

        let options = GetTokenOptions { skip_cache: true, ..Default::default() };
        match self.cache.get_token(session_id, options).await {
            Ok(_) => {
                debug!(%session_id, "refreshed session token, retrying");
                true
            }
            Err(e) => {
                warn!(%session_id, error = %e, "session token refresh failed");
                false
            }
        }
    }
}

/// Runs the attestation handshake for attestation-class API errors
pub struct ResolveAttestation {
    coordinator: Arc<AttestationCoordinator>,
}

impl ResolveAttestation {
    #[must_use]
    pub fn new(coordinator: Arc<AttestationCoordinator>) -> Self {
        Self { coordinator }
    }
}

#[async_trait]
impl Retrier for ResolveAttestation {
    async fn should_retry(&self, ctx: &PipelineContext<'_>, error: &Error) -> bool {
        let Some(class) = error.api_code().and_then(ErrorClass::from_code) else {
            return false;
        };

        match self.coordinator.resolve(class, &ctx.descriptor.path).await {
            Ok(retry) => retry,
            Err(e) => {
                warn!(?class, error = %e, "attestation handshake failed");
                false
            }
        }
    }
}
