//! Stateless preprocessors
//!
//! Each stage mutates the outgoing wire request; registration order is
//! URL resolution → default headers → session query → form encoding.

use std::sync::Arc;

use async_trait::async_trait;
use clasp_domain::{Error, Result};
use tracing::warn;
use url::Url;

use crate::config::{headers, storage_keys, SdkConfig, SESSION_QUERY_PARAM};
use crate::http::request::encode_form;
use crate::http::{Body, WireRequest};
use crate::storage::{get_string, Storage};

use super::{PipelineContext, Preprocessor};

/// Resolves the descriptor path against the configured base URL
///
/// Absolute paths pass through untouched. A relative path without a
/// configured base URL is a configuration error and aborts the call.
pub struct ResolveUrl {
    config: Arc<SdkConfig>,
}

impl ResolveUrl {
    #[must_use]
    pub fn new(config: Arc<SdkConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Preprocessor for ResolveUrl {
    async fn prepare(&self, _ctx: &PipelineContext<'_>, request: &mut WireRequest) -> Result<()> {
        let url = if request.path.starts_with("http://") || request.path.starts_with("https://") {
            Url::parse(&request.path)
                .map_err(|e| Error::Configuration(format!("invalid URL {}: {e}", request.path)))?
        } else {
            if self.config.base_url.is_empty() {
                return Err(Error::Configuration(format!(
                    "no base URL configured for relative path {}",
                    request.path
                )));
            }
            let base = Url::parse(&self.config.base_url).map_err(|e| {
                Error::Configuration(format!("invalid base URL {}: {e}", self.config.base_url))
            })?;
            base.join(&request.path).map_err(|e| {
                Error::Configuration(format!("cannot join path {}: {e}", request.path))
            })?
        };

        request.url = Some(url);
        Ok(())
    }
}

/// Attaches the ambient identity headers
///
/// Sets the API-version and SDK-identity headers, a stable device-identity
/// header (minted on first use and persisted), and the persisted device
/// credential when one exists. Explicit descriptor headers win; storage
/// failures are absorbed so they cannot fail the request.
pub struct DefaultHeaders {
    config: Arc<SdkConfig>,
    storage: Arc<dyn Storage>,
}

impl DefaultHeaders {
    #[must_use]
    pub fn new(config: Arc<SdkConfig>, storage: Arc<dyn Storage>) -> Self {
        Self { config, storage }
    }

    async fn device_id(&self) -> String {
        match get_string(self.storage.as_ref(), storage_keys::DEVICE_ID).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                let id = uuid::Uuid::new_v4().to_string();
                if let Err(e) =
                    self.storage.set(storage_keys::DEVICE_ID, id.clone().into_bytes()).await
                {
                    warn!(error = %e, "failed to persist device id");
                }
                id
            }
            Err(e) => {
                warn!(error = %e, "failed to read device id, using ephemeral value");
                uuid::Uuid::new_v4().to_string()
            }
        }
    }
}

#[async_trait]
impl Preprocessor for DefaultHeaders {
    async fn prepare(&self, _ctx: &PipelineContext<'_>, request: &mut WireRequest) -> Result<()> {
        if request.header(headers::API_VERSION).is_none() {
            request.set_header(headers::API_VERSION, self.config.api_version.clone());
        }
        if request.header(headers::SDK_IDENTITY).is_none() {
            request.set_header(headers::SDK_IDENTITY, self.config.sdk_identity.clone());
        }
        if request.header(headers::DEVICE_ID).is_none() {
            let id = self.device_id().await;
            request.set_header(headers::DEVICE_ID, id);
        }
        if request.header(headers::AUTHORIZATION).is_none() {
            match get_string(self.storage.as_ref(), storage_keys::DEVICE_TOKEN).await {
                Ok(Some(token)) => request.set_header(headers::AUTHORIZATION, token),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "failed to read device token"),
            }
        }
        Ok(())
    }
}

/// Appends the session-context query parameter
pub struct SessionQuery;

#[async_trait]
impl Preprocessor for SessionQuery {
    async fn prepare(&self, ctx: &PipelineContext<'_>, request: &mut WireRequest) -> Result<()> {
        if let Some(session_id) = &ctx.descriptor.session_id {
            if !request.has_query(SESSION_QUERY_PARAM) {
                request.query.push((SESSION_QUERY_PARAM.to_string(), Some(session_id.clone())));
            }
        }
        Ok(())
    }
}

/// Encodes form bodies and sets the form content-type
pub struct FormEncodeBody;

#[async_trait]
impl Preprocessor for FormEncodeBody {
    async fn prepare(&self, _ctx: &PipelineContext<'_>, request: &mut WireRequest) -> Result<()> {
        if let Body::Form(pairs) = &request.body {
            let encoded = encode_form(pairs);
            request.body = Body::Raw(encoded);
            if request.header(headers::CONTENT_TYPE).is_none() {
                request.set_header(
                    headers::CONTENT_TYPE,
                    "application/x-www-form-urlencoded".to_string(),
                );
            }
        }
        Ok(())
    }
}
