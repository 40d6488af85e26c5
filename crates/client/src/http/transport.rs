//! Transport collaborator
//!
//! The pipeline never talks to the network directly; it hands a fully
//! prepared [`WireRequest`] to a [`Transport`] and gets back the raw status,
//! headers, and body. [`HttpTransport`] is the reqwest-backed production
//! implementation; tests substitute scripted doubles.

use std::time::Duration;

use async_trait::async_trait;
use clasp_domain::{Error, Result};
use tracing::debug;

use super::request::{encode_form, Body, WireRequest, WireResponse};

/// Trait for the transport exchange
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one HTTP exchange.
    ///
    /// # Errors
    /// Returns `Error::Timeout` when the deadline elapses and
    /// `Error::Transport` for any other connectivity failure. Non-2xx
    /// responses are *not* errors at this level; postprocessors translate
    /// them.
    async fn exchange(&self, request: WireRequest) -> Result<WireResponse>;
}

/// Reqwest-backed transport
pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpTransport {
    /// Create a transport with the given per-request deadline.
    ///
    /// # Errors
    /// Returns a configuration error when the underlying client cannot be
    /// built.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn exchange(&self, request: WireRequest) -> Result<WireResponse> {
        let url = request.final_url()?;
        let method = request.method.clone();

        debug!(%method, %url, "sending HTTP request");

        let mut builder = self.client.request(method.clone(), url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        match &request.body {
            Body::Empty => {}
            Body::Raw(bytes) => builder = builder.body(bytes.clone()),
            Body::Form(pairs) => builder = builder.body(encode_form(pairs)),
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(self.timeout)
            } else {
                Error::Transport(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Transport(format!("failed to read response body: {e}")))?
            .to_vec();

        debug!(%method, %url, status, "received HTTP response");

        Ok(WireResponse::new(status, headers, body))
    }
}
