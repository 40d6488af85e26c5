//! Request executor
//!
//! Drives one logical call through build → prepare → exchange → validate →
//! (retry loop) → decode. The attempt counter is shared across the whole
//! loop: it does not reset when the kind of triggering error changes within
//! one logical call.

use std::sync::Arc;

use clasp_domain::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::http::{RequestDescriptor, Transport, WireResponse};

use super::{Pipeline, PipelineContext};

/// Executes request descriptors through the stage pipeline
#[derive(Clone)]
pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    pipeline: Pipeline,
    max_attempts: u32,
}

impl RequestExecutor {
    /// Create an executor.
    ///
    /// `max_attempts` is the total number of attempts per logical call
    /// (initial try + retries) and is clamped to at least 1.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, pipeline: Pipeline, max_attempts: u32) -> Self {
        Self { transport, pipeline, max_attempts: max_attempts.max(1) }
    }

    /// Run a descriptor through the pipeline and decode the validated body.
    ///
    /// The body is decoded from the `{"response": ...}` wrapper when present,
    /// falling back to the top-level shape. Empty bodies decode from JSON
    /// `null`.
    ///
    /// # Errors
    /// Configuration errors and decode failures propagate directly; transport
    /// and structured API errors propagate once the retriers decline or the
    /// attempt bound is exhausted.
    #[instrument(skip(self, descriptor), fields(method = %descriptor.method, path = %descriptor.path))]
    pub async fn send<T: DeserializeOwned>(&self, descriptor: &RequestDescriptor) -> Result<T> {
        let response = self.execute(descriptor).await?;
        decode_body(&response.body)
    }

    /// Run a descriptor through the pipeline, returning the validated raw
    /// response.
    ///
    /// # Errors
    /// Same failure semantics as [`Self::send`], without the decode step.
    pub async fn execute(&self, descriptor: &RequestDescriptor) -> Result<WireResponse> {
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let ctx = PipelineContext { attempt, descriptor };

            // Rebuilt from scratch each attempt so headers reflecting updated
            // credentials are recomputed.
            let mut request = descriptor.to_wire();
            for stage in &self.pipeline.preprocessors {
                stage.prepare(&ctx, &mut request).await?;
            }

            let failure = match self.transport.exchange(request).await {
                Ok(response) => match self.validate(&ctx, &response).await {
                    Ok(()) => return Ok(response),
                    Err(error) => error,
                },
                Err(error) => error,
            };

            if attempt < self.max_attempts && self.consult_retriers(&ctx, &failure).await {
                debug!(attempt, error = %failure, "retrying request");
                continue;
            }

            return Err(failure);
        }
    }

    async fn validate(&self, ctx: &PipelineContext<'_>, response: &WireResponse) -> Result<()> {
        for stage in &self.pipeline.postprocessors {
            stage.validate(ctx, response).await?;
        }
        Ok(())
    }

    async fn consult_retriers(&self, ctx: &PipelineContext<'_>, error: &Error) -> bool {
        for stage in &self.pipeline.retriers {
            if stage.should_retry(ctx, error).await {
                return true;
            }
        }
        warn!(attempt = ctx.attempt, error = %error, "no retrier accepted the failure");
        false
    }
}

#[derive(Deserialize)]
struct ResponseEnvelope<T> {
    response: T,
}

fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    if body.is_empty() {
        return serde_json::from_value(serde_json::Value::Null)
            .map_err(|e| Error::Decoding(format!("empty body: {e}")));
    }

    if let Ok(envelope) = serde_json::from_slice::<ResponseEnvelope<T>>(body) {
        return Ok(envelope.response);
    }

    serde_json::from_slice(body).map_err(|e| Error::Decoding(e.to_string()))
}
