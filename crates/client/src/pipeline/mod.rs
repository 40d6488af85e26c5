//! Request pipeline abstraction
//!
//! Stages come in three kinds, each a narrow trait executed by iteration in
//! registration order:
//! - [`Preprocessor`] mutates the outgoing wire request
//! - [`Postprocessor`] validates the response or performs side effects
//! - [`Retrier`] inspects a failure and decides whether to retry
//!
//! There is no inheritance or dispatch machinery beyond the ordered lists
//! held by [`Pipeline`].

pub mod executor;
pub mod postprocessors;
pub mod preprocessors;
pub mod retriers;

use std::sync::Arc;

use async_trait::async_trait;
use clasp_domain::{Error, Result};

use crate::http::{RequestDescriptor, WireRequest, WireResponse};

pub use executor::RequestExecutor;

/// Per-attempt scratch state handed to every stage
#[derive(Debug, Clone, Copy)]
pub struct PipelineContext<'a> {
    /// 1-based attempt number within the logical call
    pub attempt: u32,

    /// The originating immutable descriptor
    pub descriptor: &'a RequestDescriptor,
}

/// Stage that mutates the outgoing request before the exchange
#[async_trait]
pub trait Preprocessor: Send + Sync {
    /// Prepare the wire request.
    ///
    /// # Errors
    /// May abort the call with a configuration error; such failures are never
    /// retried.
    async fn prepare(&self, ctx: &PipelineContext<'_>, request: &mut WireRequest) -> Result<()>;
}

/// Stage that validates a response or reacts to it with side effects
#[async_trait]
pub trait Postprocessor: Send + Sync {
    /// Validate the response.
    ///
    /// # Errors
    /// May raise a structured API error, aborting validation; the error is
    /// then offered to the retriers. Best-effort stages must absorb their own
    /// failures and return `Ok`.
    async fn validate(&self, ctx: &PipelineContext<'_>, response: &WireResponse) -> Result<()>;
}

/// Stage that decides whether a failed attempt should be retried
///
/// A retrier may perform the corrective work itself (token refresh,
/// attestation handshake) before answering. Internal failures must map to
/// `false` so the original error surfaces unchanged.
#[async_trait]
pub trait Retrier: Send + Sync {
    async fn should_retry(&self, ctx: &PipelineContext<'_>, error: &Error) -> bool;
}

/// Ordered stage lists driving one [`RequestExecutor`]
#[derive(Clone, Default)]
pub struct Pipeline {
    pub(crate) preprocessors: Vec<Arc<dyn Preprocessor>>,
    pub(crate) postprocessors: Vec<Arc<dyn Postprocessor>>,
    pub(crate) retriers: Vec<Arc<dyn Retrier>>,
}

impl Pipeline {
    /// Create an empty pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a preprocessor; stages run in registration order.
    #[must_use]
    pub fn with_preprocessor(mut self, stage: Arc<dyn Preprocessor>) -> Self {
        self.preprocessors.push(stage);
        self
    }

    /// Append a postprocessor; stages run in registration order.
    #[must_use]
    pub fn with_postprocessor(mut self, stage: Arc<dyn Postprocessor>) -> Self {
        self.postprocessors.push(stage);
        self
    }

    /// Append a retrier; retriers are consulted in registration order.
    #[must_use]
    pub fn with_retrier(mut self, stage: Arc<dyn Retrier>) -> Self {
        self.retriers.push(stage);
        self
    }
}
