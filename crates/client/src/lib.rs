//! Client SDK for a hosted authentication service
//!
//! The crate is organized around one idea: every API call is an immutable
//! [`http::RequestDescriptor`] pushed through a pipeline of narrow stages.
//! Preprocessors resolve the URL and attach ambient credentials,
//! postprocessors persist rotated device tokens, sync the piggy-backed client
//! snapshot, emit domain events, and translate error envelopes, and retriers
//! perform corrective work (session token refresh, device attestation) before
//! a bounded retry.
//!
//! [`AuthClient`] wires the whole thing; [`token::TokenCache`] and
//! [`attestation::AttestationCoordinator`] de-duplicate expensive credential
//! work across concurrent callers.

pub mod attestation;
pub mod client;
pub mod config;
pub mod events;
pub mod http;
pub mod pipeline;
pub mod state;
pub mod storage;
pub mod testing;
pub mod token;

pub use clasp_domain::{ApiError, AuthEvent, Client, Error, Result, SessionToken};

pub use client::AuthClient;
pub use config::SdkConfig;
pub use http::RequestDescriptor;
pub use storage::Storage;
pub use token::GetTokenOptions;
