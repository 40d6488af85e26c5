//! SDK configuration
//!
//! One [`SdkConfig`] is constructed at initialization and threaded to every
//! component through the [`crate::AuthClient`]; there is no global state.

use std::time::Duration;

/// API version advertised on every outgoing request.
pub const DEFAULT_API_VERSION: &str = "2025-04-10";

/// SDK identity advertised on every outgoing request.
pub const DEFAULT_SDK_IDENTITY: &str = concat!("clasp-rust/", env!("CARGO_PKG_VERSION"));

/// Header names attached by the pipeline.
pub mod headers {
    /// API version header
    pub const API_VERSION: &str = "x-api-version";

    /// SDK identity header
    pub const SDK_IDENTITY: &str = "x-sdk-client";

    /// Stable per-install device identity header
    pub const DEVICE_ID: &str = "x-device-id";

    /// Device credential, both outgoing (request) and incoming (response)
    pub const AUTHORIZATION: &str = "authorization";

    /// Content type for form-encoded bodies
    pub const CONTENT_TYPE: &str = "content-type";
}

/// Storage keys used by the pipeline.
pub mod storage_keys {
    /// Persisted device credential read back from response headers
    pub const DEVICE_TOKEN: &str = "device_token";

    /// Stable per-install device identifier
    pub const DEVICE_ID: &str = "device_id";
}

/// Query parameter carrying the session context.
pub const SESSION_QUERY_PARAM: &str = "_session_id";

/// Configuration for the Clasp SDK
#[derive(Debug, Clone)]
pub struct SdkConfig {
    /// Base URL for the API (e.g. "https://api.example.com"). May be empty,
    /// in which case every descriptor must carry an absolute URL.
    pub base_url: String,

    /// Value of the API version header
    pub api_version: String,

    /// Value of the SDK identity header
    pub sdk_identity: String,

    /// Total attempts per logical call (initial try + retries)
    pub max_attempts: u32,

    /// Deadline for a single transport exchange
    pub timeout: Duration,

    /// Default remaining-lifetime floor for token cache reads
    pub token_expiration_buffer: Duration,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_version: DEFAULT_API_VERSION.to_string(),
            sdk_identity: DEFAULT_SDK_IDENTITY.to_string(),
            max_attempts: 3,
            timeout: Duration::from_secs(30),
            token_expiration_buffer: Duration::from_secs(10),
        }
    }
}

impl SdkConfig {
    /// Convenience constructor for the common case.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), ..Self::default() }
    }
}
