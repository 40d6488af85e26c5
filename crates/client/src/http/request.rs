//! Request model
//!
//! A [`RequestDescriptor`] is the immutable description of one logical call.
//! Each retry attempt rebuilds a fresh mutable [`WireRequest`] from it so
//! headers reflecting updated credentials (device token, session token) are
//! recomputed rather than carried over from a failed attempt.

use std::collections::BTreeMap;

use clasp_domain::{Error, Result};
use reqwest::Method;
use url::Url;

/// Body of an outgoing request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// No body
    Empty,
    /// Pre-encoded bytes, sent as-is
    Raw(Vec<u8>),
    /// Name/value pairs to be form-encoded by the pipeline
    Form(Vec<(String, String)>),
}

impl Body {
    /// Whether the request carries any payload.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Raw(bytes) => bytes.is_empty(),
            Self::Form(pairs) => pairs.is_empty(),
        }
    }
}

/// Immutable description of one logical API call
///
/// Construct with the method helpers and consuming builder methods:
///
/// ```
/// use clasp_client::http::RequestDescriptor;
///
/// let descriptor = RequestDescriptor::post("/v1/client/sign_ins")
///     .form([("identifier", "user@example.com")])
///     .session("sess_123");
/// ```
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub path: String,
    pub method: Method,
    pub headers: Vec<(String, String)>,
    /// Ordered query items; `None` values render as bare flags
    pub query: Vec<(String, Option<String>)>,
    pub body: Body,
    /// Session context; drives the session query parameter and token refresh
    pub session_id: Option<String>,
}

impl RequestDescriptor {
    /// Create a descriptor for the given method and path.
    ///
    /// `path` is resolved against the configured base URL unless it is
    /// already absolute.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            headers: Vec::new(),
            query: Vec::new(),
            body: Body::Empty,
            session_id: None,
        }
    }

    /// Shorthand for a GET descriptor.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Shorthand for a POST descriptor.
    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Shorthand for a PUT descriptor.
    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// Shorthand for a PATCH descriptor.
    #[must_use]
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    /// Shorthand for a DELETE descriptor.
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Add a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Add a query item with a value.
    #[must_use]
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), Some(value.into())));
        self
    }

    /// Add a bare query flag without a value.
    #[must_use]
    pub fn query_flag(mut self, name: impl Into<String>) -> Self {
        self.query.push((name.into(), None));
        self
    }

    /// Set a form-encoded body.
    #[must_use]
    pub fn form<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.body =
            Body::Form(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    /// Set a raw byte body.
    #[must_use]
    pub fn raw_body(mut self, bytes: Vec<u8>) -> Self {
        self.body = Body::Raw(bytes);
        self
    }

    /// Attach a session context.
    #[must_use]
    pub fn session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Build a fresh mutable wire request for one attempt.
    #[must_use]
    pub(crate) fn to_wire(&self) -> WireRequest {
        let mut wire = WireRequest {
            method: self.method.clone(),
            path: self.path.clone(),
            url: None,
            headers: BTreeMap::new(),
            query: self.query.clone(),
            body: self.body.clone(),
        };
        for (name, value) in &self.headers {
            wire.set_header(name, value.clone());
        }
        wire
    }
}

/// Mutable outgoing request for a single attempt
///
/// Preprocessors mutate this in registration order before the transport
/// exchange; it is discarded after the attempt.
#[derive(Debug, Clone)]
pub struct WireRequest {
    pub method: Method,
    pub path: String,
    /// Absolute URL, resolved by the URL preprocessor
    pub url: Option<Url>,
    /// Header map with lowercased names
    pub headers: BTreeMap<String, String>,
    pub query: Vec<(String, Option<String>)>,
    pub body: Body,
}

impl WireRequest {
    /// Set a header, lowercasing the name.
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.insert(name.to_ascii_lowercase(), value);
    }

    /// Look up a header by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Whether a query item with the given name is already present.
    #[must_use]
    pub fn has_query(&self, name: &str) -> bool {
        self.query.iter().any(|(n, _)| n == name)
    }

    /// Final URL with query items applied, in insertion order.
    ///
    /// # Errors
    /// Returns a configuration error when the URL preprocessor has not run.
    pub fn final_url(&self) -> Result<Url> {
        let mut url = self
            .url
            .clone()
            .ok_or_else(|| Error::Configuration("request URL was never resolved".to_string()))?;

        if !self.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in &self.query {
                match value {
                    Some(value) => {
                        pairs.append_pair(name, value);
                    }
                    None => {
                        pairs.append_key_only(name);
                    }
                }
            }
        }

        Ok(url)
    }
}

/// Encode form pairs as `application/x-www-form-urlencoded` bytes.
pub(crate) fn encode_form(pairs: &[(String, String)]) -> Vec<u8> {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (name, value) in pairs {
        serializer.append_pair(name, value);
    }
    serializer.finish().into_bytes()
}

/// Response of one transport exchange
#[derive(Debug, Clone)]
pub struct WireResponse {
    pub status: u16,
    /// Header map with lowercased names
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl WireResponse {
    /// Build a response, lowercasing header names.
    #[must_use]
    pub fn new(status: u16, headers: Vec<(String, String)>, body: Vec<u8>) -> Self {
        Self {
            status,
            headers: headers
                .into_iter()
                .map(|(name, value)| (name.to_ascii_lowercase(), value))
                .collect(),
            body,
        }
    }

    /// Look up a header by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Whether the status is in the 2xx range.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
