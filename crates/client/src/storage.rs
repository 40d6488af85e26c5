//! Storage collaborator interface
//!
//! Abstracts the host application's secure storage (keychain, keystore, ...)
//! behind a narrow get/set/delete-by-key trait so the pipeline can persist
//! device credentials without knowing where they live.

use async_trait::async_trait;
use clasp_domain::Result;

/// Trait for persistent key/value storage
///
/// Implementations must be safe for concurrent use; the pipeline calls into
/// storage from overlapping request tasks.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Store a value under the given key, overwriting any previous value.
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()>;

    /// Retrieve the value stored under the given key.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Delete the value stored under the given key. Deleting a missing key is
    /// not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check whether a value exists for the given key.
    async fn has(&self, key: &str) -> bool;
}

/// Read a UTF-8 string value, treating undecodable bytes as absent.
pub(crate) async fn get_string(storage: &dyn Storage, key: &str) -> Result<Option<String>> {
    Ok(storage.get(key).await?.and_then(|bytes| String::from_utf8(bytes).ok()))
}
