//! Process-wide client snapshot state
//!
//! Holds the last-known-good [`Client`] snapshot. Only response
//! postprocessors that successfully decoded a piggy-backed payload overwrite
//! it; external flow logic reads it.

use parking_lot::RwLock;

use clasp_domain::Client;

/// Shared last-known-good client snapshot
#[derive(Default)]
pub struct ClientState {
    inner: RwLock<Option<Client>>,
}

impl ClientState {
    /// Create an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot with a freshly decoded one.
    pub fn set(&self, client: Client) {
        *self.inner.write() = Some(client);
    }

    /// Clone out the current snapshot.
    #[must_use]
    pub fn get(&self) -> Option<Client> {
        self.inner.read().clone()
    }

    /// Drop the snapshot (e.g. on sign-out).
    pub fn clear(&self) {
        *self.inner.write() = None;
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the client snapshot state.
    use super::*;

    #[test]
    fn test_set_get_clear() {
        let state = ClientState::new();
        assert!(state.get().is_none());

        let client: Client = serde_json::from_str(r#"{"id": "client_1"}"#).unwrap();
        state.set(client.clone());
        assert_eq!(state.get(), Some(client));

        state.clear();
        assert!(state.get().is_none());
    }
}
