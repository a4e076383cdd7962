//! `SessionStoreBuilder`: wires storage, clock, and verifier into a
//! running store.

use std::sync::Arc;

use concierge_protocol::{Codec, JsonCodec};
use concierge_session::{
    Clock, IdentityVerifier, MemoryStorage, SessionConfig, SessionStorage, SystemClock,
};

use crate::SessionStore;
use crate::store::spawn_store;

/// Builder for configuring and starting a [`SessionStore`].
///
/// Defaults: [`SessionConfig::default()`], in-memory storage, the system
/// clock, and [`JsonCodec`] for the persisted record.
///
/// # Example
///
/// ```rust,ignore
/// use concierge::prelude::*;
///
/// let store = SessionStore::builder()
///     .config(SessionConfig::default())
///     .storage(FileStorage::new("/var/lib/concierge"))
///     .build(DemoVerifier);
/// ```
pub struct SessionStoreBuilder {
    config: SessionConfig,
    storage: Option<Arc<dyn SessionStorage>>,
    clock: Arc<dyn Clock>,
}

impl SessionStoreBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: SessionConfig::default(),
            storage: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Sets the session configuration.
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the backend the persisted record is written to.
    pub fn storage(self, storage: impl SessionStorage) -> Self {
        self.shared_storage(Arc::new(storage))
    }

    /// Like [`storage`](Self::storage), for a backend that is already
    /// behind an `Arc`.
    pub fn shared_storage(mut self, storage: Arc<dyn SessionStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Sets the clock used for challenge expiry and login timestamps.
    pub fn clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Spawns the store with the given verifier and the JSON codec.
    ///
    /// # Panics
    /// Must be called from within a Tokio runtime.
    pub fn build<V: IdentityVerifier>(self, verifier: V) -> SessionStore {
        self.build_with_codec(verifier, JsonCodec)
    }

    /// Spawns the store with a custom codec for the persisted record.
    ///
    /// # Panics
    /// Must be called from within a Tokio runtime.
    pub fn build_with_codec<V: IdentityVerifier, C: Codec>(
        self,
        verifier: V,
        codec: C,
    ) -> SessionStore {
        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(MemoryStorage::new()));
        tracing::debug!(
            key = %self.config.storage_key,
            ttl = ?self.config.challenge_ttl,
            "building session store"
        );
        spawn_store(self.config, storage, codec, verifier, self.clock)
    }
}

impl Default for SessionStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}
