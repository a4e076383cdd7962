//! Persistence adapter: the bridge between a live snapshot and the
//! record in storage.
//!
//! Only the store calls this. It never decides what the session should
//! be; it only writes the projection it is handed and reads back what it
//! finds.

use std::sync::Arc;

use concierge_protocol::{Codec, JsonCodec, PersistedSession, SessionSnapshot};

use crate::{SessionError, SessionStorage};

/// Reads and writes the persisted session record under a fixed key.
pub struct SessionPersistence<C: Codec = JsonCodec> {
    storage: Arc<dyn SessionStorage>,
    codec: C,
    key: String,
}

impl<C: Codec> SessionPersistence<C> {
    pub fn new(storage: Arc<dyn SessionStorage>, codec: C, key: impl Into<String>) -> Self {
        Self {
            storage,
            codec,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Restores the snapshot stored under the key.
    ///
    /// Returns `None` when there is no record, and also when the record
    /// can't be read, can't be decoded, or breaks the snapshot
    /// invariants. Those cases are logged and otherwise treated as "no
    /// session": a corrupt record must never stop the portal from
    /// starting.
    pub fn load(&self) -> Option<SessionSnapshot> {
        let bytes = match self.storage.read(&self.key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                tracing::debug!(key = %self.key, "no persisted session");
                return None;
            }
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "persisted session unreadable, ignoring");
                return None;
            }
        };

        let record: PersistedSession = match self.codec.decode(&bytes) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "persisted session corrupt, ignoring");
                return None;
            }
        };

        match SessionSnapshot::from_persisted(record) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "persisted session corrupt, ignoring");
                None
            }
        }
    }

    /// Writes the durable projection of `snapshot`, replacing whatever
    /// was stored before.
    ///
    /// # Errors
    /// [`SessionError::Codec`] if encoding fails, [`SessionError::Storage`]
    /// if the backend write fails.
    pub fn save(&self, snapshot: &SessionSnapshot) -> Result<(), SessionError> {
        let record = PersistedSession::from_snapshot(snapshot);
        let bytes = self.codec.encode(&record)?;
        self.storage.write(&self.key, &bytes)?;
        tracing::debug!(key = %self.key, status = %snapshot.status, "session persisted");
        Ok(())
    }

    /// Removes the persisted record entirely.
    pub fn clear(&self) -> Result<(), SessionError> {
        self.storage.remove(&self.key)?;
        Ok(())
    }
}
