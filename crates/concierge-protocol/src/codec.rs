//! Codec trait and implementations for serializing session records.
//!
//! The persistence adapter doesn't care HOW a record is turned into
//! bytes. It only needs something that implements [`Codec`]. Today that
//! is [`JsonCodec`], which keeps the stored record readable in a text
//! editor or a browser's storage inspector.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust values to bytes and decode bytes back.
///
/// - `Send + Sync` → the codec lives inside the store's actor task,
///   which Tokio may move between worker threads.
/// - `'static` → the codec owns everything it needs.
///
/// `DeserializeOwned` (vs plain `Deserialize`) means the decoded value
/// doesn't borrow from the input buffer, so the buffer read from storage
/// can be dropped right after decoding.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// This is behind the `json` feature flag (enabled by default).
///
/// ## Example
///
/// ```rust
/// use concierge_protocol::{Codec, JsonCodec, PersistedSession, PersistedStatus};
///
/// let codec = JsonCodec;
/// let record = PersistedSession {
///     status: PersistedStatus::Unauthenticated,
///     user: None,
///     last_login: None,
///     pending_message: None,
/// };
///
/// let bytes = codec.encode(&record).unwrap();
/// assert_eq!(bytes, br#"{"status":"unauthenticated"}"#);
///
/// let decoded: PersistedSession = codec.decode(&bytes).unwrap();
/// assert_eq!(record, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
