//! Error types for the data model layer.
//!
//! Each crate in Concierge defines its own error enum, so a
//! `ProtocolError` always means the problem is in (de)serialization and
//! not in storage or in the session state machine.

/// Errors that can occur while encoding or decoding session records.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust value into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust value).
    ///
    /// Common causes: truncated writes, hand-edited records, or a
    /// `status` value outside the persisted set (e.g. `"checking"`).
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The record decoded but breaks a rule of the data model, such as
    /// an `authenticated` record that carries no user.
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}
