//! Session data model for Concierge.
//!
//! This crate defines the values the rest of the workspace passes around:
//!
//! - **Types** ([`SessionSnapshot`], [`AuthChallenge`], [`UserIdentity`],
//!   registration request/response) describing the client's auth state.
//! - **Persisted record** ([`PersistedSession`]): the durable projection
//!   of a snapshot that survives a restart.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how the persisted record
//!   is converted to and from bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! # Architecture
//!
//! ```text
//! Store (concierge) → Session machine (concierge-session) → Types (this crate)
//! ```
//!
//! Nothing here knows about storage, clocks, or tasks. It only knows what
//! the data looks like and how to serialize it.

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    AuthChallenge, ChallengeChannel, PersistedSession, PersistedStatus,
    RegistrationPayload, RegistrationResult, RegistrationStatus,
    SessionSnapshot, SessionStatus, UserIdentity,
};
