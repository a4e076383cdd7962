//! Resident session management for Concierge.
//!
//! This crate holds everything the session store composes, none of which
//! spawns tasks or owns a runtime:
//!
//! 1. **Masking** ([`mask_identifier`]): redacting an email or phone
//!    number for display.
//! 2. **Identity verification** ([`IdentityVerifier`] trait): turning a
//!    confirmed one-time code into a [`UserIdentity`](concierge_protocol::UserIdentity).
//! 3. **Persistence** ([`SessionStorage`] port, [`SessionPersistence`]
//!    adapter): reading and writing the durable session record.
//! 4. **State machine** ([`SessionMachine`]): every status transition,
//!    with its preconditions and invariants.
//!
//! # How it fits in the stack
//!
//! ```text
//! Store (concierge)  ← serializes operations, adds latency, broadcasts
//!     ↕
//! Session layer (this crate)  ← transitions, challenges, persistence
//!     ↕
//! Data model (concierge-protocol)  ← snapshot, challenge, record types
//! ```

mod clock;
mod config;
mod error;
mod machine;
mod mask;
mod persistence;
mod storage;
mod verify;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{DEFAULT_STORAGE_KEY, LatencyConfig, SessionConfig};
pub use error::{SessionError, StorageError, VerificationError};
pub use machine::SessionMachine;
pub use mask::{infer_channel, mask_identifier};
pub use persistence::SessionPersistence;
pub use storage::{FileStorage, MemoryStorage, SessionStorage, is_valid_key};
pub use verify::{DEMO_OTP_CODE, DemoVerifier, IdentityVerifier};
