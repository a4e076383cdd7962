//! # Concierge
//!
//! Session lifecycle store for a condominium resident portal.
//!
//! Concierge keeps the client's authentication state: whether the
//! resident is signed in, an outstanding one-time-code login challenge,
//! or a registration waiting for building management. One
//! [`SessionStore`] runs per client process; UI code holds cloned
//! handles, calls its operations, and subscribes to snapshot changes.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use concierge::prelude::*;
//!
//! # async fn run() -> Result<(), ConciergeError> {
//! let store = SessionStore::builder()
//!     .storage(FileStorage::new("./state"))
//!     .build(DemoVerifier);
//!
//! let session = store.wait_until_hydrated().await?;
//! if !session.is_authenticated() {
//!     let challenge = store.initiate_login("user@example.com").await?;
//!     store.confirm_login(&challenge.id, DEMO_OTP_CODE).await?;
//! }
//! # Ok(())
//! # }
//! ```

mod builder;
mod error;
mod store;
pub mod telemetry;

pub use builder::SessionStoreBuilder;
pub use error::ConciergeError;
pub use store::SessionStore;

/// Everything a UI layer usually needs, in one import.
pub mod prelude {
    pub use crate::{ConciergeError, SessionStore, SessionStoreBuilder};
    pub use concierge_protocol::{
        AuthChallenge, ChallengeChannel, RegistrationPayload, RegistrationResult,
        RegistrationStatus, SessionSnapshot, SessionStatus, UserIdentity,
    };
    pub use concierge_session::{
        Clock, DEMO_OTP_CODE, DemoVerifier, FileStorage, IdentityVerifier, LatencyConfig,
        MemoryStorage, SessionConfig, SessionError, SessionStorage, SystemClock,
        VerificationError,
    };
}
