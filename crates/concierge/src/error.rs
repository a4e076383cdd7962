//! Unified error type for the Concierge store.

use concierge_session::SessionError;

/// Top-level error returned by [`SessionStore`](crate::SessionStore)
/// operations.
///
/// The `#[from]` attribute generates the `From` impl, so `?` lifts a
/// [`SessionError`] into this type automatically. UI code typically
/// matches on the `Session` variant to pick a notification.
#[derive(Debug, thiserror::Error)]
pub enum ConciergeError {
    /// The session machine rejected the operation.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The store's actor has stopped, so the command could not be
    /// delivered or answered.
    #[error("session store is unavailable")]
    Unavailable,

    /// The tracing subscriber could not be installed.
    #[error("telemetry setup failed: {0}")]
    Telemetry(String),
}

impl ConciergeError {
    /// The underlying session error, if this is one.
    pub fn as_session(&self) -> Option<&SessionError> {
        match self {
            Self::Session(e) => Some(e),
            _ => None,
        }
    }
}
