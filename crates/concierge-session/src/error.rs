//! Error types for the session layer.

use concierge_protocol::ProtocolError;

/// Errors that can occur while driving the session state machine.
///
/// Every variant leaves the live snapshot exactly as it was before the
/// failed operation.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The confirmation references a challenge that is not the current
    /// one, or there is no outstanding challenge at all.
    #[error("no outstanding login challenge with that id")]
    ChallengeNotFound,

    /// The challenge exists but its validity window has passed.
    #[error("login challenge has expired")]
    ChallengeExpired,

    /// The submitted one-time code was rejected.
    #[error("invalid one-time code")]
    InvalidCode,

    /// `initiate_login` was called with a blank identifier.
    #[error("login identifier must not be empty")]
    EmptyIdentifier,

    /// The registration payload is missing a required field.
    #[error("registration rejected: {0}")]
    RegistrationRejected(String),

    /// The identity verifier could not be reached or failed internally.
    #[error("identity verification unavailable: {0}")]
    VerificationUnavailable(String),

    /// An operation ran before the persisted session was restored.
    #[error("session has not been hydrated yet")]
    NotHydrated,

    /// Hydration was attempted a second time.
    #[error("session was already hydrated")]
    AlreadyHydrated,

    /// Writing or removing the persisted record failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The persisted record could not be encoded.
    #[error(transparent)]
    Codec(#[from] ProtocolError),
}

/// Errors raised by a [`SessionStorage`](crate::SessionStorage) backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage i/o failed for key {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Keys are restricted to `[A-Za-z0-9._-]` and may not start with a
    /// dot, so a key can never escape the storage directory.
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),
}

/// Errors an [`IdentityVerifier`](crate::IdentityVerifier) may return.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    /// The code does not match what was sent for this challenge.
    #[error("code rejected")]
    InvalidCode,

    /// The upstream directory could not answer.
    #[error("verifier unavailable: {0}")]
    Unavailable(String),
}

impl From<VerificationError> for SessionError {
    fn from(err: VerificationError) -> Self {
        match err {
            VerificationError::InvalidCode => Self::InvalidCode,
            VerificationError::Unavailable(reason) => Self::VerificationUnavailable(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_invalid_code_maps_to_invalid_code() {
        let err: SessionError = VerificationError::InvalidCode.into();
        assert!(matches!(err, SessionError::InvalidCode));
    }

    #[test]
    fn test_verification_unavailable_keeps_reason() {
        let err: SessionError = VerificationError::Unavailable("directory down".into()).into();
        assert!(matches!(err, SessionError::VerificationUnavailable(_)));
        assert!(err.to_string().contains("directory down"));
    }

    #[test]
    fn test_storage_error_converts_with_question_mark() {
        fn write() -> Result<(), SessionError> {
            let backend: Result<(), StorageError> = Err(StorageError::InvalidKey("../etc".into()));
            backend?;
            Ok(())
        }
        assert!(matches!(write(), Err(SessionError::Storage(_))));
    }
}
