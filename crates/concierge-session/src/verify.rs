//! Identity verification hook for confirming one-time codes.
//!
//! The session machine doesn't know how codes are checked or where
//! residents are looked up. It defines the [`IdentityVerifier`] trait:
//! given the outstanding challenge and the submitted code, return the
//! resident's identity or an error. A deployment plugs in its identity
//! provider; tests and the demo use [`DemoVerifier`].

use std::future::Future;

use concierge_protocol::{AuthChallenge, UserIdentity};

use crate::VerificationError;

/// The one code [`DemoVerifier`] accepts.
pub const DEMO_OTP_CODE: &str = "123456";

/// Checks a one-time code and resolves the resident behind it.
///
/// - `Send + Sync` → the verifier is shared with the store's actor task.
/// - `'static` → it lives as long as the store.
///
/// The machine has already checked that the challenge is current and
/// unexpired before this is called.
///
/// # Example
///
/// ```rust
/// use concierge_protocol::{AuthChallenge, UserIdentity};
/// use concierge_session::{IdentityVerifier, VerificationError};
///
/// /// Accepts the last six digits of the identifier as the code.
/// struct SuffixVerifier;
///
/// impl IdentityVerifier for SuffixVerifier {
///     async fn verify(
///         &self,
///         challenge: &AuthChallenge,
///         code: &str,
///     ) -> Result<UserIdentity, VerificationError> {
///         let six_digits = code.len() == 6 && code.chars().all(|c| c.is_ascii_digit());
///         if !six_digits || !challenge.identifier.ends_with(code) {
///             return Err(VerificationError::InvalidCode);
///         }
///         Ok(UserIdentity {
///             id: challenge.identifier.clone(),
///             display_name: "Resident".into(),
///             identifier: challenge.identifier.clone(),
///             unit_code: None,
///         })
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// # let now = chrono::Utc::now();
/// # let challenge = AuthChallenge {
/// #     id: "c1".into(),
/// #     identifier: "5551234567".into(),
/// #     masked_identifier: "******4567".into(),
/// #     channel: concierge_protocol::ChallengeChannel::Sms,
/// #     created_at: now,
/// #     expires_at: now,
/// # };
/// assert!(SuffixVerifier.verify(&challenge, "234567").await.is_ok());
/// assert!(SuffixVerifier.verify(&challenge, "").await.is_err());
/// assert!(SuffixVerifier.verify(&challenge, "4567").await.is_err());
/// # }
/// ```
pub trait IdentityVerifier: Send + Sync + 'static {
    /// Validates `code` for `challenge`.
    ///
    /// # Returns
    /// - `Ok(UserIdentity)`: the code is right, here's who logged in
    /// - `Err(VerificationError::InvalidCode)`: wrong code
    /// - `Err(VerificationError::Unavailable)`: the directory couldn't answer
    fn verify(
        &self,
        challenge: &AuthChallenge,
        code: &str,
    ) -> impl Future<Output = Result<UserIdentity, VerificationError>> + Send;
}

/// Accepts [`DEMO_OTP_CODE`] for any challenge and resolves every login
/// to the same demo resident.
#[derive(Debug, Clone, Copy, Default)]
pub struct DemoVerifier;

impl IdentityVerifier for DemoVerifier {
    async fn verify(
        &self,
        challenge: &AuthChallenge,
        code: &str,
    ) -> Result<UserIdentity, VerificationError> {
        if code != DEMO_OTP_CODE {
            return Err(VerificationError::InvalidCode);
        }
        Ok(UserIdentity {
            id: "resident-demo".to_string(),
            display_name: "Demo Resident".to_string(),
            identifier: challenge.identifier.clone(),
            unit_code: Some("A-101".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use concierge_protocol::ChallengeChannel;

    use super::*;

    fn challenge() -> AuthChallenge {
        let now = Utc::now();
        AuthChallenge {
            id: "abc".into(),
            identifier: "+15551234567".into(),
            masked_identifier: "+*******4567".into(),
            channel: ChallengeChannel::Sms,
            created_at: now,
            expires_at: now + Duration::minutes(5),
        }
    }

    #[tokio::test]
    async fn test_demo_verifier_accepts_demo_code() {
        let user = DemoVerifier
            .verify(&challenge(), DEMO_OTP_CODE)
            .await
            .expect("demo code should verify");

        assert_eq!(user.identifier, "+15551234567");
        assert_eq!(user.id, "resident-demo");
    }

    #[tokio::test]
    async fn test_demo_verifier_rejects_other_codes() {
        for code in ["000000", "12345", "1234567", "", " 123456"] {
            let result = DemoVerifier.verify(&challenge(), code).await;
            assert!(
                matches!(result, Err(VerificationError::InvalidCode)),
                "code {code:?} should be rejected"
            );
        }
    }
}
