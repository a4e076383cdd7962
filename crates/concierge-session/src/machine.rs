//! The session machine: every status transition the client can make.
//!
//! The machine owns the live [`SessionSnapshot`] and decides what the
//! next one looks like. It is synchronous and does no I/O: the store
//! feeds it the current time, the verified identity, and the restored
//! record, and persists a candidate snapshot before committing it.
//!
//! # Commit protocol
//!
//! Transitions that must be persisted are split in two:
//!
//! ```text
//! login_transition() / registration_transition() / logout_transition()
//!         │  (pure, returns the candidate snapshot)
//!         ▼
//!     persist candidate ──(fails)──→ nothing changes
//!         │
//!         ▼
//!      commit()
//! ```
//!
//! so a failed write can never leave a half-updated session behind.
//!
//! # Concurrency note
//!
//! `SessionMachine` is not thread-safe by itself. It is owned by the
//! store's actor task and every operation reaches it through that task's
//! command queue.

use chrono::{DateTime, Utc};
use concierge_protocol::{
    AuthChallenge, RegistrationPayload, RegistrationResult, RegistrationStatus,
    SessionSnapshot, SessionStatus, UserIdentity,
};
use rand::Rng;

use crate::{SessionConfig, SessionError, infer_channel, mask_identifier};

/// Owns the live session snapshot and enforces its state machine.
///
/// ## Lifecycle
///
/// ```text
///                 resolve_hydration()
/// [checking] ─────────────────────────→ [unauthenticated | authenticated | pending]
///
/// [unauthenticated] ──issue_challenge()──→ [unauthenticated + challenge]
///         │                                      │
///         │ registration                         │ validate_challenge() + login
///         ▼                                      ▼
///     [pending] ──logout──→ [unauthenticated] ←──logout── [authenticated]
/// ```
#[derive(Debug)]
pub struct SessionMachine {
    snapshot: SessionSnapshot,
    hydrated: bool,
    challenge_ttl: chrono::Duration,
    review_turnaround: String,
}

impl SessionMachine {
    /// Creates a machine in the `checking` state.
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            snapshot: SessionSnapshot::checking(),
            hydrated: false,
            challenge_ttl: config.challenge_ttl_delta(),
            review_turnaround: config.review_turnaround.clone(),
        }
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> &SessionSnapshot {
        &self.snapshot
    }

    pub fn is_hydrated(&self) -> bool {
        self.hydrated
    }

    // =====================================================================
    // Hydration
    // =====================================================================

    /// Resolves the initial `checking` status from the restored record.
    ///
    /// `restored` is whatever the persistence adapter could read; `None`
    /// (missing or corrupt) resolves to `unauthenticated`. Any challenge
    /// on the restored snapshot is dropped.
    ///
    /// # Errors
    /// [`SessionError::AlreadyHydrated`] if called more than once. This
    /// is the only place `checking` is ever left, and it is left once.
    pub fn resolve_hydration(
        &mut self,
        restored: Option<SessionSnapshot>,
    ) -> Result<&SessionSnapshot, SessionError> {
        if self.hydrated {
            return Err(SessionError::AlreadyHydrated);
        }

        self.snapshot = match restored {
            Some(mut snapshot) if snapshot.status.is_resolved() => {
                snapshot.challenge = None;
                snapshot
            }
            _ => SessionSnapshot::unauthenticated(None),
        };
        self.hydrated = true;

        tracing::info!(status = %self.snapshot.status, "session hydrated");
        Ok(&self.snapshot)
    }

    // =====================================================================
    // Login
    // =====================================================================

    /// Issues a fresh OTP challenge for `identifier`.
    ///
    /// Replaces any outstanding challenge, signs the current user out,
    /// and clears a pending registration message: a login attempt always
    /// starts from `unauthenticated`. Nothing here is persisted;
    /// challenges are ephemeral.
    ///
    /// # Errors
    /// - [`SessionError::NotHydrated`] before hydration resolved
    /// - [`SessionError::EmptyIdentifier`] for a blank identifier
    pub fn issue_challenge(
        &mut self,
        identifier: &str,
        now: DateTime<Utc>,
    ) -> Result<AuthChallenge, SessionError> {
        self.ensure_hydrated()?;
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(SessionError::EmptyIdentifier);
        }

        let challenge = AuthChallenge {
            id: generate_token(),
            identifier: identifier.to_string(),
            masked_identifier: mask_identifier(identifier),
            channel: infer_channel(identifier),
            created_at: now,
            expires_at: now + self.challenge_ttl,
        };

        if let Some(previous) = &self.snapshot.challenge {
            tracing::debug!(challenge_id = %previous.id, "discarding previous challenge");
        }

        self.snapshot = SessionSnapshot {
            challenge: Some(challenge.clone()),
            ..SessionSnapshot::unauthenticated(self.snapshot.last_login)
        };

        tracing::info!(
            challenge_id = %challenge.id,
            channel = %challenge.channel,
            to = %challenge.masked_identifier,
            "login challenge issued"
        );
        Ok(challenge)
    }

    /// Checks that `challenge_id` names the outstanding challenge and that
    /// it hasn't expired at `now`.
    ///
    /// The checks run in a fixed order so exactly one error is reported:
    /// missing or mismatched challenge first, then expiry. Code
    /// verification comes after this and is the verifier's job.
    ///
    /// # Errors
    /// - [`SessionError::NotHydrated`]
    /// - [`SessionError::ChallengeNotFound`]
    /// - [`SessionError::ChallengeExpired`]
    pub fn validate_challenge(
        &self,
        challenge_id: &str,
        now: DateTime<Utc>,
    ) -> Result<&AuthChallenge, SessionError> {
        self.ensure_hydrated()?;
        let challenge = self
            .snapshot
            .challenge
            .as_ref()
            .filter(|c| c.id == challenge_id)
            .ok_or(SessionError::ChallengeNotFound)?;

        if challenge.is_expired(now) {
            tracing::debug!(challenge_id, "challenge expired");
            return Err(SessionError::ChallengeExpired);
        }
        Ok(challenge)
    }

    /// The snapshot after a successful confirmation: authenticated as
    /// `user`, challenge consumed, `last_login = now`.
    pub fn login_transition(&self, user: UserIdentity, now: DateTime<Utc>) -> SessionSnapshot {
        SessionSnapshot {
            status: SessionStatus::Authenticated,
            user: Some(user),
            challenge: None,
            last_login: Some(now),
            pending_message: None,
        }
    }

    // =====================================================================
    // Registration
    // =====================================================================

    /// Checks the required registration fields.
    ///
    /// # Errors
    /// [`SessionError::RegistrationRejected`] naming the first blank field.
    pub fn validate_registration(payload: &RegistrationPayload) -> Result<(), SessionError> {
        let required = [
            ("name", &payload.name),
            ("email", &payload.email),
            ("unit code", &payload.unit_code),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(SessionError::RegistrationRejected(format!("{field} is required")));
            }
        }
        Ok(())
    }

    /// The snapshot and acknowledgement for a submitted registration.
    ///
    /// The candidate is `pending` with a message naming the unit; user and
    /// challenge are cleared and `last_login` is kept.
    ///
    /// # Errors
    /// - [`SessionError::NotHydrated`]
    /// - [`SessionError::RegistrationRejected`]
    pub fn registration_transition(
        &self,
        payload: &RegistrationPayload,
        now: DateTime<Utc>,
    ) -> Result<(SessionSnapshot, RegistrationResult), SessionError> {
        self.ensure_hydrated()?;
        Self::validate_registration(payload)?;

        let unit_code = payload.unit_code.trim();
        let result = RegistrationResult {
            tracking_id: generate_tracking_id(),
            status: RegistrationStatus::PendingReview,
            estimated_response: self.review_turnaround.clone(),
            submitted_at: now,
        };
        let next = SessionSnapshot {
            status: SessionStatus::Pending,
            user: None,
            challenge: None,
            last_login: self.snapshot.last_login,
            pending_message: Some(pending_message(unit_code)),
        };
        Ok((next, result))
    }

    // =====================================================================
    // Logout / cancellation
    // =====================================================================

    /// The snapshot after logout. The same value from every starting
    /// state, which is what makes logout idempotent.
    pub fn logout_transition(&self) -> SessionSnapshot {
        SessionSnapshot::unauthenticated(self.snapshot.last_login)
    }

    /// Drops the outstanding challenge, if any, leaving the status alone.
    ///
    /// Returns `true` if a challenge was dropped.
    pub fn clear_challenge(&mut self) -> bool {
        match self.snapshot.challenge.take() {
            Some(challenge) => {
                tracing::info!(challenge_id = %challenge.id, "login challenge cancelled");
                true
            }
            None => false,
        }
    }

    // =====================================================================
    // Commit
    // =====================================================================

    /// Replaces the live snapshot with a candidate produced by one of the
    /// `*_transition` methods, after the caller has persisted it.
    ///
    /// # Errors
    /// [`SessionError::NotHydrated`] before hydration resolved.
    pub fn commit(&mut self, next: SessionSnapshot) -> Result<&SessionSnapshot, SessionError> {
        self.ensure_hydrated()?;
        debug_assert!(next.status.is_resolved(), "only hydration may leave checking");
        if self.snapshot.status != next.status {
            tracing::info!(from = %self.snapshot.status, to = %next.status, "session status changed");
        }
        self.snapshot = next;
        Ok(&self.snapshot)
    }

    fn ensure_hydrated(&self) -> Result<(), SessionError> {
        if self.hydrated {
            Ok(())
        } else {
            Err(SessionError::NotHydrated)
        }
    }
}

/// Message shown to a resident whose registration awaits review.
fn pending_message(unit_code: &str) -> String {
    format!("Your registration for unit {unit_code} is awaiting review by building management.")
}

/// Generates a random 32-character hex string (128 bits of entropy) used
/// as a challenge id.
fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// `REG-` plus 8 uppercase hex characters.
fn generate_tracking_id() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 4] = rng.random();
    let suffix: String = bytes.iter().map(|b| format!("{b:02X}")).collect();
    format!("REG-{suffix}")
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Unit tests for `SessionMachine`.
    //!
    //! Naming convention: `test_{function}_{scenario}_{expected}`.
    //!
    //! Time is passed in explicitly, so expiry is tested by handing the
    //! machine an instant past `expires_at` instead of sleeping.

    use chrono::{Duration, TimeZone};
    use concierge_protocol::ChallengeChannel;

    use super::*;

    // -- Helpers ----------------------------------------------------------

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 4, 8, 0, 0).unwrap()
    }

    fn fresh() -> SessionMachine {
        SessionMachine::new(&SessionConfig::default())
    }

    fn hydrated() -> SessionMachine {
        let mut machine = fresh();
        machine.resolve_hydration(None).unwrap();
        machine
    }

    fn resident() -> UserIdentity {
        UserIdentity {
            id: "resident-demo".into(),
            display_name: "Demo Resident".into(),
            identifier: "user@example.com".into(),
            unit_code: Some("A-101".into()),
        }
    }

    fn payload(unit: &str) -> RegistrationPayload {
        RegistrationPayload {
            name: "A".into(),
            email: "a@b.com".into(),
            unit_code: unit.into(),
            phone: None,
        }
    }

    fn login(machine: &mut SessionMachine) {
        let c = machine.issue_challenge("user@example.com", t0()).unwrap();
        machine.validate_challenge(&c.id, t0()).unwrap();
        let next = machine.login_transition(resident(), t0());
        machine.commit(next).unwrap();
    }

    // =====================================================================
    // resolve_hydration()
    // =====================================================================

    #[test]
    fn test_new_machine_is_checking() {
        let machine = fresh();
        assert_eq!(machine.snapshot().status, SessionStatus::Checking);
        assert!(!machine.is_hydrated());
    }

    #[test]
    fn test_resolve_hydration_without_record_is_unauthenticated() {
        let mut machine = fresh();

        let snapshot = machine.resolve_hydration(None).unwrap();

        assert_eq!(snapshot.status, SessionStatus::Unauthenticated);
        assert!(snapshot.user.is_none());
        assert!(snapshot.challenge.is_none());
    }

    #[test]
    fn test_resolve_hydration_restores_cached_session_without_challenge() {
        let mut machine = fresh();
        let restored = SessionSnapshot {
            status: SessionStatus::Authenticated,
            user: Some(resident()),
            challenge: Some(AuthChallenge {
                id: "stale".into(),
                identifier: "x@y.z".into(),
                masked_identifier: "x***@y.z".into(),
                channel: ChallengeChannel::Email,
                created_at: t0(),
                expires_at: t0(),
            }),
            last_login: Some(t0()),
            pending_message: None,
        };

        let snapshot = machine.resolve_hydration(Some(restored)).unwrap();

        assert_eq!(snapshot.status, SessionStatus::Authenticated);
        assert_eq!(snapshot.user, Some(resident()));
        assert_eq!(snapshot.last_login, Some(t0()));
        assert!(snapshot.challenge.is_none(), "challenges never survive a restart");
    }

    #[test]
    fn test_resolve_hydration_checking_record_falls_back() {
        let mut machine = fresh();

        let snapshot = machine
            .resolve_hydration(Some(SessionSnapshot::checking()))
            .unwrap();

        assert_eq!(snapshot.status, SessionStatus::Unauthenticated);
    }

    #[test]
    fn test_resolve_hydration_twice_returns_error() {
        let mut machine = hydrated();

        let result = machine.resolve_hydration(None);

        assert!(matches!(result, Err(SessionError::AlreadyHydrated)));
    }

    #[test]
    fn test_operations_before_hydration_return_not_hydrated() {
        let mut machine = fresh();

        assert!(matches!(
            machine.issue_challenge("user@example.com", t0()),
            Err(SessionError::NotHydrated)
        ));
        assert!(matches!(
            machine.validate_challenge("x", t0()),
            Err(SessionError::NotHydrated)
        ));
        assert!(matches!(
            machine.registration_transition(&payload("A-101"), t0()),
            Err(SessionError::NotHydrated)
        ));
        let next = machine.logout_transition();
        assert!(matches!(machine.commit(next), Err(SessionError::NotHydrated)));
        assert_eq!(machine.snapshot().status, SessionStatus::Checking);
    }

    // =====================================================================
    // issue_challenge()
    // =====================================================================

    #[test]
    fn test_issue_challenge_email_identifier() {
        let mut machine = hydrated();

        let c = machine.issue_challenge("user@example.com", t0()).unwrap();

        assert_eq!(c.channel, ChallengeChannel::Email);
        assert!(c.masked_identifier.starts_with("us*"));
        assert!(c.masked_identifier.ends_with("@example.com"));
        assert_eq!(c.identifier, "user@example.com");
        assert_eq!(c.id.len(), 32);
        assert_eq!(c.created_at, t0());
        assert_eq!(c.expires_at, t0() + Duration::minutes(5));
    }

    #[test]
    fn test_issue_challenge_phone_identifier_uses_sms() {
        let mut machine = hydrated();

        let c = machine.issue_challenge(" 5551234567 ", t0()).unwrap();

        assert_eq!(c.channel, ChallengeChannel::Sms);
        assert_eq!(c.identifier, "5551234567");
        assert_eq!(c.masked_identifier, "******4567");
    }

    #[test]
    fn test_issue_challenge_blank_identifier_returns_error() {
        let mut machine = hydrated();

        let result = machine.issue_challenge("   ", t0());

        assert!(matches!(result, Err(SessionError::EmptyIdentifier)));
        assert!(machine.snapshot().challenge.is_none());
    }

    #[test]
    fn test_issue_challenge_attaches_challenge_to_snapshot() {
        let mut machine = hydrated();

        let c = machine.issue_challenge("user@example.com", t0()).unwrap();

        let snapshot = machine.snapshot();
        assert_eq!(snapshot.status, SessionStatus::Unauthenticated);
        assert_eq!(snapshot.challenge.as_ref(), Some(&c));
        assert!(snapshot.user.is_none());
    }

    #[test]
    fn test_issue_challenge_replaces_previous() {
        let mut machine = hydrated();
        let first = machine.issue_challenge("user@example.com", t0()).unwrap();

        let second = machine.issue_challenge("user@example.com", t0()).unwrap();

        assert_ne!(first.id, second.id);
        assert!(matches!(
            machine.validate_challenge(&first.id, t0()),
            Err(SessionError::ChallengeNotFound)
        ));
        assert!(machine.validate_challenge(&second.id, t0()).is_ok());
    }

    #[test]
    fn test_issue_challenge_signs_out_authenticated_user() {
        let mut machine = hydrated();
        login(&mut machine);

        machine.issue_challenge("other@example.com", t0()).unwrap();

        assert_eq!(machine.snapshot().status, SessionStatus::Unauthenticated);
        assert!(machine.snapshot().user.is_none());
        assert_eq!(machine.snapshot().last_login, Some(t0()));
    }

    // =====================================================================
    // validate_challenge()
    // =====================================================================

    #[test]
    fn test_validate_challenge_without_challenge_returns_not_found() {
        let machine = hydrated();

        let result = machine.validate_challenge("anything", t0());

        assert!(matches!(result, Err(SessionError::ChallengeNotFound)));
    }

    #[test]
    fn test_validate_challenge_wrong_id_returns_not_found() {
        let mut machine = hydrated();
        machine.issue_challenge("user@example.com", t0()).unwrap();

        let result = machine.validate_challenge("not-the-id", t0());

        assert!(matches!(result, Err(SessionError::ChallengeNotFound)));
    }

    #[test]
    fn test_validate_challenge_after_expiry_returns_expired() {
        let mut machine = hydrated();
        let c = machine.issue_challenge("user@example.com", t0()).unwrap();

        let later = c.expires_at + Duration::seconds(1);
        let result = machine.validate_challenge(&c.id, later);

        assert!(matches!(result, Err(SessionError::ChallengeExpired)));
        assert!(machine.snapshot().challenge.is_some(), "expiry is checked, not swept");
    }

    #[test]
    fn test_validate_challenge_not_found_wins_over_expired() {
        let mut machine = hydrated();
        machine.issue_challenge("user@example.com", t0()).unwrap();

        let result = machine.validate_challenge("other", t0() + Duration::hours(1));

        assert!(matches!(result, Err(SessionError::ChallengeNotFound)));
    }

    #[test]
    fn test_validate_challenge_at_expiry_instant_is_ok() {
        let mut machine = hydrated();
        let c = machine.issue_challenge("user@example.com", t0()).unwrap();

        assert!(machine.validate_challenge(&c.id, c.expires_at).is_ok());
    }

    // =====================================================================
    // login_transition() + commit()
    // =====================================================================

    #[test]
    fn test_login_commit_authenticates_and_consumes_challenge() {
        let mut machine = hydrated();
        let later = t0() + Duration::seconds(30);
        let c = machine.issue_challenge("user@example.com", t0()).unwrap();
        machine.validate_challenge(&c.id, later).unwrap();

        let next = machine.login_transition(resident(), later);
        let snapshot = machine.commit(next).unwrap();

        assert_eq!(snapshot.status, SessionStatus::Authenticated);
        assert_eq!(snapshot.user, Some(resident()));
        assert!(snapshot.challenge.is_none());
        assert_eq!(snapshot.last_login, Some(later));
    }

    #[test]
    fn test_login_transition_does_not_mutate_until_commit() {
        let mut machine = hydrated();
        machine.issue_challenge("user@example.com", t0()).unwrap();
        let before = machine.snapshot().clone();

        let _candidate = machine.login_transition(resident(), t0());

        assert_eq!(machine.snapshot(), &before);
    }

    // =====================================================================
    // registration
    // =====================================================================

    #[test]
    fn test_registration_transition_is_pending_with_unit_message() {
        let mut machine = hydrated();
        machine.issue_challenge("user@example.com", t0()).unwrap();

        let (next, result) = machine
            .registration_transition(&payload("A-101"), t0())
            .unwrap();

        assert_eq!(result.status, RegistrationStatus::PendingReview);
        assert!(result.tracking_id.starts_with("REG-"));
        assert_eq!(result.tracking_id.len(), 12);
        assert_eq!(result.estimated_response, "2-3 business days");
        assert_eq!(next.status, SessionStatus::Pending);
        assert!(next.pending_message.as_deref().unwrap().contains("A-101"));
        assert!(next.challenge.is_none());
        assert!(next.user.is_none());

        machine.commit(next).unwrap();
        assert_eq!(machine.snapshot().status, SessionStatus::Pending);
    }

    #[test]
    fn test_registration_tracking_ids_are_unique() {
        let machine = hydrated();
        let (_, a) = machine.registration_transition(&payload("A-101"), t0()).unwrap();
        let (_, b) = machine.registration_transition(&payload("A-101"), t0()).unwrap();
        assert_ne!(a.tracking_id, b.tracking_id);
    }

    #[test]
    fn test_validate_registration_blank_fields_rejected() {
        let mut missing_name = payload("A-101");
        missing_name.name = " ".into();
        let mut missing_unit = payload("");
        missing_unit.phone = Some("5551234567".into());

        assert!(matches!(
            SessionMachine::validate_registration(&missing_name),
            Err(SessionError::RegistrationRejected(reason)) if reason.contains("name")
        ));
        assert!(matches!(
            SessionMachine::validate_registration(&missing_unit),
            Err(SessionError::RegistrationRejected(reason)) if reason.contains("unit")
        ));
        assert!(SessionMachine::validate_registration(&payload("A-101")).is_ok());
    }

    // =====================================================================
    // logout_transition() / clear_challenge()
    // =====================================================================

    #[test]
    fn test_logout_from_authenticated_keeps_last_login() {
        let mut machine = hydrated();
        login(&mut machine);

        let next = machine.logout_transition();
        let snapshot = machine.commit(next).unwrap().clone();

        assert_eq!(snapshot.status, SessionStatus::Unauthenticated);
        assert!(snapshot.user.is_none());
        assert!(snapshot.challenge.is_none());
        assert_eq!(snapshot.last_login, Some(t0()));
    }

    #[test]
    fn test_logout_is_idempotent() {
        let mut machine = hydrated();
        login(&mut machine);

        let first = machine.logout_transition();
        machine.commit(first.clone()).unwrap();
        let second = machine.logout_transition();
        machine.commit(second.clone()).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_logout_from_pending_clears_message() {
        let mut machine = hydrated();
        let (next, _) = machine.registration_transition(&payload("B-7"), t0()).unwrap();
        machine.commit(next).unwrap();

        let next = machine.logout_transition();
        machine.commit(next).unwrap();

        assert_eq!(machine.snapshot().status, SessionStatus::Unauthenticated);
        assert!(machine.snapshot().pending_message.is_none());
    }

    #[test]
    fn test_clear_challenge_keeps_status() {
        let mut machine = hydrated();
        machine.issue_challenge("user@example.com", t0()).unwrap();

        assert!(machine.clear_challenge());

        assert!(machine.snapshot().challenge.is_none());
        assert_eq!(machine.snapshot().status, SessionStatus::Unauthenticated);
        assert!(!machine.clear_challenge(), "second clear has nothing to drop");
    }

    // =====================================================================
    // generators
    // =====================================================================

    #[test]
    fn test_generate_token_is_lower_hex() {
        let token = generate_token();
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_generate_tracking_id_format() {
        let id = generate_tracking_id();
        let suffix = id.strip_prefix("REG-").expect("prefix");
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }
}
