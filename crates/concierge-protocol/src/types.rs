//! Core types describing a resident's session on the client.
//!
//! These are the values the session machine produces, the store
//! broadcasts to UI subscribers, and (in projected form) the persistence
//! adapter writes to durable storage.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// SessionStatus
// ---------------------------------------------------------------------------

/// Top-level authentication status.
///
/// ```text
/// checking ──(hydration)──→ unauthenticated | authenticated | pending
/// unauthenticated ──(confirm login)──→ authenticated
/// unauthenticated ──(register)──→ pending
/// authenticated | pending ──(logout)──→ unauthenticated
/// ```
///
/// `Checking` is strictly initial: it exists only until the store has
/// restored (or failed to restore) the persisted record. The other three
/// are the steady states. A login challenge in flight is a sub-state of
/// `Unauthenticated`, not a status of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Checking,
    Unauthenticated,
    Authenticated,
    Pending,
}

impl SessionStatus {
    /// Returns `true` once hydration has produced a concrete status.
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Checking)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Checking => "checking",
            Self::Unauthenticated => "unauthenticated",
            Self::Authenticated => "authenticated",
            Self::Pending => "pending",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// UserIdentity
// ---------------------------------------------------------------------------

/// The resident a confirmed login resolved to.
///
/// Produced by an identity verifier; the session machine never builds
/// one itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    /// Stable directory id of the resident.
    pub id: String,
    /// Name shown in the portal header.
    pub display_name: String,
    /// The email or phone number the resident logged in with.
    pub identifier: String,
    /// Unit the resident belongs to, when the directory knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_code: Option<String>,
}

// ---------------------------------------------------------------------------
// AuthChallenge
// ---------------------------------------------------------------------------

/// How the one-time passcode was delivered.
///
/// Inferred from the identifier: anything containing `@` is an email
/// address, everything else is treated as a phone number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeChannel {
    Email,
    Sms,
}

impl fmt::Display for ChallengeChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Email => f.write_str("email"),
            Self::Sms => f.write_str("sms"),
        }
    }
}

/// A single issued-but-not-yet-confirmed OTP login attempt.
///
/// Challenges are immutable after creation. They are consumed by a
/// successful confirmation, dropped by cancellation, or replaced when a
/// new challenge is issued. They never reach durable storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthChallenge {
    /// Random 32-character hex token, unique per challenge.
    pub id: String,
    /// The identifier exactly as the resident typed it.
    pub identifier: String,
    /// Partially redacted identifier, safe to show in the UI and logs.
    pub masked_identifier: String,
    pub channel: ChallengeChannel,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AuthChallenge {
    /// Returns `true` if `now` is past the challenge's validity window.
    ///
    /// A confirmation at exactly `expires_at` is still accepted.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

// ---------------------------------------------------------------------------
// SessionSnapshot
// ---------------------------------------------------------------------------

/// The complete client auth state at one point in time.
///
/// Invariants (kept by the session machine, not by this type):
/// - `user` is `Some` iff `status == Authenticated`.
/// - `challenge` is `Some` only while a login attempt is outstanding.
/// - `pending_message` is `Some` only while `status == Pending`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub user: Option<UserIdentity>,
    pub challenge: Option<AuthChallenge>,
    pub last_login: Option<DateTime<Utc>>,
    pub pending_message: Option<String>,
}

impl SessionSnapshot {
    /// The snapshot every store starts with, before hydration resolves.
    pub fn checking() -> Self {
        Self {
            status: SessionStatus::Checking,
            user: None,
            challenge: None,
            last_login: None,
            pending_message: None,
        }
    }

    /// A signed-out snapshot that remembers the last successful login.
    pub fn unauthenticated(last_login: Option<DateTime<Utc>>) -> Self {
        Self {
            status: SessionStatus::Unauthenticated,
            user: None,
            challenge: None,
            last_login,
            pending_message: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }

    /// Rebuilds a live snapshot from a persisted record.
    ///
    /// The challenge is always `None`: challenges never survive a
    /// restart.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidRecord`] if the record pairs a user
    /// with a non-authenticated status, or an authenticated status with no
    /// user.
    pub fn from_persisted(record: PersistedSession) -> Result<Self, ProtocolError> {
        let status = SessionStatus::from(record.status);
        match (status, &record.user) {
            (SessionStatus::Authenticated, None) => {
                return Err(ProtocolError::InvalidRecord(
                    "authenticated record has no user".into(),
                ));
            }
            (SessionStatus::Authenticated, Some(_)) => {}
            (_, Some(_)) => {
                return Err(ProtocolError::InvalidRecord(format!(
                    "{status} record carries a user"
                )));
            }
            (_, None) => {}
        }

        let pending_message = match status {
            SessionStatus::Pending => record.pending_message,
            _ => None,
        };

        Ok(Self {
            status,
            user: record.user,
            challenge: None,
            last_login: record.last_login,
            pending_message,
        })
    }
}

// ---------------------------------------------------------------------------
// Persisted record
// ---------------------------------------------------------------------------

/// The statuses a persisted record may carry.
///
/// `checking` is deliberately absent: a record containing it fails to
/// decode and is handled like any other corrupt record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistedStatus {
    Unauthenticated,
    Authenticated,
    Pending,
}

impl From<PersistedStatus> for SessionStatus {
    fn from(status: PersistedStatus) -> Self {
        match status {
            PersistedStatus::Unauthenticated => Self::Unauthenticated,
            PersistedStatus::Authenticated => Self::Authenticated,
            PersistedStatus::Pending => Self::Pending,
        }
    }
}

/// Durable projection of a [`SessionSnapshot`].
///
/// Stored as one JSON object under a fixed key:
///
/// ```json
/// {"status":"authenticated","user":{...},"lastLogin":"2026-01-01T00:00:00Z"}
/// ```
///
/// Absent optional fields are omitted rather than written as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    pub status: PersistedStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserIdentity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_message: Option<String>,
}

impl PersistedSession {
    /// Projects a live snapshot onto the persisted shape.
    ///
    /// Drops the challenge and collapses `checking` to `unauthenticated`.
    pub fn from_snapshot(snapshot: &SessionSnapshot) -> Self {
        let status = match snapshot.status {
            SessionStatus::Checking | SessionStatus::Unauthenticated => {
                PersistedStatus::Unauthenticated
            }
            SessionStatus::Authenticated => PersistedStatus::Authenticated,
            SessionStatus::Pending => PersistedStatus::Pending,
        };

        Self {
            status,
            user: snapshot.user.clone(),
            last_login: snapshot.last_login,
            pending_message: snapshot.pending_message.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// A new resident's sign-up request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationPayload {
    pub name: String,
    pub email: String,
    /// Building unit, e.g. `"A-101"`.
    pub unit_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    /// Submitted; building management resolves it out of band.
    PendingReview,
}

/// Acknowledgement returned for a submitted registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResult {
    /// `REG-` followed by 8 uppercase hex characters.
    pub tracking_id: String,
    pub status: RegistrationStatus,
    /// Human-readable review turnaround, e.g. `"2-3 business days"`.
    pub estimated_response: String,
    pub submitted_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
