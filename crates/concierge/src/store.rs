//! Session store actor: a single Tokio task that owns the live session.
//!
//! Every mutating operation travels through one bounded mpsc channel and
//! is handled to completion (simulated latency included) before the next
//! one starts. That single-writer queue is what makes a `logout` racing
//! an in-flight `confirm_login` well defined: whichever was queued second
//! sees the result of the first.
//!
//! Snapshots are broadcast on a `watch` channel. Subscribers always see
//! the latest committed snapshot; intermediate values may be skipped.

use std::sync::Arc;
use std::time::Duration;

use concierge_protocol::{
    AuthChallenge, Codec, RegistrationPayload, RegistrationResult, SessionSnapshot,
};
use concierge_session::{
    Clock, IdentityVerifier, LatencyConfig, SessionConfig, SessionError, SessionMachine,
    SessionPersistence, SessionStorage,
};
use tokio::sync::{mpsc, oneshot, watch};

use crate::{ConciergeError, SessionStoreBuilder};

/// Commands sent to the store actor through its channel.
///
/// The `oneshot::Sender` in each variant is the reply channel: the handle
/// sends a command and waits for the answer on it.
pub(crate) enum StoreCommand {
    InitiateLogin {
        identifier: String,
        reply: oneshot::Sender<Result<AuthChallenge, SessionError>>,
    },
    ConfirmLogin {
        challenge_id: String,
        code: String,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    RegisterResident {
        payload: RegistrationPayload,
        reply: oneshot::Sender<Result<RegistrationResult, SessionError>>,
    },
    Logout {
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    ClearChallenge {
        reply: oneshot::Sender<bool>,
    },
    Shutdown,
}

// ---------------------------------------------------------------------------
// SessionStore (handle)
// ---------------------------------------------------------------------------

/// Handle to the running session store.
///
/// Cheap to clone: it's an `mpsc::Sender` plus a `watch::Receiver`. Hand
/// a clone to every UI consumer; they all talk to the same actor and see
/// the same snapshot.
///
/// # Example
///
/// ```rust,no_run
/// use concierge::prelude::*;
///
/// # async fn demo() -> Result<(), ConciergeError> {
/// let store = SessionStore::builder().build(DemoVerifier);
/// store.wait_until_hydrated().await?;
///
/// let challenge = store.initiate_login("user@example.com").await?;
/// store.confirm_login(&challenge.id, DEMO_OTP_CODE).await?;
/// assert!(store.session().is_authenticated());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SessionStore {
    sender: mpsc::Sender<StoreCommand>,
    session: watch::Receiver<SessionSnapshot>,
}

impl SessionStore {
    /// Creates a new builder.
    pub fn builder() -> SessionStoreBuilder {
        SessionStoreBuilder::new()
    }

    /// The current snapshot. `checking` until hydration resolves.
    pub fn session(&self) -> SessionSnapshot {
        self.session.borrow().clone()
    }

    /// Subscribes to snapshot changes.
    ///
    /// The returned receiver treats the current snapshot as already seen,
    /// so `changed().await` resolves on the next commit.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        let mut rx = self.session.clone();
        rx.borrow_and_update();
        rx
    }

    /// Waits until hydration has produced a concrete status and returns
    /// that snapshot.
    pub async fn wait_until_hydrated(&self) -> Result<SessionSnapshot, ConciergeError> {
        let mut rx = self.session.clone();
        let snapshot = rx
            .wait_for(|s| s.status.is_resolved())
            .await
            .map_err(|_| ConciergeError::Unavailable)?;
        Ok(snapshot.clone())
    }

    /// Issues a one-time-code challenge for `identifier` (email or phone).
    ///
    /// # Errors
    /// [`SessionError::EmptyIdentifier`] for a blank identifier.
    pub async fn initiate_login(&self, identifier: &str) -> Result<AuthChallenge, ConciergeError> {
        let (reply, rx) = oneshot::channel();
        self.send(StoreCommand::InitiateLogin {
            identifier: identifier.to_string(),
            reply,
        })
        .await?;
        let result = rx.await.map_err(|_| ConciergeError::Unavailable)?;
        Ok(result?)
    }

    /// Confirms the outstanding challenge with the code the resident
    /// received. On success the session is authenticated and persisted.
    ///
    /// # Errors
    /// - [`SessionError::ChallengeNotFound`]: not the current challenge
    /// - [`SessionError::ChallengeExpired`]: past `expires_at`
    /// - [`SessionError::InvalidCode`]: wrong code
    /// - [`SessionError::Storage`]: the new session couldn't be persisted
    pub async fn confirm_login(&self, challenge_id: &str, code: &str) -> Result<(), ConciergeError> {
        let (reply, rx) = oneshot::channel();
        self.send(StoreCommand::ConfirmLogin {
            challenge_id: challenge_id.to_string(),
            code: code.to_string(),
            reply,
        })
        .await?;
        let result = rx.await.map_err(|_| ConciergeError::Unavailable)?;
        Ok(result?)
    }

    /// Submits a new-resident registration and moves the session to
    /// `pending`.
    pub async fn register_resident(
        &self,
        payload: RegistrationPayload,
    ) -> Result<RegistrationResult, ConciergeError> {
        let (reply, rx) = oneshot::channel();
        self.send(StoreCommand::RegisterResident { payload, reply }).await?;
        let result = rx.await.map_err(|_| ConciergeError::Unavailable)?;
        Ok(result?)
    }

    /// Signs out from any state. Calling it repeatedly is harmless.
    ///
    /// The in-memory session is always signed out, even when the record
    /// can't be rewritten; storage failures are logged, not returned.
    pub async fn logout(&self) -> Result<(), ConciergeError> {
        let (reply, rx) = oneshot::channel();
        self.send(StoreCommand::Logout { reply }).await?;
        let result = rx.await.map_err(|_| ConciergeError::Unavailable)?;
        Ok(result?)
    }

    /// Abandons the outstanding login challenge, if any.
    ///
    /// Returns `true` if a challenge was dropped.
    pub async fn clear_challenge(&self) -> Result<bool, ConciergeError> {
        let (reply, rx) = oneshot::channel();
        self.send(StoreCommand::ClearChallenge { reply }).await?;
        rx.await.map_err(|_| ConciergeError::Unavailable)
    }

    /// Stops the actor. Commands already queued ahead of this one still
    /// run; later ones fail with [`ConciergeError::Unavailable`].
    pub async fn shutdown(&self) -> Result<(), ConciergeError> {
        self.send(StoreCommand::Shutdown).await
    }

    async fn send(&self, cmd: StoreCommand) -> Result<(), ConciergeError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| ConciergeError::Unavailable)
    }
}

// ---------------------------------------------------------------------------
// SessionActor
// ---------------------------------------------------------------------------

/// The internal actor state. Runs inside a Tokio task.
struct SessionActor<V: IdentityVerifier, C: Codec> {
    machine: SessionMachine,
    persistence: SessionPersistence<C>,
    verifier: V,
    clock: Arc<dyn Clock>,
    latency: LatencyConfig,
    publisher: watch::Sender<SessionSnapshot>,
    receiver: mpsc::Receiver<StoreCommand>,
}

impl<V: IdentityVerifier, C: Codec> SessionActor<V, C> {
    /// Hydrates, then processes commands until shutdown or until every
    /// handle is dropped.
    async fn run(mut self) {
        tracing::debug!(key = %self.persistence.key(), "session store started");

        self.hydrate().await;

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                StoreCommand::InitiateLogin { identifier, reply } => {
                    let result = self.handle_initiate(&identifier).await;
                    let _ = reply.send(result);
                }
                StoreCommand::ConfirmLogin {
                    challenge_id,
                    code,
                    reply,
                } => {
                    let result = self.handle_confirm(&challenge_id, &code).await;
                    if let Err(e) = &result {
                        tracing::debug!(%challenge_id, error = %e, "login confirmation rejected");
                    }
                    let _ = reply.send(result);
                }
                StoreCommand::RegisterResident { payload, reply } => {
                    let result = self.handle_register(&payload).await;
                    let _ = reply.send(result);
                }
                StoreCommand::Logout { reply } => {
                    let result = self.handle_logout();
                    let _ = reply.send(result);
                }
                StoreCommand::ClearChallenge { reply } => {
                    let cleared = self.machine.clear_challenge();
                    if cleared {
                        self.publish();
                    }
                    let _ = reply.send(cleared);
                }
                StoreCommand::Shutdown => {
                    tracing::info!("session store shutting down");
                    break;
                }
            }
        }

        tracing::debug!("session store stopped");
    }

    /// Restores the persisted session. Runs exactly once, before any
    /// command is read, and is the only way out of `checking`.
    async fn hydrate(&mut self) {
        simulate_latency(self.latency.restore).await;

        let restored = self.persistence.load();
        match self.machine.resolve_hydration(restored) {
            Ok(_) => self.publish(),
            Err(e) => tracing::error!(error = %e, "hydration failed"),
        }
    }

    async fn handle_initiate(&mut self, identifier: &str) -> Result<AuthChallenge, SessionError> {
        if identifier.trim().is_empty() {
            return Err(SessionError::EmptyIdentifier);
        }
        simulate_latency(self.latency.dispatch).await;

        let challenge = self.machine.issue_challenge(identifier, self.clock.now())?;
        self.publish();
        Ok(challenge)
    }

    async fn handle_confirm(&mut self, challenge_id: &str, code: &str) -> Result<(), SessionError> {
        let challenge = self
            .machine
            .validate_challenge(challenge_id, self.clock.now())?
            .clone();
        let user = self.verifier.verify(&challenge, code).await?;

        let next = self.machine.login_transition(user, self.clock.now());
        self.persist(&next)?;
        self.machine.commit(next)?;
        self.publish();

        tracing::info!(challenge_id, "resident logged in");
        Ok(())
    }

    async fn handle_register(
        &mut self,
        payload: &RegistrationPayload,
    ) -> Result<RegistrationResult, SessionError> {
        SessionMachine::validate_registration(payload)?;
        simulate_latency(self.latency.registration).await;

        let (next, result) = self
            .machine
            .registration_transition(payload, self.clock.now())?;
        self.persist(&next)?;
        self.machine.commit(next)?;
        self.publish();

        tracing::info!(
            tracking_id = %result.tracking_id,
            unit_code = %payload.unit_code,
            "registration submitted for review"
        );
        Ok(result)
    }

    /// Signs out in memory first, whatever storage does. If the new record
    /// can't be written, the old one is removed so a restart doesn't
    /// restore the signed-in session.
    fn handle_logout(&mut self) -> Result<(), SessionError> {
        let next = self.machine.logout_transition();
        self.machine.commit(next)?;
        self.publish();

        if self.persist(self.machine.snapshot()).is_err() {
            if let Err(e) = self.persistence.clear() {
                tracing::warn!(error = %e, "failed to remove persisted session after logout");
            }
        }
        Ok(())
    }

    fn persist(&self, next: &SessionSnapshot) -> Result<(), SessionError> {
        self.persistence.save(next).inspect_err(|e| {
            tracing::warn!(error = %e, status = %next.status, "failed to persist session");
        })
    }

    fn publish(&self) {
        self.publisher.send_replace(self.machine.snapshot().clone());
    }
}

async fn simulate_latency(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Spawns the store actor and returns a handle to it.
///
/// The handle's snapshot starts at `checking`; the actor hydrates before
/// reading its first command, so commands sent early simply queue.
pub(crate) fn spawn_store<V: IdentityVerifier, C: Codec>(
    config: SessionConfig,
    storage: Arc<dyn SessionStorage>,
    codec: C,
    verifier: V,
    clock: Arc<dyn Clock>,
) -> SessionStore {
    let config = config.validated();
    let (tx, rx) = mpsc::channel(config.command_buffer);
    let (publisher, session) = watch::channel(SessionSnapshot::checking());

    let actor = SessionActor {
        machine: SessionMachine::new(&config),
        persistence: SessionPersistence::new(storage, codec, config.storage_key.clone()),
        verifier,
        clock,
        latency: config.latency,
        publisher,
        receiver: rx,
    };

    tokio::spawn(actor.run());

    SessionStore {
        sender: tx,
        session,
    }
}
