use concierge::prelude::*;

// ---------------------------------------------------------------------------
// Scripted resident flows
// ---------------------------------------------------------------------------

async fn sign_in(store: &SessionStore, identifier: &str) -> Result<(), ConciergeError> {
    let challenge = store.initiate_login(identifier).await?;
    tracing::info!(
        challenge_id = %challenge.id,
        sent_to = %challenge.masked_identifier,
        channel = ?challenge.channel,
        expires_at = %challenge.expires_at,
        "one-time code dispatched"
    );

    // A mistyped code leaves the challenge in place for another attempt.
    if let Err(e) = store.confirm_login(&challenge.id, "000000").await {
        tracing::warn!(error = %e, "first attempt rejected");
    }

    store.confirm_login(&challenge.id, DEMO_OTP_CODE).await?;
    let session = store.session();
    if let Some(user) = &session.user {
        tracing::info!(
            user = %user.display_name,
            unit = ?user.unit_code,
            last_login = ?session.last_login,
            "signed in"
        );
    }
    Ok(())
}

async fn register(store: &SessionStore) -> Result<(), ConciergeError> {
    let result = store
        .register_resident(RegistrationPayload {
            name: "Ana Souza".into(),
            email: "ana@example.com".into(),
            unit_code: "B-204".into(),
            phone: Some("+55 11 98765 4321".into()),
        })
        .await?;
    tracing::info!(
        tracking_id = %result.tracking_id,
        eta = %result.estimated_response,
        message = ?store.session().pending_message,
        "registration submitted"
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    concierge::telemetry::init_with_default("info,concierge=debug")?;

    let state_dir = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "./concierge-state".to_string());

    let store = SessionStore::builder()
        .storage(FileStorage::new(&state_dir))
        .build(DemoVerifier);

    let mut updates = store.subscribe();
    tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let status = updates.borrow_and_update().status;
            tracing::debug!(%status, "session changed");
        }
    });

    let restored = store.wait_until_hydrated().await?;
    tracing::info!(status = %restored.status, dir = %state_dir, "session restored");

    if !restored.is_authenticated() {
        sign_in(&store, "resident@example.com").await?;
    }

    store.logout().await?;
    register(&store).await?;
    store.logout().await?;

    store.shutdown().await?;
    Ok(())
}
