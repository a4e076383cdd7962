//! Tracing subscriber setup for binaries embedding the store.

use tracing_subscriber::EnvFilter;

use crate::ConciergeError;

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// `info` when the variable is unset.
pub fn init() -> Result<(), ConciergeError> {
    init_with_default("info")
}

/// Like [`init`], with a caller-chosen fallback directive such as
/// `"concierge=debug,warn"`.
///
/// # Errors
/// [`ConciergeError::Telemetry`] if the directive doesn't parse or a
/// global subscriber is already installed.
pub fn init_with_default(directive: &str) -> Result<(), ConciergeError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(directive)
            .map_err(|e| ConciergeError::Telemetry(e.to_string()))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| ConciergeError::Telemetry(e.to_string()))
}
