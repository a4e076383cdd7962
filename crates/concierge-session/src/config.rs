//! Session configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::storage::is_valid_key;

/// Key the persisted session record lives under.
pub const DEFAULT_STORAGE_KEY: &str = "condo.session";

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for the session store and its state machine.
///
/// Start from `SessionConfig::default()` and override the fields you
/// care about. Missing fields in a deserialized config fall back to the
/// defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How long an issued login challenge stays valid.
    ///
    /// Default: 5 minutes.
    pub challenge_ttl: Duration,

    /// Storage key of the persisted session record.
    pub storage_key: String,

    /// Text returned to residents as the expected review turnaround for a
    /// registration.
    pub review_turnaround: String,

    /// Capacity of the store's command queue. Callers wait when it is
    /// full.
    pub command_buffer: usize,

    /// Simulated round-trip latencies.
    pub latency: LatencyConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            challenge_ttl: Duration::from_secs(5 * 60),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            review_turnaround: "2-3 business days".to_string(),
            command_buffer: 32,
            latency: LatencyConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Longest accepted challenge lifetime.
    pub const MAX_CHALLENGE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

    /// Clamp and fix any out-of-range values so the config is safe to use.
    ///
    /// Rules:
    /// - `challenge_ttl` at least 1 second, at most [`Self::MAX_CHALLENGE_TTL`].
    /// - `storage_key` that [`is_valid_key`] rejects reset to
    ///   [`DEFAULT_STORAGE_KEY`].
    /// - `command_buffer` at least 1.
    pub fn validated(mut self) -> Self {
        if self.challenge_ttl < Duration::from_secs(1) {
            tracing::warn!(ttl = ?self.challenge_ttl, "challenge_ttl too short, clamping to 1s");
            self.challenge_ttl = Duration::from_secs(1);
        }
        if self.challenge_ttl > Self::MAX_CHALLENGE_TTL {
            tracing::warn!(ttl = ?self.challenge_ttl, "challenge_ttl exceeds maximum, clamping");
            self.challenge_ttl = Self::MAX_CHALLENGE_TTL;
        }
        if !is_valid_key(&self.storage_key) {
            tracing::warn!(key = %self.storage_key, "storage_key is not a valid key, using default");
            self.storage_key = DEFAULT_STORAGE_KEY.to_string();
        }
        if self.command_buffer == 0 {
            tracing::warn!("command_buffer is zero, clamping to 1");
            self.command_buffer = 1;
        }
        self
    }

    /// `challenge_ttl` as a calendar duration for timestamp arithmetic.
    pub fn challenge_ttl_delta(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.challenge_ttl)
            .unwrap_or_else(|_| chrono::Duration::minutes(5))
    }
}

// ---------------------------------------------------------------------------
// LatencyConfig
// ---------------------------------------------------------------------------

/// Delays standing in for the network round trips of a deployed portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatencyConfig {
    /// Session restore during hydration.
    pub restore: Duration,
    /// One-time code delivery.
    pub dispatch: Duration,
    /// Registration submission.
    pub registration: Duration,
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            restore: Duration::from_millis(500),
            dispatch: Duration::from_millis(800),
            registration: Duration::from_millis(900),
        }
    }
}

impl LatencyConfig {
    /// No simulated delay anywhere.
    pub fn none() -> Self {
        Self {
            restore: Duration::ZERO,
            dispatch: Duration::ZERO,
            registration: Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_default() {
        let config = SessionConfig::default();
        assert_eq!(config.challenge_ttl, Duration::from_secs(300));
        assert_eq!(config.storage_key, "condo.session");
        assert_eq!(config.command_buffer, 32);
        assert_eq!(config.latency.dispatch, Duration::from_millis(800));
    }

    #[test]
    fn test_validated_clamps_out_of_range_values() {
        let config = SessionConfig {
            challenge_ttl: Duration::ZERO,
            storage_key: "   ".into(),
            command_buffer: 0,
            ..Default::default()
        }
        .validated();

        assert_eq!(config.challenge_ttl, Duration::from_secs(1));
        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
        assert_eq!(config.command_buffer, 1);
    }

    #[test]
    fn test_validated_resets_keys_file_storage_rejects() {
        for key in ["my key", ".x", "../escape", "tower/b"] {
            let config = SessionConfig {
                storage_key: key.into(),
                ..Default::default()
            }
            .validated();
            assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY, "key {key:?}");
        }
    }

    #[test]
    fn test_validated_keeps_valid_key() {
        let config = SessionConfig {
            storage_key: "tower-b_2.session".into(),
            ..Default::default()
        }
        .validated();
        assert_eq!(config.storage_key, "tower-b_2.session");
    }

    #[test]
    fn test_validated_caps_ttl() {
        let config = SessionConfig {
            challenge_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            ..Default::default()
        }
        .validated();

        assert_eq!(config.challenge_ttl, SessionConfig::MAX_CHALLENGE_TTL);
    }

    #[test]
    fn test_deserialize_partial_config_uses_defaults() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"storage_key":"tower-b.session"}"#).unwrap();
        assert_eq!(config.storage_key, "tower-b.session");
        assert_eq!(config.challenge_ttl, Duration::from_secs(300));
        assert_eq!(config.latency, LatencyConfig::default());
    }

    #[test]
    fn test_challenge_ttl_delta_matches_std_duration() {
        let config = SessionConfig::default();
        assert_eq!(config.challenge_ttl_delta(), chrono::Duration::minutes(5));
    }

    #[test]
    fn test_latency_none_is_zero() {
        let latency = LatencyConfig::none();
        assert!(latency.restore.is_zero());
        assert!(latency.dispatch.is_zero());
        assert!(latency.registration.is_zero());
    }
}
