//! Scheduler configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AlertError;

/// When the welcome message may play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WelcomePolicy {
    /// At most once for the lifetime of a scheduler instance
    #[default]
    OncePerScheduler,
    /// Once after every `start()`
    EverySession,
}

/// User-facing output toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertPreferences {
    pub speech: bool,
    pub haptic: bool,
}

impl Default for AlertPreferences {
    fn default() -> Self {
        Self {
            speech: true,
            haptic: true,
        }
    }
}

/// Alert scheduler configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Grace period after session start with no alerting (default: 4000)
    pub startup_delay_ms: u64,
    /// Channel release delay when no speech will report back (default: 500)
    pub speech_disabled_clear_ms: u64,
    /// Release the channel if speech never reports back (default: 15000)
    pub speech_watchdog_ms: Option<u64>,
    /// Upper bound on waiting for a stop-speech acknowledgement
    pub stop_ack_timeout_ms: u64,
    pub welcome_message: String,
    pub welcome_policy: WelcomePolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            startup_delay_ms: 4_000,
            speech_disabled_clear_ms: 500,
            speech_watchdog_ms: Some(15_000),
            stop_ack_timeout_ms: 1_000,
            welcome_message: "Driver monitoring active. Drive safely.".to_string(),
            welcome_policy: WelcomePolicy::OncePerScheduler,
        }
    }
}

impl SchedulerConfig {
    /// Reject settings that would latch the channel or never release it
    pub fn validate(&self) -> Result<(), AlertError> {
        if self.speech_disabled_clear_ms == 0 {
            return Err(AlertError::InvalidConfig(
                "speech_disabled_clear_ms must be positive".into(),
            ));
        }
        if self.speech_watchdog_ms == Some(0) {
            return Err(AlertError::InvalidConfig(
                "speech_watchdog_ms must be positive when set".into(),
            ));
        }
        if self.stop_ack_timeout_ms == 0 {
            return Err(AlertError::InvalidConfig(
                "stop_ack_timeout_ms must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Grace period after start
    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }

    /// Channel release delay when speech is off
    pub fn speech_disabled_clear(&self) -> Duration {
        Duration::from_millis(self.speech_disabled_clear_ms)
    }

    /// Speech watchdog, if enabled
    pub fn speech_watchdog(&self) -> Option<Duration> {
        self.speech_watchdog_ms.map(Duration::from_millis)
    }

    /// Stop acknowledgement timeout
    pub fn stop_ack_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_ack_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SchedulerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.startup_delay(), Duration::from_secs(4));
        assert_eq!(config.speech_disabled_clear(), Duration::from_millis(500));
    }

    #[test]
    fn test_zero_timeouts_rejected() {
        let config = SchedulerConfig {
            speech_disabled_clear_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = SchedulerConfig {
            speech_watchdog_ms: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = SchedulerConfig {
            speech_watchdog_ms: None,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
