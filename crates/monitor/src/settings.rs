//! Monitor settings
//!
//! Loaded from an optional TOML file, then overridden by `FATIGUE__*`
//! environment variables (e.g. `FATIGUE__SCHEDULER__STARTUP_DELAY_MS=2000`).

use std::path::Path;
use std::str::FromStr;

use alerting::{AlertPreferences, SchedulerConfig};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::error::MonitorError;

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Max level: trace, debug, info, warn or error
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl LoggingSettings {
    /// Parse the configured max level
    pub fn level(&self) -> Result<Level, MonitorError> {
        Level::from_str(&self.level).map_err(|_| MonitorError::LogLevel(self.level.clone()))
    }
}

/// Simulated speech engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    /// Speaking rate used to estimate utterance length
    pub words_per_minute: u32,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            words_per_minute: 160,
        }
    }
}

/// Complete monitor configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub scheduler: SchedulerConfig,
    pub preferences: AlertPreferences,
    pub logging: LoggingSettings,
    pub speech: SpeechSettings,
}

impl Settings {
    /// Load settings from `path` (if given) and the environment
    pub fn load(path: Option<&Path>) -> Result<Self, MonitorError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        Self::from_builder(builder)
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, MonitorError> {
        let settings: Settings = builder
            .add_source(
                Environment::with_prefix("FATIGUE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.scheduler.validate()?;
        settings.logging.level()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alerting::WelcomePolicy;
    use config::FileFormat;

    fn from_toml(text: &str) -> Result<Settings, MonitorError> {
        Settings::from_builder(Config::builder().add_source(File::from_str(text, FileFormat::Toml)))
    }

    #[test]
    fn test_defaults_without_sources() {
        let settings = from_toml("").unwrap();
        assert_eq!(settings.scheduler, SchedulerConfig::default());
        assert!(settings.preferences.speech);
        assert_eq!(settings.logging.level().unwrap(), Level::INFO);
    }

    #[test]
    fn test_partial_file_overrides() {
        let settings = from_toml(
            r#"
            [scheduler]
            startup_delay_ms = 2000
            welcome_policy = "every_session"

            [preferences]
            speech = false

            [logging]
            level = "debug"
            json = true
            "#,
        )
        .unwrap();

        assert_eq!(settings.scheduler.startup_delay_ms, 2_000);
        assert_eq!(settings.scheduler.speech_disabled_clear_ms, 500);
        assert_eq!(settings.scheduler.welcome_policy, WelcomePolicy::EverySession);
        assert!(!settings.preferences.speech);
        assert!(settings.preferences.haptic);
        assert_eq!(settings.logging.level().unwrap(), Level::DEBUG);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = from_toml("[scheduler]\nspeech_disabled_clear_ms = 0").unwrap_err();
        assert!(matches!(err, MonitorError::Alerting(_)));

        let err = from_toml("[logging]\nlevel = \"loud\"").unwrap_err();
        assert!(matches!(err, MonitorError::LogLevel(_)));
    }
}
