//! Monitor Error Types

use alerting::AlertError;
use thiserror::Error;

/// Errors raised while setting up or feeding a monitoring session
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Settings could not be read or deserialized
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Scheduler rejected its configuration
    #[error(transparent)]
    Alerting(#[from] AlertError),

    #[error("Invalid log level: {0}")]
    LogLevel(String),

    /// A global tracing subscriber is already installed
    #[error("Failed to install tracing subscriber: {0}")]
    Logging(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The session stopped accepting events
    #[error("Session event channel closed")]
    SessionClosed,
}
