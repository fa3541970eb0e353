//! Alerting Error Types

use thiserror::Error;

use crate::registry::AlertId;

/// Errors raised while assembling the alerting engine
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AlertError {
    /// The same alert id appears twice in a registry
    #[error("Duplicate alert definition: {0}")]
    DuplicateAlert(AlertId),

    /// A scheduler setting is out of its allowed range
    #[error("Invalid scheduler configuration: {0}")]
    InvalidConfig(String),
}
