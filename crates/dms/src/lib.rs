//! Driver Monitoring System (DMS)
//!
//! Per-frame driver state metrics as produced by the inference backend:
//! - Eye closure (EAR, PERCLOS, sustained closure)
//! - Yawning (MAR, yawn rate)
//! - Head pose (yaw / pitch / roll deviation)
//! - Gaze direction (off-road ratio)
//! - Phone usage
//!
//! Every field is optional. A value that is missing or has the wrong type
//! decodes as `None` so downstream consumers can fail closed.

pub mod metrics;

pub use metrics::{
    EyeClosureMetrics, GazeMetrics, HeadPoseMetrics, InferenceFrame, MetricsSnapshot,
    PhoneUsageMetrics, YawnMetrics, SUSTAINED_FULL,
};

use thiserror::Error;

/// DMS error types
#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Malformed inference frame: {0}")]
    Malformed(#[from] serde_json::Error),
}
