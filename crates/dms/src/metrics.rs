//! Per-frame metrics snapshot

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::trace;

use crate::MetricsError;

/// Sustained ratio at which a condition counts as fully sustained
pub const SUSTAINED_FULL: f64 = 1.0;

/// Decode a field, mapping a wrong-typed or null value to `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Eye closure metrics (EAR per frame, PERCLOS over a rolling window)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EyeClosureMetrics {
    /// Eyes closed in this frame
    #[serde(deserialize_with = "lenient")]
    pub eye_closed: Option<bool>,

    /// Fraction (0-1) of the closure duration threshold reached
    #[serde(deserialize_with = "lenient")]
    pub eye_closed_sustained: Option<f64>,

    /// Eye aspect ratio
    #[serde(deserialize_with = "lenient")]
    pub ear: Option<f64>,

    /// Percentage of eye closure over the window (0-1)
    #[serde(deserialize_with = "lenient")]
    pub perclos: Option<f64>,

    /// PERCLOS above its threshold
    #[serde(deserialize_with = "lenient")]
    pub perclos_alert: Option<bool>,
}

impl EyeClosureMetrics {
    /// Sustained closure ratio, if finite
    pub fn sustained(&self) -> Option<f64> {
        finite(self.eye_closed_sustained)
    }
}

/// Yawn metrics (mouth aspect ratio with hysteresis)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YawnMetrics {
    #[serde(deserialize_with = "lenient")]
    pub yawning: Option<bool>,

    #[serde(deserialize_with = "lenient")]
    pub yawn_sustained: Option<f64>,

    /// Fraction of the window spent yawning
    #[serde(deserialize_with = "lenient")]
    pub yawn_rate: Option<f64>,

    #[serde(deserialize_with = "lenient")]
    pub yawn_rate_alert: Option<bool>,
}

/// Head pose deviation flags
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadPoseMetrics {
    #[serde(deserialize_with = "lenient")]
    pub yaw_alert: Option<bool>,

    #[serde(deserialize_with = "lenient")]
    pub pitch_alert: Option<bool>,

    #[serde(deserialize_with = "lenient")]
    pub roll_alert: Option<bool>,

    #[serde(deserialize_with = "lenient")]
    pub head_pose_sustained: Option<f64>,
}

impl HeadPoseMetrics {
    /// Whether any axis deviates. `None` only when no axis could be read.
    pub fn any_alert(&self) -> Option<bool> {
        let flags = [self.yaw_alert, self.pitch_alert, self.roll_alert];
        if flags.iter().all(Option::is_none) {
            return None;
        }
        Some(flags.iter().any(|flag| *flag == Some(true)))
    }

    /// Sustained deviation ratio, if finite
    pub fn sustained(&self) -> Option<f64> {
        finite(self.head_pose_sustained)
    }
}

/// Gaze direction metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GazeMetrics {
    /// Off-road gaze ratio above threshold
    #[serde(deserialize_with = "lenient")]
    pub gaze_alert: Option<bool>,

    #[serde(deserialize_with = "lenient")]
    pub gaze_rate: Option<f64>,

    #[serde(deserialize_with = "lenient")]
    pub gaze_sustained: Option<f64>,
}

/// Phone usage detection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhoneUsageMetrics {
    #[serde(deserialize_with = "lenient")]
    pub phone_usage: Option<bool>,

    #[serde(deserialize_with = "lenient")]
    pub phone_usage_sustained: Option<f64>,
}

impl PhoneUsageMetrics {
    /// Sustained usage ratio, if finite
    pub fn sustained(&self) -> Option<f64> {
        finite(self.phone_usage_sustained)
    }
}

/// Metrics computed for one frame, keyed by monitored condition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSnapshot {
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub eye_closure: Option<EyeClosureMetrics>,

    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub yawn: Option<YawnMetrics>,

    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub head_pose: Option<HeadPoseMetrics>,

    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub gaze: Option<GazeMetrics>,

    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub phone_usage: Option<PhoneUsageMetrics>,
}

impl MetricsSnapshot {
    /// Sustained eye closure ratio, if reported
    pub fn eye_closed_sustained(&self) -> Option<f64> {
        self.eye_closure.as_ref().and_then(EyeClosureMetrics::sustained)
    }
}

/// One inference result as streamed by the backend.
///
/// Landmarks, detections and resolution are carried on the wire but are not
/// needed for alerting, so they are ignored on decode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceFrame {
    /// ISO 8601 timestamp when the frame was processed
    #[serde(deserialize_with = "lenient")]
    pub timestamp: Option<String>,

    /// `None` when the backend had no metrics for this frame
    #[serde(deserialize_with = "lenient")]
    pub metrics: Option<MetricsSnapshot>,
}

impl InferenceFrame {
    /// Decode one JSON frame.
    ///
    /// Fails only when the text is not a JSON object. Malformed metric
    /// fields are tolerated and read back as `None`.
    pub fn from_json(text: &str) -> Result<Self, MetricsError> {
        let frame: InferenceFrame = serde_json::from_str(text)?;
        if frame.metrics.is_none() {
            trace!("Frame {:?} carries no metrics", frame.timestamp);
        }
        Ok(frame)
    }
}
