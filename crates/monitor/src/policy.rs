//! Session-level alert policies

use alerting::{AlertDefinition, AlertId, AlertPolicy};
use dms::MetricsSnapshot;

/// Withholds the gaze warning while the eyes are closing.
///
/// Closed eyes also read as off-road gaze; the eye closure alert is the one
/// the driver needs to hear.
#[derive(Debug, Clone, Copy, Default)]
pub struct GazeSuppression;

impl AlertPolicy for GazeSuppression {
    fn name(&self) -> &'static str {
        "gaze_suppression"
    }

    fn permits(&self, metrics: &MetricsSnapshot, definition: &AlertDefinition) -> bool {
        if definition.id != AlertId::GazeOffRoad {
            return true;
        }
        !metrics
            .eye_closed_sustained()
            .is_some_and(|sustained| sustained > 0.0)
    }
}
