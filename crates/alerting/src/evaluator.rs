//! Condition evaluation

use dms::MetricsSnapshot;

use crate::registry::{AlertDefinition, AlertRegistry};

/// Alert definitions whose condition holds for `metrics`, in registry order.
///
/// Total over any input: a condition that cannot be read does not fire.
pub fn evaluate<'r>(metrics: &MetricsSnapshot, registry: &'r AlertRegistry) -> Vec<&'r AlertDefinition> {
    registry
        .iter()
        .filter(|definition| definition.is_met(metrics))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::AlertId;
    use dms::{EyeClosureMetrics, GazeMetrics, YawnMetrics};

    fn ids(candidates: &[&AlertDefinition]) -> Vec<AlertId> {
        candidates.iter().map(|d| d.id).collect()
    }

    #[test]
    fn test_empty_snapshot_triggers_nothing() {
        let registry = AlertRegistry::default();
        assert!(evaluate(&MetricsSnapshot::default(), &registry).is_empty());
    }

    #[test]
    fn test_multiple_conditions_in_registry_order() {
        let registry = AlertRegistry::default();
        let metrics = MetricsSnapshot {
            yawn: Some(YawnMetrics {
                yawn_rate_alert: Some(true),
                ..Default::default()
            }),
            gaze: Some(GazeMetrics {
                gaze_alert: Some(true),
                ..Default::default()
            }),
            eye_closure: Some(EyeClosureMetrics {
                perclos_alert: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        };

        assert_eq!(
            ids(&evaluate(&metrics, &registry)),
            vec![AlertId::Drowsiness, AlertId::GazeOffRoad, AlertId::Yawning]
        );
    }

    #[test]
    fn test_unreadable_signal_fails_closed() {
        let registry = AlertRegistry::default();
        let metrics = MetricsSnapshot {
            eye_closure: Some(EyeClosureMetrics {
                eye_closed: Some(true),
                eye_closed_sustained: Some(f64::NAN),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(evaluate(&metrics, &registry).is_empty());
    }
}
