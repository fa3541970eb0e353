//! Candidate policies applied between evaluation and selection

use dms::MetricsSnapshot;
use tracing::debug;

use crate::registry::AlertDefinition;

/// Cross-alert rule that can withhold a triggered alert from scheduling.
///
/// Policies sit outside the registry so that individual trigger conditions
/// stay independent of each other.
pub trait AlertPolicy: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Whether `definition` may be scheduled for this snapshot
    fn permits(&self, metrics: &MetricsSnapshot, definition: &AlertDefinition) -> bool;
}

/// Drop every candidate some policy rejects
pub fn apply_policies(
    policies: &[Box<dyn AlertPolicy>],
    metrics: &MetricsSnapshot,
    candidates: &mut Vec<&AlertDefinition>,
) {
    candidates.retain(|definition| {
        policies.iter().all(|policy| {
            let permitted = policy.permits(metrics, definition);
            if !permitted {
                debug!("Alert {} withheld by policy {}", definition.id, policy.name());
            }
            permitted
        })
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{AlertId, AlertRegistry};

    struct Deny(AlertId);

    impl AlertPolicy for Deny {
        fn name(&self) -> &'static str {
            "deny"
        }

        fn permits(&self, _metrics: &MetricsSnapshot, definition: &AlertDefinition) -> bool {
            definition.id != self.0
        }
    }

    #[test]
    fn test_policies_filter_candidates() {
        let registry = AlertRegistry::default();
        let policies: Vec<Box<dyn AlertPolicy>> = vec![Box::new(Deny(AlertId::Yawning))];
        let mut candidates: Vec<_> = registry.iter().collect();

        apply_policies(&policies, &MetricsSnapshot::default(), &mut candidates);

        assert_eq!(candidates.len(), AlertId::COUNT - 1);
        assert!(candidates.iter().all(|d| d.id != AlertId::Yawning));
    }
}
