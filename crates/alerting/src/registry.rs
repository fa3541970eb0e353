//! Alert catalog

use std::fmt;
use std::time::Duration;

use dms::{MetricsSnapshot, SUSTAINED_FULL};
use serde::{Deserialize, Serialize};

use crate::error::AlertError;

/// Identity of an alert in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertId {
    EyesClosed,
    Drowsiness,
    PhoneUsage,
    HeadPose,
    GazeOffRoad,
    Yawning,
}

impl AlertId {
    pub const COUNT: usize = 6;

    pub const ALL: [AlertId; AlertId::COUNT] = [
        AlertId::EyesClosed,
        AlertId::Drowsiness,
        AlertId::PhoneUsage,
        AlertId::HeadPose,
        AlertId::GazeOffRoad,
        AlertId::Yawning,
    ];

    /// Slot in per-alert tables
    pub fn index(self) -> usize {
        self as usize
    }

    /// Stable name used in logs and metric labels
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertId::EyesClosed => "eyes_closed",
            AlertId::Drowsiness => "drowsiness",
            AlertId::PhoneUsage => "phone_usage",
            AlertId::HeadPose => "head_pose",
            AlertId::GazeOffRoad => "gaze_off_road",
            AlertId::Yawning => "yawning",
        }
    }
}

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert urgency. Higher tiers may preempt lower ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertPriority {
    Low = 1,
    Medium = 2,
    High = 3,
    Critical = 4,
}

/// Pure predicate over a metrics snapshot.
///
/// Returns `None` when the signals it needs are missing or unreadable.
pub type TriggerCondition = fn(&MetricsSnapshot) -> Option<bool>;

/// Immutable alert definition
#[derive(Debug, Clone)]
pub struct AlertDefinition {
    pub id: AlertId,
    pub priority: AlertPriority,
    /// Text spoken when the alert fires
    pub message: String,
    /// Minimum interval between two triggers of this alert
    pub cooldown: Duration,
    pub condition: TriggerCondition,
}

impl AlertDefinition {
    /// Create an alert definition
    pub fn new(
        id: AlertId,
        priority: AlertPriority,
        message: impl Into<String>,
        cooldown: Duration,
        condition: TriggerCondition,
    ) -> Self {
        Self {
            id,
            priority,
            message: message.into(),
            cooldown,
            condition,
        }
    }

    /// Evaluate the condition, treating an unreadable signal as not met
    pub fn is_met(&self, metrics: &MetricsSnapshot) -> bool {
        (self.condition)(metrics).unwrap_or(false)
    }
}

/// Ordered, immutable set of alert definitions with unique ids
#[derive(Debug, Clone)]
pub struct AlertRegistry {
    definitions: Vec<AlertDefinition>,
    positions: [Option<usize>; AlertId::COUNT],
}

impl AlertRegistry {
    /// Build a registry, rejecting duplicate ids
    pub fn new(definitions: Vec<AlertDefinition>) -> Result<Self, AlertError> {
        let mut seen = [false; AlertId::COUNT];
        for definition in &definitions {
            let slot = &mut seen[definition.id.index()];
            if *slot {
                return Err(AlertError::DuplicateAlert(definition.id));
            }
            *slot = true;
        }
        Ok(Self::index(definitions))
    }

    /// The driver fatigue catalog
    pub fn driver_fatigue() -> Self {
        Self::index(vec![
            AlertDefinition::new(
                AlertId::EyesClosed,
                AlertPriority::Critical,
                "Wake up! Your eyes are closing.",
                Duration::from_secs(5),
                eyes_closed,
            ),
            AlertDefinition::new(
                AlertId::PhoneUsage,
                AlertPriority::High,
                "Put the phone down and watch the road.",
                Duration::from_secs(10),
                phone_usage,
            ),
            AlertDefinition::new(
                AlertId::Drowsiness,
                AlertPriority::High,
                "You seem drowsy. Consider taking a break.",
                Duration::from_secs(60),
                drowsiness,
            ),
            AlertDefinition::new(
                AlertId::HeadPose,
                AlertPriority::Medium,
                "Keep your head facing the road.",
                Duration::from_secs(8),
                head_pose,
            ),
            AlertDefinition::new(
                AlertId::GazeOffRoad,
                AlertPriority::Medium,
                "Keep your eyes on the road.",
                Duration::from_secs(8),
                gaze_off_road,
            ),
            AlertDefinition::new(
                AlertId::Yawning,
                AlertPriority::Low,
                "Frequent yawning detected. Plan a rest stop.",
                Duration::from_secs(30),
                yawning,
            ),
        ])
    }

    fn index(definitions: Vec<AlertDefinition>) -> Self {
        let mut positions = [None; AlertId::COUNT];
        for (position, definition) in definitions.iter().enumerate() {
            positions[definition.id.index()] = Some(position);
        }
        Self {
            definitions,
            positions,
        }
    }

    /// Look up a definition by id
    pub fn get(&self, id: AlertId) -> Option<&AlertDefinition> {
        self.position(id).map(|position| &self.definitions[position])
    }

    /// Position of an alert in registry order
    pub fn position(&self, id: AlertId) -> Option<usize> {
        self.positions[id.index()]
    }

    /// Definitions in registry order
    pub fn iter(&self) -> impl Iterator<Item = &AlertDefinition> {
        self.definitions.iter()
    }

    /// Number of registered alerts
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether no alerts are registered
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl Default for AlertRegistry {
    fn default() -> Self {
        Self::driver_fatigue()
    }
}

fn eyes_closed(metrics: &MetricsSnapshot) -> Option<bool> {
    let eye = metrics.eye_closure.as_ref()?;
    Some(eye.eye_closed? && eye.sustained()? >= SUSTAINED_FULL)
}

fn drowsiness(metrics: &MetricsSnapshot) -> Option<bool> {
    metrics.eye_closure.as_ref()?.perclos_alert
}

fn phone_usage(metrics: &MetricsSnapshot) -> Option<bool> {
    let phone = metrics.phone_usage.as_ref()?;
    Some(phone.phone_usage? && phone.sustained()? >= SUSTAINED_FULL)
}

fn head_pose(metrics: &MetricsSnapshot) -> Option<bool> {
    let pose = metrics.head_pose.as_ref()?;
    Some(pose.any_alert()? && pose.sustained()? >= SUSTAINED_FULL)
}

fn gaze_off_road(metrics: &MetricsSnapshot) -> Option<bool> {
    metrics.gaze.as_ref()?.gaze_alert
}

fn yawning(metrics: &MetricsSnapshot) -> Option<bool> {
    metrics.yawn.as_ref()?.yawn_rate_alert
}
