//! Alerting System
//!
//! Turns per-frame driver metrics into at most one spoken/haptic warning at a
//! time: an immutable alert registry, a pure condition evaluator, and a
//! preemptive scheduler with per-alert cooldowns and a startup grace period.

mod config;
mod error;
mod evaluator;
mod policy;
mod ports;
mod registry;
mod scheduler;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use config::{AlertPreferences, SchedulerConfig, WelcomePolicy};
pub use error::AlertError;
pub use evaluator::evaluate;
pub use policy::{apply_policies, AlertPolicy};
pub use ports::{
    Completion, CompletionCause, CompletionHandle, HapticPattern, HapticPort, SpeechOutcome,
    SpeechPort, StopAck, Utterance,
};
pub use registry::{AlertDefinition, AlertId, AlertPriority, AlertRegistry, TriggerCondition};
pub use scheduler::{ActiveAlert, AlertRuntimeState, AlertScheduler};
