//! Alert Scheduler Implementation
//!
//! One serialized state machine owns the warning channel:
//!
//! ```text
//!  session:  Idle ──start()──► Started ──stop()──► Idle
//!
//!  alert:    Silent ──selected, cooled down, outranks current──► Active
//!            Active ──finished | stopped | failed | fallback | watchdog | preempted──► Silent
//! ```
//!
//! At most one alert is Active. Every path back to Silent goes through
//! [`AlertScheduler::handle_completion`] or preemption, and completions carry
//! a per-trigger ticket so late or repeated deliveries are ignored.

use std::cmp::Reverse;
use std::sync::Arc;
use std::time::Duration;

use dms::MetricsSnapshot;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{AlertPreferences, SchedulerConfig, WelcomePolicy};
use crate::error::AlertError;
use crate::evaluator::evaluate;
use crate::policy::{apply_policies, AlertPolicy};
use crate::ports::{
    Completion, CompletionCause, CompletionHandle, HapticPattern, HapticPort, SpeechOutcome,
    SpeechPort, Utterance,
};
use crate::registry::{AlertDefinition, AlertId, AlertPriority, AlertRegistry};

/// Runtime state of one alert
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertRuntimeState {
    last_triggered_at: Option<Instant>,
    /// Ticket of the trigger currently holding the channel
    ticket: Option<u64>,
}

impl AlertRuntimeState {
    /// `None` if the alert never fired in this session
    pub fn last_triggered_at(&self) -> Option<Instant> {
        self.last_triggered_at
    }

    /// Whether this alert holds the warning channel
    pub fn is_active(&self) -> bool {
        self.ticket.is_some()
    }

    fn cooled_down(&self, cooldown: Duration, now: Instant) -> bool {
        self.last_triggered_at
            .map_or(true, |at| now.duration_since(at) >= cooldown)
    }
}

/// Alert currently occupying the warning channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveAlert {
    pub id: AlertId,
    pub priority: AlertPriority,
    pub ticket: u64,
}

/// Preemptive scheduler for speech/haptic alerts
pub struct AlertScheduler<S, H> {
    registry: Arc<AlertRegistry>,
    config: SchedulerConfig,
    policies: Vec<Box<dyn AlertPolicy>>,
    speech: S,
    haptic: H,
    preferences: AlertPreferences,
    states: [AlertRuntimeState; AlertId::COUNT],
    current: Option<ActiveAlert>,
    session_started_at: Option<Instant>,
    has_played_welcome: bool,
    next_ticket: u64,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: mpsc::UnboundedReceiver<Completion>,
}

impl<S: SpeechPort, H: HapticPort> AlertScheduler<S, H> {
    /// Create a new scheduler in the Idle state
    pub fn new(
        registry: Arc<AlertRegistry>,
        config: SchedulerConfig,
        preferences: AlertPreferences,
        speech: S,
        haptic: H,
    ) -> Result<Self, AlertError> {
        config.validate()?;
        info!(
            "Creating alert scheduler with {} alerts, config: {:?}",
            registry.len(),
            config
        );

        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        Ok(Self {
            registry,
            config,
            policies: Vec::new(),
            speech,
            haptic,
            preferences,
            states: [AlertRuntimeState::default(); AlertId::COUNT],
            current: None,
            session_started_at: None,
            has_played_welcome: false,
            next_ticket: 0,
            completion_tx,
            completion_rx,
        })
    }

    /// Install a policy that runs between evaluation and selection
    pub fn with_policy(mut self, policy: impl AlertPolicy + 'static) -> Self {
        debug!("Installing alert policy {}", policy.name());
        self.policies.push(Box::new(policy));
        self
    }

    /// Begin a session: arm the grace period and greet the driver
    pub fn start(&mut self) {
        if let Some(active) = self.current.take() {
            debug!("Releasing channel held by {} on start", active.id);
        }
        for state in &mut self.states {
            state.ticket = None;
        }
        self.session_started_at = Some(Instant::now());
        info!(
            "Alert session started, alerting in {} ms",
            self.config.startup_delay_ms
        );
        self.play_welcome();
    }

    fn play_welcome(&mut self) {
        if self.has_played_welcome || !self.speech_ready() {
            return;
        }
        self.has_played_welcome = true;
        debug!("Playing welcome message");
        let handle = CompletionHandle::new(Utterance::Welcome, self.completion_tx.clone());
        self.speech.speak(&self.config.welcome_message, handle);
    }

    /// Evaluate one metrics sample and fire at most one alert.
    ///
    /// Returns the alert that took the channel, if any.
    pub async fn process_metrics(&mut self, metrics: Option<&MetricsSnapshot>) -> Option<AlertId> {
        let metrics = metrics?;
        let started_at = self.session_started_at?;
        let now = Instant::now();
        if now.duration_since(started_at) < self.config.startup_delay() {
            return None;
        }

        let registry = Arc::clone(&self.registry);
        let mut candidates = evaluate(metrics, &registry);
        if candidates.is_empty() {
            return None;
        }
        apply_policies(&self.policies, metrics, &mut candidates);

        let selected = self.select_at(&candidates, now)?;
        self.trigger_alert(selected).await.then_some(selected)
    }

    /// Highest priority candidate that is out of cooldown and outranks the
    /// alert holding the channel. Ties keep registry order.
    pub fn select_alert(&self, candidates: &[&AlertDefinition]) -> Option<AlertId> {
        self.select_at(candidates, Instant::now())
    }

    fn select_at(&self, candidates: &[&AlertDefinition], now: Instant) -> Option<AlertId> {
        let mut ordered = candidates.to_vec();
        ordered.sort_by_key(|definition| {
            (
                Reverse(definition.priority),
                self.registry.position(definition.id).unwrap_or(usize::MAX),
            )
        });

        for definition in ordered {
            let state = &self.states[definition.id.index()];
            if !state.cooled_down(definition.cooldown, now) {
                debug!("Alert {} suppressed: in cooldown period", definition.id);
                continue;
            }

            if let Some(current) = self.current {
                if definition.priority <= current.priority {
                    debug!(
                        "Alert {} suppressed: channel held by {}",
                        definition.id, current.id
                    );
                    continue;
                }
            }

            return Some(definition.id);
        }

        None
    }

    /// Put an alert on the channel.
    ///
    /// Refused outside a session and during the alert's cooldown. A busy
    /// channel is only taken over by a strictly higher priority; the current
    /// speech is stopped (and acknowledged, or timed out) first.
    /// Returns whether the alert fired.
    pub async fn trigger_alert(&mut self, id: AlertId) -> bool {
        if !self.is_started() {
            debug!("Alert {} ignored: no active session", id);
            return false;
        }

        let registry = Arc::clone(&self.registry);
        let Some(definition) = registry.get(id) else {
            warn!("Alert {} is not in the registry", id);
            return false;
        };

        let state = &self.states[id.index()];
        if state.is_active() {
            debug!("Alert {} already active", id);
            return false;
        }
        if !state.cooled_down(definition.cooldown, Instant::now()) {
            debug!("Alert {} suppressed: in cooldown period", id);
            return false;
        }

        if let Some(current) = self.current {
            if definition.priority <= current.priority {
                debug!("Alert {} does not outrank active alert {}", id, current.id);
                return false;
            }
            info!("Alert {} preempts {}", id, current.id);
            metrics::counter!("alerts_preempted_total", "alert" => current.id.as_str()).increment(1);
            self.interrupt_speech().await;
            self.clear_alert_state(current.id);
        }

        let ticket = self.next_ticket;
        self.next_ticket += 1;

        let state = &mut self.states[id.index()];
        state.last_triggered_at = Some(Instant::now());
        state.ticket = Some(ticket);
        self.current = Some(ActiveAlert {
            id,
            priority: definition.priority,
            ticket,
        });

        info!("Alert triggered: {} ({:?})", id, definition.priority);
        metrics::counter!("alerts_triggered_total", "alert" => id.as_str()).increment(1);

        if self.preferences.haptic {
            self.haptic.trigger(HapticPattern::for_priority(definition.priority));
        }

        let utterance = Utterance::Alert { id, ticket };
        if self.speech_ready() {
            let handle = CompletionHandle::new(utterance, self.completion_tx.clone());
            self.speech.speak(&definition.message, handle);
            if let Some(watchdog) = self.config.speech_watchdog() {
                self.schedule_completion(watchdog, utterance, CompletionCause::Watchdog);
            }
        } else {
            self.schedule_completion(
                self.config.speech_disabled_clear(),
                utterance,
                CompletionCause::SpeechDisabled,
            );
        }

        true
    }

    /// Release an alert. Idempotent.
    pub fn clear_alert_state(&mut self, id: AlertId) {
        self.states[id.index()].ticket = None;
        if self.current.is_some_and(|active| active.id == id) {
            self.current = None;
        }
    }

    /// Apply one completion. Completions for a trigger that no longer holds
    /// the channel are ignored.
    pub fn handle_completion(&mut self, completion: Completion) {
        let Utterance::Alert { id, ticket } = completion.utterance else {
            debug!("Welcome message ended: {:?}", completion.cause);
            return;
        };

        if self.states[id.index()].ticket != Some(ticket) {
            debug!("Ignoring stale completion for {} (ticket {})", id, ticket);
            return;
        }

        match completion.cause {
            CompletionCause::Speech(SpeechOutcome::Failed) => {
                warn!("Speech failed for alert {}", id);
            }
            CompletionCause::Watchdog => {
                warn!("No speech outcome for alert {}, releasing channel", id);
            }
            cause => debug!("Alert {} completed: {:?}", id, cause),
        }

        self.clear_alert_state(id);
    }

    /// Wait for the next completion
    pub async fn next_completion(&mut self) -> Option<Completion> {
        self.completion_rx.recv().await
    }

    /// Apply every completion already delivered. Returns how many were handled.
    pub fn drain_completions(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(completion) = self.completion_rx.try_recv() {
            self.handle_completion(completion);
            handled += 1;
        }
        handled
    }

    /// Update output toggles. Turning speech off interrupts the current
    /// utterance without waiting; its own completion releases the channel.
    pub fn set_preferences(&mut self, speech: bool, haptic: bool) {
        let speech_turned_off = self.preferences.speech && !speech;
        self.preferences = AlertPreferences { speech, haptic };
        debug!("Alert preferences updated: {:?}", self.preferences);

        if speech_turned_off {
            drop(self.speech.stop_speech());
        }
    }

    /// End the session: silence speech and forget cooldown history.
    /// Safe to call repeatedly or before any `start()`.
    pub async fn stop(&mut self) {
        self.interrupt_speech().await;

        if let Some(active) = self.current.take() {
            debug!("Releasing channel held by {} on stop", active.id);
        }
        self.states = [AlertRuntimeState::default(); AlertId::COUNT];
        self.session_started_at = None;
        if self.config.welcome_policy == WelcomePolicy::EverySession {
            self.has_played_welcome = false;
        }

        info!("Alert session stopped");
    }

    async fn interrupt_speech(&self) {
        let ack = self.speech.stop_speech();
        if !ack.wait(self.config.stop_ack_timeout()).await {
            warn!(
                "Speech stop not acknowledged within {} ms",
                self.config.stop_ack_timeout_ms
            );
        }
    }

    fn schedule_completion(&self, after: Duration, utterance: Utterance, cause: CompletionCause) {
        let deadline = Instant::now() + after;
        let tx = self.completion_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let _ = tx.send(Completion { utterance, cause });
        });
    }

    fn speech_ready(&self) -> bool {
        self.preferences.speech && self.speech.is_available()
    }

    /// Whether a session is running
    pub fn is_started(&self) -> bool {
        self.session_started_at.is_some()
    }

    /// Whether an alert holds the warning channel
    pub fn is_channel_busy(&self) -> bool {
        self.current.is_some()
    }

    /// Alert holding the warning channel, if any
    pub fn current_alert(&self) -> Option<ActiveAlert> {
        self.current
    }

    /// Cooldown and activity state of one alert
    pub fn runtime_state(&self, id: AlertId) -> AlertRuntimeState {
        self.states[id.index()]
    }

    /// Whether the welcome message has been spoken
    pub fn has_played_welcome(&self) -> bool {
        self.has_played_welcome
    }

    /// Current output toggles
    pub fn preferences(&self) -> AlertPreferences {
        self.preferences
    }
}
