//! Monitoring session controller

use std::sync::Arc;

use alerting::{AlertId, AlertRegistry, AlertScheduler, HapticPort, SpeechPort};
use dms::MetricsSnapshot;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::MonitorError;
use crate::policy::GazeSuppression;
use crate::settings::Settings;

/// Input to a running session
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Monitoring switched on
    Start,
    /// Monitoring switched off
    Stop,
    /// New metrics sample (`None` when the frame had none)
    Metrics(Option<MetricsSnapshot>),
    /// User toggled speech or haptic alerts
    Preferences { speech: bool, haptic: bool },
}

/// Owns the alert scheduler for one monitored driver
pub struct MonitoringSession<S, H> {
    scheduler: AlertScheduler<S, H>,
    session_id: Option<Uuid>,
}

impl<S: SpeechPort, H: HapticPort> MonitoringSession<S, H> {
    /// Create a session controller with the gaze suppression policy installed
    pub fn new(
        registry: Arc<AlertRegistry>,
        settings: &Settings,
        speech: S,
        haptic: H,
    ) -> Result<Self, MonitorError> {
        let scheduler = AlertScheduler::new(
            registry,
            settings.scheduler.clone(),
            settings.preferences,
            speech,
            haptic,
        )?
        .with_policy(GazeSuppression);

        Ok(Self {
            scheduler,
            session_id: None,
        })
    }

    /// Open a session with a fresh id. No-op while one is active.
    pub fn start(&mut self) {
        if let Some(id) = self.session_id {
            debug!("Monitoring session {} already active", id);
            return;
        }
        let id = Uuid::new_v4();
        info!("Monitoring session {} started", id);
        self.session_id = Some(id);
        self.scheduler.start();
    }

    /// Safe to call when no session is active
    pub async fn stop(&mut self) {
        self.scheduler.stop().await;
        if let Some(id) = self.session_id.take() {
            info!("Monitoring session {} stopped", id);
        }
    }

    /// Forward output toggles to the scheduler
    pub fn set_preferences(&mut self, speech: bool, haptic: bool) {
        self.scheduler.set_preferences(speech, haptic);
    }

    /// Forward a metrics sample while the session is active
    pub async fn on_metrics(&mut self, metrics: Option<&MetricsSnapshot>) -> Option<AlertId> {
        self.session_id?;
        self.scheduler.process_metrics(metrics).await
    }

    /// Apply one event. Returns the alert it fired, if any.
    pub async fn handle_event(&mut self, event: SessionEvent) -> Option<AlertId> {
        match event {
            SessionEvent::Start => {
                self.start();
                None
            }
            SessionEvent::Stop => {
                self.stop().await;
                None
            }
            SessionEvent::Metrics(metrics) => self.on_metrics(metrics.as_ref()).await,
            SessionEvent::Preferences { speech, haptic } => {
                self.set_preferences(speech, haptic);
                None
            }
        }
    }

    /// Serve events and scheduler completions until the event stream closes,
    /// then stop.
    pub async fn run(&mut self, mut events: mpsc::Receiver<SessionEvent>) {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => {
                        self.handle_event(event).await;
                    }
                    None => break,
                },
                Some(completion) = self.scheduler.next_completion() => {
                    self.scheduler.handle_completion(completion);
                }
            }
        }

        debug!("Session event stream closed");
        self.stop().await;
    }

    /// Id of the active session
    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }

    /// Whether a session is running
    pub fn is_active(&self) -> bool {
        self.session_id.is_some()
    }

    /// The underlying alert scheduler
    pub fn scheduler(&self) -> &AlertScheduler<S, H> {
        &self.scheduler
    }

    /// Mutable access to the underlying alert scheduler
    pub fn scheduler_mut(&mut self) -> &mut AlertScheduler<S, H> {
        &mut self.scheduler
    }
}
