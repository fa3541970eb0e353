use std::sync::Arc;

use alerting::testing::{RecordingHaptic, RecordingSpeech};
use alerting::{apply_policies, evaluate, AlertId, AlertPolicy, AlertRegistry};
use dms::{EyeClosureMetrics, GazeMetrics, MetricsSnapshot};
use monitor::{GazeSuppression, MonitoringSession, Settings};

type TestSession = MonitoringSession<Arc<RecordingSpeech>, Arc<RecordingHaptic>>;

fn session() -> TestSession {
    let mut settings = Settings::default();
    settings.scheduler.startup_delay_ms = 0;
    MonitoringSession::new(
        Arc::new(AlertRegistry::default()),
        &settings,
        Arc::new(RecordingSpeech::new()),
        Arc::new(RecordingHaptic::new()),
    )
    .unwrap()
}

fn gaze_with_eye_closure(sustained: Option<f64>) -> MetricsSnapshot {
    MetricsSnapshot {
        eye_closure: sustained.map(|s| EyeClosureMetrics {
            eye_closed: Some(true),
            eye_closed_sustained: Some(s),
            ..Default::default()
        }),
        gaze: Some(GazeMetrics {
            gaze_alert: Some(true),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[test]
fn test_evaluator_reports_gaze_but_policy_removes_it() {
    let registry = AlertRegistry::default();
    let metrics = gaze_with_eye_closure(Some(0.3));

    let mut candidates = evaluate(&metrics, &registry);
    assert_eq!(
        candidates.iter().map(|d| d.id).collect::<Vec<_>>(),
        vec![AlertId::GazeOffRoad]
    );

    let policies: Vec<Box<dyn AlertPolicy>> = vec![Box::new(GazeSuppression)];
    apply_policies(&policies, &metrics, &mut candidates);
    assert!(candidates.is_empty());
}

#[test]
fn test_policy_only_touches_gaze() {
    let registry = AlertRegistry::default();
    let metrics = gaze_with_eye_closure(Some(0.3));
    let policy = GazeSuppression;

    for definition in registry.iter() {
        let permitted = policy.permits(&metrics, definition);
        assert_eq!(permitted, definition.id != AlertId::GazeOffRoad, "{}", definition.id);
    }
}

#[tokio::test(start_paused = true)]
async fn test_closing_eyes_suppress_gaze_alert() {
    let mut session = session();
    session.start();

    let metrics = gaze_with_eye_closure(Some(0.3));
    assert_eq!(session.on_metrics(Some(&metrics)).await, None);
    assert!(!session.scheduler().is_channel_busy());
}

#[tokio::test(start_paused = true)]
async fn test_open_eyes_allow_gaze_alert() {
    let mut session = session();
    session.start();

    let metrics = gaze_with_eye_closure(Some(0.0));
    assert_eq!(session.on_metrics(Some(&metrics)).await, Some(AlertId::GazeOffRoad));
}

#[tokio::test(start_paused = true)]
async fn test_missing_eye_closure_allows_gaze_alert() {
    let mut session = session();
    session.start();

    let metrics = gaze_with_eye_closure(None);
    assert_eq!(session.on_metrics(Some(&metrics)).await, Some(AlertId::GazeOffRoad));
}
