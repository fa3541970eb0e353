//! Driver Fatigue Monitor - Main Entry Point
//!
//! Reads inference frames (one JSON object per line) from stdin and drives a
//! monitoring session with simulated speech and haptic engines.
//!
//! Usage: `fatigue-monitor [settings.toml] < frames.ndjson`

use std::path::PathBuf;
use std::sync::Arc;

use alerting::AlertRegistry;
use monitor::{feed_frames, init_logging, MonitoringSession, Settings, SimulatedSpeech, TracingHaptic};
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings_path = std::env::args().nth(1).map(PathBuf::from);
    let settings = Settings::load(settings_path.as_deref())?;
    init_logging(&settings.logging)?;

    info!("=== Fatigue Monitor v{} ===", env!("CARGO_PKG_VERSION"));

    let speech = SimulatedSpeech::new(settings.speech.words_per_minute);
    let mut session = MonitoringSession::new(
        Arc::new(AlertRegistry::default()),
        &settings,
        speech,
        TracingHaptic,
    )?;

    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(async move {
        let stdin = BufReader::new(tokio::io::stdin());
        let interrupted = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        };
        if let Err(e) = feed_frames(stdin, interrupted, tx).await {
            error!("Frame reader failed: {}", e);
        }
    });

    session.run(rx).await;
    info!("Fatigue monitor exiting");
    Ok(())
}
