//! Driver Fatigue Monitor
//!
//! Session controller that feeds per-frame driver metrics into the alert
//! scheduler, plus the logging and settings plumbing for the daemon.

use tracing_subscriber::FmtSubscriber;

mod error;
mod feed;
mod policy;
mod ports;
mod session;
mod settings;

pub use error::MonitorError;
pub use feed::feed_frames;
pub use policy::GazeSuppression;
pub use ports::{SimulatedSpeech, TracingHaptic};
pub use session::{MonitoringSession, SessionEvent};
pub use settings::{LoggingSettings, Settings, SpeechSettings};

/// Initialize logging
pub fn init_logging(settings: &LoggingSettings) -> Result<(), MonitorError> {
    let builder = FmtSubscriber::builder()
        .with_max_level(settings.level()?)
        .with_target(true);

    if settings.json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    Ok(())
}
