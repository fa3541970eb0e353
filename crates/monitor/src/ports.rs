//! Stand-in speech and haptic engines
//!
//! Used by the daemon when no platform engines are attached: playback time is
//! estimated from the word count and every action is logged.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use alerting::{CompletionHandle, HapticPattern, HapticPort, SpeechOutcome, SpeechPort, StopAck};
use tokio::task::JoinHandle;
use tracing::{debug, info};

const MIN_UTTERANCE_MS: u64 = 300;

struct InFlight {
    generation: u64,
    handle: CompletionHandle,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct Playback {
    next_generation: u64,
    in_flight: Option<InFlight>,
}

/// Single-voice speech engine that "plays" an utterance for as long as it
/// would take to say it. A new utterance cuts off the previous one.
pub struct SimulatedSpeech {
    words_per_minute: u32,
    playback: Arc<Mutex<Playback>>,
}

fn lock(playback: &Mutex<Playback>) -> MutexGuard<'_, Playback> {
    playback.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SimulatedSpeech {
    /// Create an engine speaking at `words_per_minute`
    pub fn new(words_per_minute: u32) -> Self {
        Self {
            words_per_minute: words_per_minute.max(1),
            playback: Arc::new(Mutex::new(Playback::default())),
        }
    }

    /// Estimated playback time for `text`
    pub fn duration_for(&self, text: &str) -> Duration {
        let words = text.split_whitespace().count() as u64;
        let ms = words * 60_000 / u64::from(self.words_per_minute);
        Duration::from_millis(ms.max(MIN_UTTERANCE_MS))
    }

    fn interrupt(&self) -> Option<CompletionHandle> {
        let previous = lock(&self.playback).in_flight.take()?;
        previous.task.abort();
        Some(previous.handle)
    }
}

impl SpeechPort for SimulatedSpeech {
    fn speak(&self, text: &str, completion: CompletionHandle) {
        if let Some(previous) = self.interrupt() {
            previous.finish(SpeechOutcome::Stopped);
        }

        let duration = self.duration_for(text);
        info!("Speaking ({} ms): {}", duration.as_millis(), text);

        let slot = Arc::clone(&self.playback);
        let mut playback = lock(&self.playback);
        let generation = playback.next_generation;
        playback.next_generation += 1;

        let task = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let finished = {
                let mut playback = lock(&slot);
                match playback.in_flight.take() {
                    Some(current) if current.generation == generation => Some(current.handle),
                    other => {
                        playback.in_flight = other;
                        None
                    }
                }
            };
            if let Some(handle) = finished {
                debug!("Utterance {} finished", generation);
                handle.finish(SpeechOutcome::Finished);
            }
        });

        playback.in_flight = Some(InFlight {
            generation,
            handle: completion,
            task,
        });
    }

    fn stop_speech(&self) -> StopAck {
        if let Some(handle) = self.interrupt() {
            debug!("Speech interrupted");
            handle.finish(SpeechOutcome::Stopped);
        }
        StopAck::ready()
    }
}

/// Haptic engine that logs each pulse
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingHaptic;

impl HapticPort for TracingHaptic {
    fn trigger(&self, pattern: HapticPattern) {
        info!("Haptic feedback: {:?}", pattern);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alerting::{
        AlertId, AlertPreferences, AlertRegistry, AlertScheduler, CompletionCause, SchedulerConfig,
        Utterance,
    };

    fn scheduler() -> AlertScheduler<Arc<SimulatedSpeech>, TracingHaptic> {
        AlertScheduler::new(
            Arc::new(AlertRegistry::default()),
            SchedulerConfig::default(),
            AlertPreferences::default(),
            Arc::new(SimulatedSpeech::new(120)),
            TracingHaptic,
        )
        .unwrap()
    }

    #[test]
    fn test_duration_from_word_count() {
        let speech = SimulatedSpeech::new(120);
        assert_eq!(speech.duration_for("one two three four"), Duration::from_secs(2));
        assert_eq!(speech.duration_for(""), Duration::from_millis(MIN_UTTERANCE_MS));
    }

    #[tokio::test(start_paused = true)]
    async fn test_utterance_finishes_after_playback() {
        let mut scheduler = scheduler();
        scheduler.start();

        let completion = scheduler.next_completion().await.unwrap();
        assert_eq!(completion.utterance, Utterance::Welcome);
        assert_eq!(completion.cause, CompletionCause::Speech(SpeechOutcome::Finished));
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_utterance_cuts_off_previous() {
        let mut scheduler = scheduler();
        scheduler.start();
        let welcome = scheduler.next_completion().await.unwrap();
        assert_eq!(welcome.utterance, Utterance::Welcome);

        assert!(scheduler.trigger_alert(AlertId::Yawning).await);
        assert!(scheduler.trigger_alert(AlertId::EyesClosed).await);

        // Yawning was stopped by preemption before EyesClosed started
        let completion = scheduler.next_completion().await.unwrap();
        assert_eq!(completion.cause, CompletionCause::Speech(SpeechOutcome::Stopped));
        scheduler.handle_completion(completion);
        assert!(scheduler.is_channel_busy());

        let completion = scheduler.next_completion().await.unwrap();
        assert_eq!(completion.cause, CompletionCause::Speech(SpeechOutcome::Finished));
        scheduler.handle_completion(completion);
        assert!(!scheduler.is_channel_busy());
    }
}
