//! Recording capability ports for tests

use std::sync::{Mutex, MutexGuard};

use tokio::sync::oneshot;

use crate::ports::{
    CompletionHandle, HapticPattern, HapticPort, SpeechOutcome, SpeechPort, StopAck, Utterance,
};

#[derive(Debug, Default)]
struct SpeechLog {
    spoken: Vec<String>,
    pending: Vec<CompletionHandle>,
    stop_requests: usize,
    withheld_acks: Vec<oneshot::Sender<()>>,
}

/// Speech port that records utterances and leaves them pending until the
/// test finishes them.
///
/// `stop_speech` reports every pending utterance as stopped, like a real
/// engine would.
#[derive(Debug)]
pub struct RecordingSpeech {
    log: Mutex<SpeechLog>,
    available: bool,
    withhold_acks: bool,
}

impl RecordingSpeech {
    /// Available speech that acknowledges stops
    pub fn new() -> Self {
        Self {
            log: Mutex::new(SpeechLog::default()),
            available: true,
            withhold_acks: false,
        }
    }

    /// Speech denied at the platform level
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Never acknowledges stop requests
    pub fn withholding_stop_acks() -> Self {
        Self {
            withhold_acks: true,
            ..Self::new()
        }
    }

    fn log(&self) -> MutexGuard<'_, SpeechLog> {
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Every text passed to `speak`, in order
    pub fn spoken(&self) -> Vec<String> {
        self.log().spoken.clone()
    }

    /// Number of `stop_speech` calls
    pub fn stop_requests(&self) -> usize {
        self.log().stop_requests
    }

    /// Utterances still waiting for an outcome
    pub fn pending(&self) -> Vec<Utterance> {
        self.log().pending.iter().map(CompletionHandle::utterance).collect()
    }

    /// Finish the oldest pending utterance
    pub fn finish_next(&self, outcome: SpeechOutcome) -> Option<Utterance> {
        let handle = {
            let mut log = self.log();
            if log.pending.is_empty() {
                return None;
            }
            log.pending.remove(0)
        };
        let utterance = handle.utterance();
        handle.finish(outcome);
        Some(utterance)
    }

    /// Finish every pending utterance
    pub fn finish_all(&self, outcome: SpeechOutcome) -> usize {
        let pending = std::mem::take(&mut self.log().pending);
        let count = pending.len();
        for handle in pending {
            handle.finish(outcome);
        }
        count
    }
}

impl Default for RecordingSpeech {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechPort for RecordingSpeech {
    fn is_available(&self) -> bool {
        self.available
    }

    fn speak(&self, text: &str, completion: CompletionHandle) {
        let mut log = self.log();
        log.spoken.push(text.to_string());
        log.pending.push(completion);
    }

    fn stop_speech(&self) -> StopAck {
        let interrupted = {
            let mut log = self.log();
            log.stop_requests += 1;
            std::mem::take(&mut log.pending)
        };
        for handle in interrupted {
            handle.finish(SpeechOutcome::Stopped);
        }

        if self.withhold_acks {
            let (tx, ack) = StopAck::channel();
            self.log().withheld_acks.push(tx);
            ack
        } else {
            StopAck::ready()
        }
    }
}

/// Haptic port that records every pattern
#[derive(Debug, Default)]
pub struct RecordingHaptic {
    patterns: Mutex<Vec<HapticPattern>>,
}

impl RecordingHaptic {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Every pattern triggered, in order
    pub fn patterns(&self) -> Vec<HapticPattern> {
        self.patterns
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl HapticPort for RecordingHaptic {
    fn trigger(&self, pattern: HapticPattern) {
        self.patterns
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(pattern);
    }
}
