//! Speech and haptic capability ports
//!
//! The scheduler drives these but does not implement them. Speech playback is
//! long-lived and reports back through a [`CompletionHandle`]; haptics are
//! fire-and-forget.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

use crate::registry::{AlertId, AlertPriority};

/// How an utterance ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeechOutcome {
    Finished,
    Stopped,
    Failed,
}

/// Haptic feedback pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HapticPattern {
    Warning,
    Impact,
}

impl HapticPattern {
    /// The two highest tiers get the warning pattern
    pub fn for_priority(priority: AlertPriority) -> Self {
        match priority {
            AlertPriority::Critical | AlertPriority::High => HapticPattern::Warning,
            AlertPriority::Medium | AlertPriority::Low => HapticPattern::Impact,
        }
    }
}

/// What a completion refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Utterance {
    Welcome,
    /// One trigger of an alert. `ticket` is unique per trigger.
    Alert { id: AlertId, ticket: u64 },
}

/// Why the channel is being released
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionCause {
    Speech(SpeechOutcome),
    /// Fallback timer while speech is off or unavailable
    SpeechDisabled,
    /// Speech never reported back in time
    Watchdog,
}

/// Tagged completion delivered to the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub utterance: Utterance,
    pub cause: CompletionCause,
}

/// Reports the outcome of one utterance back to the scheduler.
///
/// Consumed by [`finish`](Self::finish), so at most one outcome is ever
/// delivered. A handle dropped without finishing reports
/// [`SpeechOutcome::Failed`].
#[derive(Debug)]
pub struct CompletionHandle {
    utterance: Utterance,
    tx: Option<mpsc::UnboundedSender<Completion>>,
}

impl CompletionHandle {
    pub(crate) fn new(utterance: Utterance, tx: mpsc::UnboundedSender<Completion>) -> Self {
        Self {
            utterance,
            tx: Some(tx),
        }
    }

    /// What this handle reports on
    pub fn utterance(&self) -> Utterance {
        self.utterance
    }

    /// Deliver the outcome
    pub fn finish(mut self, outcome: SpeechOutcome) {
        self.deliver(outcome);
    }

    fn deliver(&mut self, outcome: SpeechOutcome) {
        if let Some(tx) = self.tx.take() {
            // Receiver gone means the scheduler was dropped; nothing to clear.
            let _ = tx.send(Completion {
                utterance: self.utterance,
                cause: CompletionCause::Speech(outcome),
            });
        }
    }
}

impl Drop for CompletionHandle {
    fn drop(&mut self) {
        self.deliver(SpeechOutcome::Failed);
    }
}

/// Acknowledgement of a stop-speech request
#[derive(Debug)]
pub struct StopAck(Option<oneshot::Receiver<()>>);

impl StopAck {
    /// Acknowledgement that resolves when the sender fires (or is dropped)
    pub fn channel() -> (oneshot::Sender<()>, StopAck) {
        let (tx, rx) = oneshot::channel();
        (tx, StopAck(Some(rx)))
    }

    /// Already acknowledged
    pub fn ready() -> Self {
        StopAck(None)
    }

    /// Wait for the acknowledgement. Returns `false` if `timeout` elapsed first.
    pub async fn wait(self, timeout: Duration) -> bool {
        match self.0 {
            None => true,
            Some(rx) => tokio::time::timeout(timeout, rx).await.is_ok(),
        }
    }
}

/// Speech synthesis capability
pub trait SpeechPort {
    /// Whether the platform currently allows speech (e.g. permission granted)
    fn is_available(&self) -> bool {
        true
    }

    /// Start speaking `text`. Exactly one outcome must eventually be sent
    /// through `completion`.
    fn speak(&self, text: &str, completion: CompletionHandle);

    /// Interrupt any in-flight utterance. The interrupted utterance must still
    /// report [`SpeechOutcome::Stopped`].
    fn stop_speech(&self) -> StopAck;
}

/// Haptic feedback capability
pub trait HapticPort {
    fn trigger(&self, pattern: HapticPattern);
}

impl<T: SpeechPort + ?Sized> SpeechPort for Arc<T> {
    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn speak(&self, text: &str, completion: CompletionHandle) {
        (**self).speak(text, completion)
    }

    fn stop_speech(&self) -> StopAck {
        (**self).stop_speech()
    }
}

impl<T: HapticPort + ?Sized> HapticPort for Arc<T> {
    fn trigger(&self, pattern: HapticPattern) {
        (**self).trigger(pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> (CompletionHandle, mpsc::UnboundedReceiver<Completion>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let utterance = Utterance::Alert {
            id: AlertId::Yawning,
            ticket: 7,
        };
        (CompletionHandle::new(utterance, tx), rx)
    }

    #[test]
    fn test_haptic_tiers() {
        assert_eq!(HapticPattern::for_priority(AlertPriority::Critical), HapticPattern::Warning);
        assert_eq!(HapticPattern::for_priority(AlertPriority::High), HapticPattern::Warning);
        assert_eq!(HapticPattern::for_priority(AlertPriority::Medium), HapticPattern::Impact);
        assert_eq!(HapticPattern::for_priority(AlertPriority::Low), HapticPattern::Impact);
    }

    #[test]
    fn test_finish_delivers_once() {
        let (handle, mut rx) = handle();
        handle.finish(SpeechOutcome::Finished);

        let completion = rx.try_recv().unwrap();
        assert_eq!(completion.cause, CompletionCause::Speech(SpeechOutcome::Finished));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dropped_handle_reports_failure() {
        let (handle, mut rx) = handle();
        drop(handle);

        let completion = rx.try_recv().unwrap();
        assert_eq!(completion.cause, CompletionCause::Speech(SpeechOutcome::Failed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ack_timeout() {
        assert!(StopAck::ready().wait(Duration::from_millis(10)).await);

        let (tx, ack) = StopAck::channel();
        tx.send(()).unwrap();
        assert!(ack.wait(Duration::from_millis(10)).await);

        let (_tx, ack) = StopAck::channel();
        assert!(!ack.wait(Duration::from_millis(10)).await);
    }
}
