//! Inference frame feed
//!
//! Turns a stream of NDJSON inference frames into session events.

use std::future::Future;

use dms::InferenceFrame;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::error::MonitorError;
use crate::session::SessionEvent;

async fn send(tx: &mpsc::Sender<SessionEvent>, event: SessionEvent) -> Result<(), MonitorError> {
    tx.send(event).await.map_err(|_| MonitorError::SessionClosed)
}

/// Start a session, forward one `Metrics` event per decodable line, then stop.
///
/// Reading ends at EOF or once `shutdown` resolves. A shutdown that fires
/// while an event is waiting for channel capacity ends the feed right after
/// that event is delivered. Undecodable lines are logged and skipped.
pub async fn feed_frames<R, F>(
    reader: R,
    shutdown: F,
    tx: mpsc::Sender<SessionEvent>,
) -> Result<(), MonitorError>
where
    R: AsyncBufRead + Unpin,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    send(&tx, SessionEvent::Start).await?;

    let mut lines = reader.lines();
    let mut forwarded = 0u64;
    loop {
        let line = tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!("Shutdown requested, stopping session");
                break;
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        match InferenceFrame::from_json(&line) {
            Ok(frame) => {
                send(&tx, SessionEvent::Metrics(frame.metrics)).await?;
                forwarded += 1;
            }
            Err(e) => warn!("Skipping frame: {}", e),
        }
    }

    info!("Frame feed finished after {} frames", forwarded);
    send(&tx, SessionEvent::Stop).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::pending;
    use tokio::io::BufReader;
    use tokio::sync::oneshot;

    const FRAMES: &str = concat!(
        r#"{"metrics": {"yawn": {"yawn_rate_alert": true}}}"#,
        "\n",
        "not json\n",
        "\n",
        r#"{"timestamp": "t1", "metrics": null}"#,
        "\n",
    );

    async fn collect(mut rx: mpsc::Receiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_feed_until_eof() {
        let (tx, rx) = mpsc::channel(16);
        feed_frames(BufReader::new(FRAMES.as_bytes()), pending(), tx)
            .await
            .unwrap();

        let events = collect(rx).await;
        assert_eq!(events.len(), 4);
        assert!(matches!(events[0], SessionEvent::Start));
        assert!(matches!(&events[1], SessionEvent::Metrics(Some(m)) if m.yawn.is_some()));
        assert!(matches!(events[2], SessionEvent::Metrics(None)));
        assert!(matches!(events[3], SessionEvent::Stop));
    }

    #[tokio::test]
    async fn test_shutdown_before_reading() {
        let (tx, rx) = mpsc::channel(16);
        feed_frames(BufReader::new(FRAMES.as_bytes()), async {}, tx)
            .await
            .unwrap();

        let events = collect(rx).await;
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], SessionEvent::Start));
        assert!(matches!(events[1], SessionEvent::Stop));
    }

    #[tokio::test]
    async fn test_shutdown_while_blocked_on_send_is_kept() {
        let (tx, mut rx) = mpsc::channel(1);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let feed = tokio::spawn(feed_frames(
            BufReader::new(FRAMES.as_bytes()),
            async move {
                let _ = shutdown_rx.await;
            },
            tx,
        ));

        // Start fills the channel, so the feed parks sending the first frame
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        shutdown_tx.send(()).unwrap();

        assert!(matches!(rx.recv().await, Some(SessionEvent::Start)));
        assert!(matches!(rx.recv().await, Some(SessionEvent::Metrics(Some(_)))));
        assert!(matches!(rx.recv().await, Some(SessionEvent::Stop)));
        assert!(rx.recv().await.is_none());
        feed.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_closed_session_is_an_error() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let err = feed_frames(BufReader::new(FRAMES.as_bytes()), pending(), tx)
            .await
            .unwrap_err();
        assert!(matches!(err, MonitorError::SessionClosed));
    }
}
