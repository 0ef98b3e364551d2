//! Per-connection outbound queues.
//!
//! Each connection gets a bounded queue between the hub and its socket
//! writer. Pushing never waits: once the queue is full the oldest frame
//! for that connection is overwritten, so one slow visitor only ever loses
//! its own backlog.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::warn;

/// A serialized frame, shared by every recipient of one fan-out.
pub type Frame = Arc<str>;

/// Create a queue holding at most `capacity` frames.
///
/// The capacity is rounded up to the next power of two.
pub fn outbox(capacity: usize) -> (Outbox, OutboxReceiver) {
    let (tx, rx) = broadcast::channel(capacity.max(1));
    (Outbox { tx }, OutboxReceiver { rx, dropped: 0 })
}

/// Hub-side handle of a connection's queue.
#[derive(Debug, Clone)]
pub struct Outbox {
    tx: broadcast::Sender<Frame>,
}

impl Outbox {
    /// Queue a frame without waiting.
    ///
    /// Returns `false` if the writer side is gone.
    pub fn push(&self, frame: Frame) -> bool {
        self.tx.send(frame).is_ok()
    }

    /// Whether the writer side has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.receiver_count() == 0
    }
}

/// Writer-side end of a connection's queue.
#[derive(Debug)]
pub struct OutboxReceiver {
    rx: broadcast::Receiver<Frame>,
    dropped: u64,
}

impl OutboxReceiver {
    /// Next frame, skipping over anything that was overwritten.
    ///
    /// Returns `None` once the hub has dropped the session and the backlog
    /// is drained.
    pub async fn recv(&mut self) -> Option<Frame> {
        loop {
            match self.rx.recv().await {
                Ok(frame) => return Some(frame),
                Err(RecvError::Lagged(skipped)) => self.record_lag(skipped),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next frame if one is ready.
    pub fn try_recv(&mut self) -> Option<Frame> {
        loop {
            match self.rx.try_recv() {
                Ok(frame) => return Some(frame),
                Err(TryRecvError::Lagged(skipped)) => self.record_lag(skipped),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// Frames lost to overflow so far.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn record_lag(&mut self, skipped: u64) {
        self.dropped += skipped;
        warn!(skipped, total = self.dropped, "outbound queue overflowed, dropped oldest frames");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(s: &str) -> Frame {
        Arc::from(s)
    }

    #[test]
    fn frames_arrive_in_order() {
        let (tx, mut rx) = outbox(8);
        assert!(tx.push(frame("a")));
        assert!(tx.push(frame("b")));
        assert_eq!(rx.try_recv().as_deref(), Some("a"));
        assert_eq!(rx.try_recv().as_deref(), Some("b"));
        assert_eq!(rx.try_recv(), None);
    }

    #[test]
    fn overflow_drops_oldest() {
        let (tx, mut rx) = outbox(4);
        for i in 0..10 {
            assert!(tx.push(frame(&i.to_string())));
        }

        let received: Vec<_> = std::iter::from_fn(|| rx.try_recv())
            .map(|f| f.to_string())
            .collect();
        assert_eq!(received, vec!["6", "7", "8", "9"]);
        assert_eq!(rx.dropped(), 6);
    }

    #[test]
    fn push_fails_once_writer_is_gone() {
        let (tx, rx) = outbox(4);
        drop(rx);
        assert!(tx.is_closed());
        assert!(!tx.push(frame("late")));
    }

    #[tokio::test]
    async fn recv_ends_after_hub_drops_sender() {
        let (tx, mut rx) = outbox(4);
        tx.push(frame("last"));
        drop(tx);
        assert_eq!(rx.recv().await.as_deref(), Some("last"));
        assert_eq!(rx.recv().await, None);
    }
}
