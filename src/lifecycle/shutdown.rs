//! One-shot stop signal for background tasks.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::broadcast;

/// Broadcasts a single "stop" to every subscribed task.
///
/// Each log channel owns one of these for its retention sweeper.
#[derive(Debug)]
pub struct StopSignal {
    tx: broadcast::Sender<()>,
    fired: AtomicBool,
}

impl StopSignal {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            fired: AtomicBool::new(false),
        }
    }

    /// Subscribe to the stop signal.
    ///
    /// Subscribers created after [`trigger`](Self::trigger) will not see the
    /// message; check [`is_triggered`](Self::is_triggered) first.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Fire the signal. Returns `false` if it had already been fired.
    pub fn trigger(&self) -> bool {
        if self.fired.swap(true, Ordering::SeqCst) {
            return false;
        }
        // No receivers just means nothing was listening.
        let _ = self.tx.send(());
        true
    }

    pub fn is_triggered(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trigger_reaches_subscribers_once() {
        let stop = StopSignal::new();
        let mut rx = stop.subscribe();

        assert!(stop.trigger());
        assert!(!stop.trigger());
        assert!(stop.is_triggered());

        assert!(rx.recv().await.is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_trigger_without_subscribers() {
        let stop = StopSignal::default();
        assert!(stop.trigger());
        assert!(stop.is_triggered());
    }
}
