//! Graceful-shutdown plumbing for the in-process driver.
//!
//! The harness is driven programmatically by the test framework, so there
//! is no OS-signal handling here; [`StopSignal`] is triggered by
//! [`ServerLifecycle::stop`](crate::ServerLifecycle::stop) and observed by
//! the accept loop and by every open connection.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, Notify};

/// A cloneable one-shot stop signal shared between the accept loop and
/// connection tasks.
#[derive(Debug, Clone)]
pub struct StopSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl StopSignal {
    /// Creates an untriggered stop signal.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Triggers the signal. Idempotent.
    pub fn trigger(&self) {
        // send_replace never fails; the sender holds its own receiver slot.
        self.tx.send_replace(true);
    }

    /// Whether the signal has been triggered.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Completes when the signal is triggered; immediately if it already
    /// was.
    pub async fn triggered(&self) {
        let mut rx = self.tx.subscribe();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Counts open connections so shutdown can wait for in-flight requests.
#[derive(Debug, Clone)]
pub struct ConnectionTracker {
    active: Arc<AtomicUsize>,
    drained: Arc<Notify>,
}

impl ConnectionTracker {
    /// Creates a tracker with no active connections.
    #[must_use]
    pub fn new() -> Self {
        Self {
            active: Arc::new(AtomicUsize::new(0)),
            drained: Arc::new(Notify::new()),
        }
    }

    /// Registers a connection; drop the returned token when it closes.
    #[must_use]
    pub fn acquire(&self) -> ConnectionToken {
        self.active.fetch_add(1, Ordering::SeqCst);
        ConnectionToken {
            active: Arc::clone(&self.active),
            drained: Arc::clone(&self.drained),
        }
    }

    /// The number of currently open connections.
    #[must_use]
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Completes once every token has been dropped; immediately when none
    /// are outstanding.
    pub async fn drained(&self) {
        loop {
            // Register for the notification before re-checking the count,
            // so a token dropped in between cannot be missed.
            let notified = self.drained.notified();
            if self.active.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Token for one open connection; dropping it decrements the count.
#[derive(Debug)]
pub struct ConnectionToken {
    active: Arc<AtomicUsize>,
    drained: Arc<Notify>,
}

impl Drop for ConnectionToken {
    fn drop(&mut self) {
        if self.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.drained.notify_waiters();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_stop_signal_starts_untriggered() {
        assert!(!StopSignal::new().is_triggered());
    }

    #[test]
    fn test_stop_signal_trigger_is_idempotent() {
        let stop = StopSignal::new();
        stop.trigger();
        stop.trigger();
        assert!(stop.is_triggered());
    }

    #[tokio::test]
    async fn test_stop_signal_wakes_waiters() {
        let stop = StopSignal::new();
        let waiter = stop.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            stop.trigger();
        });

        tokio::time::timeout(Duration::from_secs(1), waiter.triggered())
            .await
            .expect("triggered() should complete");
    }

    #[tokio::test]
    async fn test_stop_signal_completes_immediately_when_already_triggered() {
        let stop = StopSignal::new();
        stop.trigger();

        tokio::time::timeout(Duration::from_millis(10), stop.triggered())
            .await
            .expect("triggered() should complete immediately");
    }

    #[test]
    fn test_tracker_counts_tokens() {
        let tracker = ConnectionTracker::new();
        let a = tracker.acquire();
        let b = tracker.acquire();
        assert_eq!(tracker.active_connections(), 2);

        drop(a);
        assert_eq!(tracker.active_connections(), 1);
        drop(b);
        assert_eq!(tracker.active_connections(), 0);
    }

    #[tokio::test]
    async fn test_tracker_drained_completes_when_empty() {
        let tracker = ConnectionTracker::new();
        tokio::time::timeout(Duration::from_millis(10), tracker.drained())
            .await
            .expect("drained() should complete immediately");
    }

    #[test]
    fn test_tracker_drained_pending_while_token_held() {
        let tracker = ConnectionTracker::new();
        let token = tracker.acquire();

        let mut drained = tokio_test::task::spawn(tracker.drained());
        tokio_test::assert_pending!(drained.poll());

        // Dropping the last token must wake the registered waiter.
        drop(token);
        assert!(drained.is_woken());
        tokio_test::assert_ready!(drained.poll());
    }

    #[test]
    fn test_tracker_drained_sees_token_dropped_before_first_poll() {
        let tracker = ConnectionTracker::new();
        let token = tracker.acquire();

        let mut drained = tokio_test::task::spawn(tracker.drained());
        drop(token);

        tokio_test::assert_ready!(drained.poll());
    }

    #[tokio::test]
    async fn test_tracker_drained_waits_for_tokens() {
        let tracker = ConnectionTracker::new();
        let token = tracker.acquire();

        let waiter = tracker.clone();
        let wait = tokio::spawn(async move { waiter.drained().await });

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            drop(token);
        });

        tokio::time::timeout(Duration::from_secs(1), wait)
            .await
            .expect("drained() should complete")
            .expect("task should not panic");
    }
}
