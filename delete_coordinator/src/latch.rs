//! A counting latch used to wait for replica acknowledgements.

use parking_lot::Mutex;
use std::time::Duration;
use tokio::sync::Notify;

/// A one-shot countdown: initialised to the number of expected events and
/// decremented once per event, it can be awaited until the count reaches
/// zero.
///
/// Counting down past zero is a no-op, so a stray extra decrement can never
/// make the latch "un-drain" or underflow. Callers are still expected to
/// gate decrements on first-seen acknowledgements (see
/// [`crate::tracker::TabletDeleteInfo::record_ack`]) so the count means
/// "distinct outstanding acknowledgements".
#[derive(Debug)]
pub struct CountdownLatch {
    remaining: Mutex<usize>,
    drained: Notify,
}

impl CountdownLatch {
    /// Create a latch expecting `count` events. A latch created with zero
    /// is already drained.
    pub fn new(count: usize) -> Self {
        Self {
            remaining: Mutex::new(count),
            drained: Notify::new(),
        }
    }

    /// Record one event. Wakes all waiters when the count reaches zero.
    pub fn count_down(&self) {
        let mut remaining = self.remaining.lock();
        match *remaining {
            0 => {}
            1 => {
                *remaining = 0;
                self.drained.notify_waiters();
            }
            _ => *remaining -= 1,
        }
    }

    /// The number of events still outstanding.
    pub fn remaining(&self) -> usize {
        *self.remaining.lock()
    }

    /// Wait until the count reaches zero.
    pub async fn wait(&self) {
        let drained = self.drained.notified();
        tokio::pin!(drained);

        loop {
            // Enable the waiter before checking the count: a plain
            // `notified()` future only registers once first polled, so a
            // count_down landing between the check and the await would
            // call notify_waiters() with nobody registered and the wakeup
            // would be lost.
            drained.as_mut().enable();
            if *self.remaining.lock() == 0 {
                return;
            }
            drained.as_mut().await;
            drained.set(self.drained.notified());
        }
    }

    /// Wait until the count reaches zero or `timeout` elapses, whichever
    /// comes first. Returns whether the latch drained.
    pub async fn wait_timeout(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.wait()).await.is_ok()
    }
}
