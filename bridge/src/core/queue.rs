//! Soft-capped outbound message queue
//!
//! A FIFO between event producers and the sender thread. Producers never
//! block: an insert past the soft cap is rejected outright, and a
//! successful insert signals the condition variable so an idle sender
//! wakes promptly. The sender's wait is always timeout-bound.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use shared::OutboundMessage;

/// Default soft cap on pending messages.
pub const DEFAULT_SOFT_CAP: usize = 1000;

pub struct OutboundQueue {
    inner: Mutex<VecDeque<OutboundMessage>>,
    available: Condvar,
    soft_cap: usize,
}

impl OutboundQueue {
    pub fn new() -> Self {
        Self::with_soft_cap(DEFAULT_SOFT_CAP)
    }

    pub fn with_soft_cap(soft_cap: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
            soft_cap,
        }
    }

    /// Enqueue one message without blocking.
    ///
    /// Returns false (and leaves the queue untouched) when the queue
    /// already holds more than the soft cap. On success the sender is
    /// notified.
    pub fn offer(&self, message: OutboundMessage) -> bool {
        let mut queue = self.inner.lock();
        if queue.len() > self.soft_cap {
            return false;
        }
        queue.push_back(message);
        self.available.notify_one();
        true
    }

    /// Pop the oldest message, if any.
    pub fn poll(&self) -> Option<OutboundMessage> {
        self.inner.lock().pop_front()
    }

    /// Pop the oldest message, waiting up to `wait` for one to arrive.
    ///
    /// The wait is bounded so a missed signal can never hang the caller.
    pub fn poll_timeout(&self, wait: Duration) -> Option<OutboundMessage> {
        let mut queue = self.inner.lock();
        if let Some(message) = queue.pop_front() {
            return Some(message);
        }
        self.available.wait_for(&mut queue, wait);
        queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Drop every pending message and wake all waiters.
    pub fn clear(&self) {
        self.inner.lock().clear();
        self.available.notify_all();
    }
}

impl Default for OutboundQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    fn event(name: &str) -> OutboundMessage {
        OutboundMessage::event(name, vec![])
    }

    #[test]
    fn messages_come_out_in_enqueue_order() {
        let queue = OutboundQueue::new();
        for name in ["a", "b", "c"] {
            assert!(queue.offer(event(name)));
        }

        let drained: Vec<_> = std::iter::from_fn(|| queue.poll()).collect();
        assert_eq!(
            drained,
            vec![event("a"), event("b"), event("c")],
            "FIFO order must match enqueue order"
        );
    }

    #[test]
    fn over_cap_inserts_are_rejected_without_growing_the_queue() {
        let queue = OutboundQueue::with_soft_cap(2);
        assert!(queue.offer(event("1")));
        assert!(queue.offer(event("2")));
        // len == cap is still accepted; rejection starts past the cap
        assert!(queue.offer(event("3")));

        let len_before = queue.len();
        assert!(!queue.offer(event("4")));
        assert_eq!(queue.len(), len_before);
    }

    #[test]
    fn poll_timeout_returns_none_after_bounded_wait() {
        let queue = OutboundQueue::new();
        let start = Instant::now();
        assert!(queue.poll_timeout(Duration::from_millis(30)).is_none());
        assert!(start.elapsed() >= Duration::from_millis(25));
    }

    #[test]
    fn enqueue_wakes_a_waiting_consumer() {
        let queue = Arc::new(OutboundQueue::new());
        let producer = Arc::clone(&queue);

        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            producer.offer(event("late"));
        });

        let start = Instant::now();
        let message = queue.poll_timeout(Duration::from_secs(2));
        handle.join().unwrap();

        assert_eq!(message, Some(event("late")));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn clear_empties_the_queue() {
        let queue = OutboundQueue::new();
        queue.offer(event("a"));
        queue.offer(event("b"));
        queue.clear();
        assert!(queue.is_empty());
        assert!(queue.poll().is_none());
    }
}
