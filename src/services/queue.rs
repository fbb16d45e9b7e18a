//! Work queue between the directory watcher and the analysis worker
//!
//! FIFO, blocking-with-timeout on the consumer side. Unbounded by default
//! since file arrival is slow; a bounded queue rejects the newest path when
//! full and the producer drops it. A warning is logged whenever the backlog
//! crosses a multiple of the high-water mark.

use crate::models::QueuedFile;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use std::sync::{RwLock, RwLockReadGuard};
use std::time::Duration;

const HIGH_WATER_MARK: usize = 256;

/// Result of a timed dequeue
#[derive(Debug, PartialEq, Eq)]
pub enum Dequeued {
    Item(QueuedFile),
    TimedOut,
    /// Closed and fully drained
    Closed,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum PushError {
    #[error("queue is full ({0} pending)")]
    Full(usize),
    #[error("queue is closed")]
    Closed,
}

#[derive(Debug)]
pub struct EventQueue {
    // The only sender; taking it disconnects the channel
    sender: RwLock<Option<Sender<QueuedFile>>>,
    receiver: Receiver<QueuedFile>,
}

impl EventQueue {
    pub fn unbounded() -> Self {
        Self::with_capacity(None)
    }

    pub fn bounded(capacity: usize) -> Self {
        Self::with_capacity(Some(capacity))
    }

    pub fn with_capacity(capacity: Option<usize>) -> Self {
        let (sender, receiver) = match capacity {
            // Zero would make a rendezvous channel
            Some(cap) => crossbeam_channel::bounded(cap.max(1)),
            None => crossbeam_channel::unbounded(),
        };
        Self {
            sender: RwLock::new(Some(sender)),
            receiver,
        }
    }

    fn sender(&self) -> RwLockReadGuard<'_, Option<Sender<QueuedFile>>> {
        self.sender.read().unwrap_or_else(|poisoned| {
            tracing::warn!("[Queue] Lock was poisoned, recovering...");
            poisoned.into_inner()
        })
    }

    pub fn push(&self, file: QueuedFile) -> Result<(), PushError> {
        let guard = self.sender();
        let Some(sender) = guard.as_ref() else {
            return Err(PushError::Closed);
        };

        match sender.try_send(file) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => return Err(PushError::Full(self.receiver.len())),
            Err(TrySendError::Disconnected(_)) => return Err(PushError::Closed),
        }

        let pending = self.receiver.len();
        if pending > 0 && pending % HIGH_WATER_MARK == 0 {
            tracing::warn!("[Queue] Backlog reached {} pending files", pending);
        }
        Ok(())
    }

    /// Wait up to `timeout` for the next path
    pub fn pop_timeout(&self, timeout: Duration) -> Dequeued {
        match self.receiver.recv_timeout(timeout) {
            Ok(item) => Dequeued::Item(item),
            Err(RecvTimeoutError::Timeout) => Dequeued::TimedOut,
            Err(RecvTimeoutError::Disconnected) => Dequeued::Closed,
        }
    }

    /// Refuse new pushes and wake the consumer; queued items still drain
    pub fn close(&self) {
        let mut sender = self
            .sender
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        sender.take();
    }

    pub fn is_closed(&self) -> bool {
        self.sender().is_none()
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FileKind;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::thread;

    fn file(name: &str) -> QueuedFile {
        QueuedFile::new(PathBuf::from(name), FileKind::Text)
    }

    #[test]
    fn test_fifo_order() {
        let q = EventQueue::unbounded();
        for name in ["p1.txt", "p2.txt", "p3.txt"] {
            q.push(file(name)).unwrap();
        }
        for name in ["p1.txt", "p2.txt", "p3.txt"] {
            assert_eq!(q.pop_timeout(Duration::from_millis(10)), Dequeued::Item(file(name)));
        }
        assert_eq!(q.pop_timeout(Duration::from_millis(10)), Dequeued::TimedOut);
    }

    #[test]
    fn test_bounded_rejects_newest() {
        let q = EventQueue::bounded(2);
        q.push(file("a.txt")).unwrap();
        q.push(file("b.txt")).unwrap();
        assert_eq!(q.push(file("c.txt")), Err(PushError::Full(2)));
        assert_eq!(q.pop_timeout(Duration::ZERO), Dequeued::Item(file("a.txt")));
    }

    #[test]
    fn test_close_drains_then_reports_closed() {
        let q = EventQueue::unbounded();
        q.push(file("a.txt")).unwrap();
        q.close();
        assert_eq!(q.push(file("b.txt")), Err(PushError::Closed));
        assert_eq!(q.pop_timeout(Duration::from_secs(1)), Dequeued::Item(file("a.txt")));
        assert_eq!(q.pop_timeout(Duration::from_secs(1)), Dequeued::Closed);
    }

    #[test]
    fn test_blocked_consumer_wakes_on_push() {
        let q = Arc::new(EventQueue::unbounded());
        let consumer = {
            let q = Arc::clone(&q);
            thread::spawn(move || q.pop_timeout(Duration::from_secs(5)))
        };
        thread::sleep(Duration::from_millis(50));
        q.push(file("late.txt")).unwrap();
        assert_eq!(consumer.join().unwrap(), Dequeued::Item(file("late.txt")));
    }

    #[test]
    fn test_blocked_consumer_wakes_on_close() {
        let q = Arc::new(EventQueue::unbounded());
        let consumer = {
            let q = Arc::clone(&q);
            thread::spawn(move || q.pop_timeout(Duration::from_secs(5)))
        };
        thread::sleep(Duration::from_millis(50));
        q.close();
        assert_eq!(consumer.join().unwrap(), Dequeued::Closed);
    }

    #[test]
    fn test_producers_on_many_threads_lose_nothing() {
        let q = Arc::new(EventQueue::unbounded());
        let producers: Vec<_> = (0..4)
            .map(|t| {
                let q = Arc::clone(&q);
                thread::spawn(move || {
                    for i in 0..100 {
                        q.push(file(&format!("{t}-{i}.txt"))).unwrap();
                    }
                })
            })
            .collect();
        for p in producers {
            p.join().unwrap();
        }
        assert_eq!(q.len(), 400);
    }

    #[test]
    fn test_zero_capacity_still_buffers_one() {
        let q = EventQueue::with_capacity(Some(0));
        q.push(file("only.txt")).unwrap();
        assert_eq!(q.push(file("next.txt")), Err(PushError::Full(1)));
        assert!(!q.is_closed());
        q.close();
        assert!(q.is_closed());
        assert_eq!(q.pop_timeout(Duration::ZERO), Dequeued::Item(file("only.txt")));
        assert_eq!(q.pop_timeout(Duration::ZERO), Dequeued::Closed);
    }
}
