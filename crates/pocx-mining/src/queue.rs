//! Bounded submission queue with condition-variable wakeups.

use crate::submission::NonceSubmission;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::warn;

/// Queue capacity; submissions beyond this are refused (DoS bound).
pub const MAX_QUEUE_SIZE: usize = 1000;

/// Why a timed wait returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// A submission is ready to pop.
    Submission,
    /// The queue was closed (shutdown).
    Closed,
    /// The deadline passed with nothing to do.
    TimedOut,
}

struct QueueInner {
    queue: VecDeque<NonceSubmission>,
    closed: bool,
}

/// Bounded FIFO feeding the forging worker. The mutex plus condvar pair is
/// the only synchronisation between submitters and the worker.
pub struct SubmissionQueue {
    inner: Mutex<QueueInner>,
    cv: Condvar,
}

impl SubmissionQueue {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                queue: VecDeque::new(),
                closed: false,
            }),
            cv: Condvar::new(),
        }
    }

    /// Enqueue a submission. Returns `false` when the queue is full or
    /// closed; the caller surfaces backpressure to the miner.
    pub fn submit(&self, submission: NonceSubmission) -> bool {
        {
            let mut inner = self.inner.lock();
            if inner.closed {
                return false;
            }
            if inner.queue.len() >= MAX_QUEUE_SIZE {
                warn!(capacity = MAX_QUEUE_SIZE, "submission queue full, rejecting");
                return false;
            }
            inner.queue.push_back(submission);
        }
        self.cv.notify_one();
        true
    }

    /// Pop the oldest submission, if any.
    pub fn pop(&self) -> Option<NonceSubmission> {
        self.inner.lock().queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().queue.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Close the queue and wake every waiter. Submissions after this are
    /// refused.
    pub fn close(&self) {
        self.inner.lock().closed = true;
        self.cv.notify_all();
    }

    /// Wait until a submission arrives, the queue closes, or `timeout`
    /// elapses.
    pub fn wait_idle(&self, timeout: Duration) -> WaitOutcome {
        self.wait_deadline(Instant::now() + timeout)
    }

    /// Wait until a submission arrives, the queue closes, or `deadline`
    /// passes.
    pub fn wait_deadline(&self, deadline: Instant) -> WaitOutcome {
        let mut inner = self.inner.lock();
        loop {
            if inner.closed {
                return WaitOutcome::Closed;
            }
            if !inner.queue.is_empty() {
                return WaitOutcome::Submission;
            }
            if self.cv.wait_until(&mut inner, deadline).timed_out() {
                // Re-check: a notify may have raced the timeout.
                if inner.closed {
                    return WaitOutcome::Closed;
                }
                if !inner.queue.is_empty() {
                    return WaitOutcome::Submission;
                }
                return WaitOutcome::TimedOut;
            }
        }
    }
}

impl Default for SubmissionQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pocx_consensus::{AccountId, PlotSeed};
    use std::sync::Arc;
    use std::thread;

    fn submission(nonce: u64) -> NonceSubmission {
        NonceSubmission::new(
            AccountId([1; 20]),
            PlotSeed([2; 32]),
            nonce,
            nonce,
            1,
            1,
            [0; 32],
        )
    }

    #[test]
    fn fifo_order() {
        let queue = SubmissionQueue::new();
        assert!(queue.submit(submission(1)));
        assert!(queue.submit(submission(2)));
        assert_eq!(queue.pop().unwrap().nonce, 1);
        assert_eq!(queue.pop().unwrap().nonce, 2);
        assert!(queue.pop().is_none());
    }

    #[test]
    fn capacity_is_enforced() {
        let queue = SubmissionQueue::new();
        for i in 0..MAX_QUEUE_SIZE {
            assert!(queue.submit(submission(i as u64)), "refused at {}", i);
        }
        assert_eq!(queue.len(), MAX_QUEUE_SIZE);
        assert!(!queue.submit(submission(9999)), "overflow accepted");

        // Draining one slot re-opens the queue.
        queue.pop();
        assert!(queue.submit(submission(9999)));
    }

    #[test]
    fn submit_after_close_returns_false() {
        let queue = SubmissionQueue::new();
        queue.close();
        assert!(!queue.submit(submission(1)));
        assert!(queue.is_closed());
    }

    #[test]
    fn wait_times_out_when_idle() {
        let queue = SubmissionQueue::new();
        let outcome = queue.wait_idle(Duration::from_millis(20));
        assert_eq!(outcome, WaitOutcome::TimedOut);
    }

    #[test]
    fn wait_wakes_on_submission() {
        let queue = Arc::new(SubmissionQueue::new());
        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(30));
                queue.submit(submission(5));
            })
        };

        let outcome = queue.wait_idle(Duration::from_secs(5));
        assert_eq!(outcome, WaitOutcome::Submission);
        assert_eq!(queue.pop().unwrap().nonce, 5);
        producer.join().unwrap();
    }

    #[test]
    fn wait_wakes_on_close() {
        let queue = Arc::new(SubmissionQueue::new());
        let closer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(30));
                queue.close();
            })
        };

        let outcome = queue.wait_idle(Duration::from_secs(5));
        assert_eq!(outcome, WaitOutcome::Closed);
        closer.join().unwrap();
    }
}
