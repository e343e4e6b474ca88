//! Deferred task scheduling
//!
//! Fade steps, play completions and the idle timeout are all expressed as
//! tasks scheduled against a [`Scheduler`]. The [`TimerQueue`] implementation
//! keeps a virtual clock that the host advances on its own thread, so every
//! continuation runs on the same logical thread as `handle_event`.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

/// A unit of deferred work
pub type Task = Box<dyn FnOnce() + Send + 'static>;

const PENDING: u8 = 0;
const FIRED: u8 = 1;
const CANCELLED: u8 = 2;

/// Handle to a scheduled task
///
/// Cancelling is idempotent: cancelling a task that already ran or was
/// already cancelled does nothing.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    state: Arc<AtomicU8>,
}

impl TaskHandle {
    fn new() -> Self {
        Self {
            state: Arc::new(AtomicU8::new(PENDING)),
        }
    }

    /// Cancel the task, returns true if it was still pending
    pub fn cancel(&self) -> bool {
        self.state
            .compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Check if the task has neither run nor been cancelled
    pub fn is_pending(&self) -> bool {
        self.state.load(Ordering::Acquire) == PENDING
    }

    fn claim(&self) -> bool {
        self.state
            .compare_exchange(PENDING, FIRED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Something that can run tasks after a delay
pub trait Scheduler: Send + Sync {
    fn schedule(&self, delay: Duration, task: Task) -> TaskHandle;
}

struct Entry {
    handle: TaskHandle,
    task: Task,
}

struct QueueInner {
    now: Duration,
    next_seq: u64,
    entries: BTreeMap<(Duration, u64), Entry>,
}

/// Virtual-clock task queue
///
/// Time only moves when the owner calls [`TimerQueue::advance`] or
/// [`TimerQueue::advance_to`]. Tasks due at the same instant run in the order
/// they were scheduled.
pub struct TimerQueue {
    inner: Mutex<QueueInner>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                now: Duration::ZERO,
                next_seq: 0,
                entries: BTreeMap::new(),
            }),
        }
    }

    /// Current virtual time
    pub fn now(&self) -> Duration {
        self.inner.lock().now
    }

    /// Deadline of the earliest task still pending
    pub fn next_deadline(&self) -> Option<Duration> {
        let inner = self.inner.lock();
        inner
            .entries
            .iter()
            .find(|(_, entry)| entry.handle.is_pending())
            .map(|((deadline, _), _)| *deadline)
    }

    /// Number of tasks still pending
    pub fn pending(&self) -> usize {
        let inner = self.inner.lock();
        inner
            .entries
            .values()
            .filter(|entry| entry.handle.is_pending())
            .count()
    }

    /// Run every task due at the current time
    pub fn run_due(&self) -> usize {
        let now = self.now();
        self.advance_to(now)
    }

    /// Move the clock forward and run everything that becomes due
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now() + by;
        self.advance_to(target)
    }

    /// Move the clock to `target` (never backwards) and run due tasks
    ///
    /// Returns the number of tasks that ran.
    pub fn advance_to(&self, target: Duration) -> usize {
        let mut ran = 0;

        loop {
            let due = {
                let mut inner = self.inner.lock();
                let target = target.max(inner.now);

                let first = inner.entries.keys().next().copied();
                match first {
                    Some(key) if key.0 <= target => {
                        inner.now = key.0;
                        inner.entries.remove(&key)
                    }
                    _ => {
                        inner.now = target;
                        None
                    }
                }
            };

            // Lock released: tasks are free to schedule more work
            match due {
                Some(entry) => {
                    if entry.handle.claim() {
                        (entry.task)();
                        ran += 1;
                    }
                }
                None => break,
            }
        }

        ran
    }
}

impl Default for TimerQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for TimerQueue {
    fn schedule(&self, delay: Duration, task: Task) -> TaskHandle {
        let handle = TaskHandle::new();
        let mut inner = self.inner.lock();
        let deadline = inner.now + delay;
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.entries.insert(
            (deadline, seq),
            Entry {
                handle: handle.clone(),
                task,
            },
        );
        handle
    }
}
