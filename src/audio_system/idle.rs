/// Idle monitor
///
/// Two states: Active while any player exists, Idle once the last one is
/// released. Entering Idle arms a single-shot timeout; entering Active cancels
/// it. At most one timer is outstanding.
use std::sync::Arc;
use std::time::Duration;

use crate::scheduler::{Scheduler, Task, TaskHandle};

/// Default quiet period before the idle timeout fires
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 60_000;

pub struct IdleMonitor {
    scheduler: Arc<dyn Scheduler>,
    timeout: Duration,
    idle: bool,
    pending: Option<TaskHandle>,
}

impl IdleMonitor {
    /// Create a monitor in the Active state with no timer
    pub fn new(scheduler: Arc<dyn Scheduler>, timeout: Duration) -> Self {
        Self {
            scheduler,
            timeout,
            idle: false,
            pending: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.idle
    }

    /// Check if an idle timeout is waiting to fire
    pub fn is_armed(&self) -> bool {
        self.pending.as_ref().map(TaskHandle::is_pending).unwrap_or(false)
    }

    /// Enter Idle and (re-)arm the timeout with `on_timeout`
    pub fn enter_idle(&mut self, on_timeout: Task) {
        self.cancel();
        self.idle = true;
        self.pending = Some(self.scheduler.schedule(self.timeout, on_timeout));
        tracing::debug!("Idle timer armed for {}ms", self.timeout.as_millis());
    }

    /// Enter Active, cancelling any pending timeout
    pub fn enter_active(&mut self) {
        self.idle = false;
        if self.cancel() {
            tracing::debug!("Idle timer cancelled");
        }
    }

    fn cancel(&mut self) -> bool {
        self.pending
            .take()
            .map(|handle| handle.cancel())
            .unwrap_or(false)
    }
}
