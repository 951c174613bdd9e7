use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::ScheduleError;

/// A deferred unit of work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// The host's cooperative tick scheduler.
///
/// `run_after` never blocks: it queues `task` to run on the host's tick
/// thread once `delay` has elapsed, measured from the moment of the call.
pub trait TickScheduler: Send + Sync {
    fn run_after(&self, delay: Duration, task: Task) -> Result<(), ScheduleError>;
}

// ─── FrameScheduler ───────────────────────────────────────────────────────

struct Pending {
    due: Duration,
    seq: u64,
    task: Task,
}

#[derive(Default)]
struct FrameQueue {
    now: Duration,
    seq: u64,
    closed: bool,
    pending: Vec<Pending>,
}

/// A [`TickScheduler`] driven by the host's frame loop.
///
/// The host calls [`FrameScheduler::tick`] once per frame with the elapsed
/// frame time. Due tasks run on the calling thread, ordered by due time and
/// then by enqueue order. A task queued from inside a running task never
/// runs in the same tick, even with a zero delay.
#[derive(Default)]
pub struct FrameScheduler {
    queue: Mutex<FrameQueue>,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FrameQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Advance the clock by `delta` and run every task that is now due.
    /// Returns the number of tasks run.
    pub fn tick(&self, delta: Duration) -> usize {
        let mut due = {
            let mut q = self.lock();
            q.now += delta;
            let now = q.now;
            let (ready, waiting): (Vec<_>, Vec<_>) =
                std::mem::take(&mut q.pending).into_iter().partition(|p| p.due <= now);
            q.pending = waiting;
            ready
        };

        // Run outside the lock so tasks can schedule follow-ups.
        due.sort_by_key(|p| (p.due, p.seq));
        let count = due.len();
        for p in due {
            (p.task)();
        }
        count
    }

    /// Tick in `frame` steps until the queue drains or `limit` of simulated
    /// time has passed. Returns `true` if the queue drained.
    ///
    /// A zero `frame` jumps straight to the next due task on each step.
    pub fn run_until_idle(&self, frame: Duration, limit: Duration) -> bool {
        let mut waited = Duration::ZERO;
        while let Some(next) = self.until_next_due() {
            let step = if frame.is_zero() { next } else { frame };
            if waited >= limit || (frame.is_zero() && waited + step > limit) {
                return false;
            }
            self.tick(step);
            waited += step;
        }
        true
    }

    /// Time until the earliest queued task is due, or `None` when idle.
    fn until_next_due(&self) -> Option<Duration> {
        let q = self.lock();
        q.pending
            .iter()
            .map(|p| p.due.saturating_sub(q.now))
            .min()
    }

    pub fn pending(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn is_idle(&self) -> bool {
        self.pending() == 0
    }

    /// Simulated time elapsed since creation.
    pub fn elapsed(&self) -> Duration {
        self.lock().now
    }

    /// Drop everything still queued and refuse new work.
    pub fn shutdown(&self) {
        let dropped = {
            let mut q = self.lock();
            q.closed = true;
            std::mem::take(&mut q.pending)
        };
        if !dropped.is_empty() {
            tracing::debug!(dropped = dropped.len(), "tick scheduler shut down with pending tasks");
        }
    }
}

impl TickScheduler for FrameScheduler {
    fn run_after(&self, delay: Duration, task: Task) -> Result<(), ScheduleError> {
        let mut q = self.lock();
        if q.closed {
            return Err(ScheduleError::Closed);
        }
        let due = q.now + delay;
        let seq = q.seq;
        q.seq += 1;
        q.pending.push(Pending { due, seq, task });
        Ok(())
    }
}
