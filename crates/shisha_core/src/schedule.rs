//! # Delayed Tasks
//!
//! Cancellable timed waits driven by simulation time, not wall-clock time.
//! The owner advances the clock once per tick and receives every task that
//! came due, earliest first.

/// Handle returned by [`DelayedTasks::schedule`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(u64);

#[derive(Debug)]
struct Pending<T> {
    handle: TaskHandle,
    due: f64,
    task: T,
}

/// Simulation-time task queue.
#[derive(Debug)]
pub struct DelayedTasks<T> {
    now: f64,
    next_handle: u64,
    pending: Vec<Pending<T>>,
}

impl<T> DelayedTasks<T> {
    /// Slack absorbing float drift when many small steps add up to a deadline.
    const DUE_SLACK: f64 = 1e-6;

    /// Empty queue at time zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            now: 0.0,
            next_handle: 0,
            pending: Vec::new(),
        }
    }

    /// Current simulation time in seconds.
    #[inline]
    #[must_use]
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Schedules `task` to come due after `delay` seconds. Negative delays
    /// are treated as zero.
    pub fn schedule(&mut self, delay: f32, task: T) -> TaskHandle {
        let handle = TaskHandle(self.next_handle);
        self.next_handle += 1;
        self.pending.push(Pending {
            handle,
            due: self.now + f64::from(delay.max(0.0)),
            task,
        });
        handle
    }

    /// Cancels one task, returning it if it was still pending.
    pub fn cancel(&mut self, handle: TaskHandle) -> Option<T> {
        let index = self.pending.iter().position(|p| p.handle == handle)?;
        Some(self.pending.swap_remove(index).task)
    }

    /// Cancels every pending task matching `predicate`. Returns how many.
    pub fn cancel_where(&mut self, mut predicate: impl FnMut(&T) -> bool) -> usize {
        let before = self.pending.len();
        self.pending.retain(|p| !predicate(&p.task));
        before - self.pending.len()
    }

    /// Advances the clock by `dt` seconds and returns the tasks that came
    /// due, ordered by due time then scheduling order.
    pub fn advance(&mut self, dt: f32) -> Vec<T> {
        self.now += f64::from(dt.max(0.0));
        let now = self.now + Self::DUE_SLACK;

        let (mut ready, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|p| p.due <= now);
        self.pending = waiting;

        ready.sort_by(|a, b| a.due.total_cmp(&b.due).then(a.handle.cmp(&b.handle)));
        ready.into_iter().map(|p| p.task).collect()
    }

    /// Drops everything. Used on teardown.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Pending task count.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// True when nothing is pending.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<T> Default for DelayedTasks<T> {
    fn default() -> Self {
        Self::new()
    }
}
