//! Deferred work and time sources
//!
//! The controller never sleeps or spawns. Delayed actions (clearing an
//! error notice, skipping past a failed track) go into a [`DeferredTasks`]
//! queue; the host arms a timer for [`DeferredTasks::next_deadline`] and
//! calls back into the controller when it fires.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Monotonic time source
///
/// `now` is measured from an arbitrary, fixed epoch.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Wall clock backed by [`Instant`]
#[derive(Debug, Clone)]
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }
}

/// Hand-driven clock for tests and simulations
///
/// Clones share the same time, so a test keeps one copy and gives the
/// other to the controller.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    /// Jump to an absolute time (never moves backwards)
    pub fn set(&self, to: Duration) {
        if to > self.now.get() {
            self.now.set(to);
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// Identifier of a scheduled task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

#[derive(Debug)]
struct Entry<T> {
    id: TaskId,
    due: Duration,
    task: T,
}

/// Queue of cancellable tasks keyed by deadline
#[derive(Debug)]
pub struct DeferredTasks<T> {
    entries: Vec<Entry<T>>,
    next_id: u64,
}

impl<T> Default for DeferredTasks<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DeferredTasks<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }

    /// Schedule `task` to become due at `due`
    pub fn schedule(&mut self, due: Duration, task: T) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry { id, due, task });
        id
    }

    /// Cancel a task. Returns false if it already ran or was cancelled.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        match self.entries.iter().position(|e| e.id == id) {
            Some(pos) => {
                self.entries.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Remove and return the earliest task due at or before `now`
    ///
    /// Tasks with equal deadlines come out in scheduling order. Taking one
    /// task at a time lets a task cancel later ones before they run.
    pub fn pop_due(&mut self, now: Duration) -> Option<(TaskId, T)> {
        let pos = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.due <= now)
            .min_by_key(|(_, e)| (e.due, e.id.0))
            .map(|(pos, _)| pos)?;

        let entry = self.entries.remove(pos);
        Some((entry.id, entry.task))
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Option<Duration> {
        self.entries.iter().map(|e| e.due).min()
    }

    pub fn is_scheduled(&self, id: TaskId) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
