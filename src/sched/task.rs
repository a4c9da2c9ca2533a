//! Periodic task descriptor and the context handed to each task body.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::gate::Gate;
use super::platform;
use crate::time::{add_ms, is_past};

/// Timing triple and activation mode for one periodic task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskParams {
    /// Period in milliseconds
    pub period_ms: u64,
    /// Relative deadline in milliseconds
    pub deadline_ms: u64,
    /// Fixed priority on the 0..=99 scale (higher runs first)
    pub priority: u8,
    /// Open the activation gate immediately after creation
    #[serde(default = "default_activate")]
    pub activate: bool,
}

fn default_activate() -> bool {
    true
}

impl TaskParams {
    pub const fn new(period_ms: u64, deadline_ms: u64, priority: u8, activate: bool) -> Self {
        Self {
            period_ms,
            deadline_ms,
            priority,
            activate,
        }
    }

    /// Deadline equal to the period, activated on creation
    pub const fn periodic(period_ms: u64, priority: u8) -> Self {
        Self::new(period_ms, period_ms, priority, true)
    }

    /// Same priority and activation, deadline equal to the new period
    pub const fn with_period(self, period_ms: u64) -> Self {
        Self {
            period_ms,
            deadline_ms: period_ms,
            ..self
        }
    }

    /// Same timing, gate left closed until [`super::Scheduler::activate`]
    pub const fn deferred(self) -> Self {
        Self {
            activate: false,
            ..self
        }
    }
}

/// Small integer handle issued by [`super::Scheduler::create`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(pub(crate) usize);

impl TaskId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy)]
struct Timing {
    /// Next absolute activation
    at: Instant,
    /// Current absolute deadline
    dl: Instant,
}

/// State shared between the scheduler table and the task's own thread
pub(crate) struct TaskShared {
    pub(crate) index: usize,
    pub(crate) priority: u8,
    period_ms: AtomicU64,
    deadline_ms: AtomicU64,
    misses: AtomicU32,
    pub(crate) gate: Gate,
    timing: Mutex<Timing>,
}

impl TaskShared {
    pub(crate) fn new(index: usize, params: &TaskParams) -> Self {
        let now = Instant::now();
        Self {
            index,
            priority: params.priority,
            period_ms: AtomicU64::new(params.period_ms),
            deadline_ms: AtomicU64::new(params.deadline_ms),
            misses: AtomicU32::new(0),
            gate: Gate::new(),
            timing: Mutex::new(Timing { at: now, dl: now }),
        }
    }

    pub(crate) fn period_ms(&self) -> u64 {
        self.period_ms.load(Ordering::Relaxed)
    }

    pub(crate) fn set_period_ms(&self, ms: u64) {
        self.period_ms.store(ms, Ordering::Relaxed);
    }

    pub(crate) fn deadline_ms(&self) -> u64 {
        self.deadline_ms.load(Ordering::Relaxed)
    }

    pub(crate) fn set_deadline_ms(&self, ms: u64) {
        self.deadline_ms.store(ms, Ordering::Relaxed);
    }

    pub(crate) fn misses(&self) -> u32 {
        self.misses.load(Ordering::Relaxed)
    }

    pub(crate) fn next_activation(&self) -> Instant {
        self.timing.lock().at
    }

    pub(crate) fn absolute_deadline(&self) -> Instant {
        self.timing.lock().dl
    }

    /// Anchor activation and deadline at `start`.
    fn anchor(&self, start: Instant) {
        let mut timing = self.timing.lock();
        timing.at = add_ms(start, self.period_ms());
        timing.dl = add_ms(start, self.deadline_ms());
    }

    /// Count a miss iff `now` is strictly after the current absolute deadline.
    pub(crate) fn check_deadline(&self, now: Instant) -> bool {
        let dl = self.timing.lock().dl;
        if is_past(now, dl) {
            let total = self.misses.fetch_add(1, Ordering::Relaxed) + 1;
            log::trace!("task {} missed its deadline ({total} total)", self.index);
            true
        } else {
            false
        }
    }

    /// Move both activation and deadline forward by exactly one period.
    fn advance(&self) {
        let period = self.period_ms();
        let mut timing = self.timing.lock();
        timing.at = add_ms(timing.at, period);
        timing.dl = add_ms(timing.dl, period);
    }
}

/// Handle a task body uses to pace itself.
///
/// A body calls [`wait_for_activation`](Self::wait_for_activation) once, then
/// loops: work, [`deadline_miss`](Self::deadline_miss),
/// [`wait_for_period`](Self::wait_for_period). [`run`](Self::run) packages
/// exactly that loop around the scheduler's termination flag.
pub struct TaskContext {
    pub(crate) shared: Arc<TaskShared>,
    pub(crate) running: Arc<AtomicBool>,
}

impl TaskContext {
    pub fn id(&self) -> TaskId {
        TaskId(self.shared.index)
    }

    /// Block on the activation gate and anchor timing at the wake instant
    pub fn wait_for_activation(&self) {
        self.shared.gate.wait();
        self.shared.anchor(Instant::now());
    }

    /// Record a miss if the current time is past the absolute deadline
    pub fn deadline_miss(&self) -> bool {
        self.shared.check_deadline(Instant::now())
    }

    /// Sleep until the absolute next activation, then advance activation and deadline.
    ///
    /// If the activation instant has already passed the call returns at once;
    /// overruns are not skipped or coalesced.
    pub fn wait_for_period(&self) {
        platform::sleep_until(self.shared.next_activation());
        self.shared.advance();
    }

    /// Next absolute activation time
    pub fn next_activation(&self) -> Instant {
        self.shared.next_activation()
    }

    /// Current absolute deadline
    pub fn absolute_deadline(&self) -> Instant {
        self.shared.absolute_deadline()
    }

    /// Current period
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.shared.period_ms())
    }

    /// Deadline misses so far
    pub fn misses(&self) -> u32 {
        self.shared.misses()
    }

    /// False once the scheduler has been told to stop
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Standard periodic loop: activation, then work / miss check / period wait
    /// until the termination flag is seen at the top of an iteration.
    pub fn run<F>(self, mut work: F)
    where
        F: FnMut(&TaskContext),
    {
        self.wait_for_activation();
        while self.is_running() {
            work(&self);
            self.deadline_miss();
            self.wait_for_period();
        }
        log::debug!("task {} leaving its periodic loop", self.shared.index);
    }
}
