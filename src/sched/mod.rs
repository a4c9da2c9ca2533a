//! Fixed-priority periodic task scheduler
//!
//! A fixed table of at most [`MAX_TASKS`] periodic threads. Each task has a
//! period, a relative deadline, a fixed priority and a binary activation gate
//! that starts closed. Tasks pace themselves on absolute activation times, so
//! an overrun is followed immediately by the next iteration with no catch-up
//! suppression. Deadline misses are counted and never acted upon.

pub mod task;

mod gate;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
use linux as platform;

#[cfg(not(target_os = "linux"))]
mod fallback;
#[cfg(not(target_os = "linux"))]
use fallback as platform;

pub use task::{TaskContext, TaskId, TaskParams};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::error::SchedError;
use crate::time::{Clock, TimeUnit};
use task::TaskShared;

/// Maximum number of schedulable tasks
pub const MAX_TASKS: usize = 10;

/// Highest priority on the fixed-priority scale
pub const MAX_PRIORITY: u8 = 99;

/// Scheduling class the task threads are placed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedPolicy {
    /// Real-time fixed-priority preemptive class; failure to enter it is fatal
    Fifo,
    /// Default OS class; priorities are recorded but not applied
    #[default]
    Other,
}

struct TaskSlot {
    shared: Arc<TaskShared>,
    handle: Option<JoinHandle<()>>,
}

/// Owner of the task table
pub struct Scheduler {
    policy: SchedPolicy,
    clock: Clock,
    running: Arc<AtomicBool>,
    slots: Vec<Option<TaskSlot>>,
}

impl Scheduler {
    pub fn new(policy: SchedPolicy) -> Self {
        Self {
            policy,
            clock: Clock::start(),
            running: Arc::new(AtomicBool::new(true)),
            slots: (0..MAX_TASKS).map(|_| None).collect(),
        }
    }

    pub fn policy(&self) -> SchedPolicy {
        self.policy
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Register task `index`, start its thread in the configured class and,
    /// if `params.activate`, open its gate.
    ///
    /// The body receives a [`TaskContext`] and owns its loop; see
    /// [`TaskContext::run`] for the standard shape.
    pub fn create<F>(
        &mut self,
        index: usize,
        params: TaskParams,
        body: F,
    ) -> Result<TaskId, SchedError>
    where
        F: FnOnce(TaskContext) + Send + 'static,
    {
        if index >= MAX_TASKS {
            return Err(SchedError::TableFull {
                index,
                capacity: MAX_TASKS,
            });
        }
        if self.slots.get(index).is_some_and(Option::is_some) {
            return Err(SchedError::SlotTaken(index));
        }
        if params.period_ms == 0 || params.deadline_ms == 0 {
            return Err(SchedError::InvalidTiming {
                index,
                period_ms: params.period_ms,
                deadline_ms: params.deadline_ms,
            });
        }
        if params.priority > MAX_PRIORITY {
            return Err(SchedError::InvalidPriority(params.priority));
        }

        let shared = Arc::new(TaskShared::new(index, &params));
        let ctx = TaskContext {
            shared: Arc::clone(&shared),
            running: Arc::clone(&self.running),
        };

        // The thread enters its class first and reports back before running the body
        let (status_tx, status_rx) = mpsc::sync_channel(1);
        let policy = self.policy;
        let priority = params.priority;
        let handle = thread::Builder::new()
            .name(format!("task-{index}"))
            .spawn(move || {
                let status = platform::apply_priority(policy, priority);
                let entered = status.is_ok();
                if status_tx.send(status).is_err() || !entered {
                    return;
                }
                body(ctx);
            })?;

        match status_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(source)) => {
                let _ = handle.join();
                return Err(SchedError::Priority { priority, source });
            }
            Err(_) => {
                let _ = handle.join();
                return Err(SchedError::StartupLost(index));
            }
        }

        if let Some(slot) = self.slots.get_mut(index) {
            *slot = Some(TaskSlot {
                shared: Arc::clone(&shared),
                handle: Some(handle),
            });
        }

        log::info!(
            "task {index} created: period {} ms, deadline {} ms, priority {priority} ({:?}) at +{} ms",
            params.period_ms,
            params.deadline_ms,
            policy,
            self.clock.systime(TimeUnit::Milli)
        );

        if params.activate {
            shared.gate.post();
        }
        Ok(TaskId(index))
    }

    fn slot(&self, id: TaskId) -> Result<&TaskSlot, SchedError> {
        self.slots
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(SchedError::UnknownTask(id.0))
    }

    /// Open a task's activation gate
    pub fn activate(&self, id: TaskId) -> Result<(), SchedError> {
        self.slot(id)?.shared.gate.post();
        log::debug!("task {} activated", id.0);
        Ok(())
    }

    /// Change the period used from the next period boundary on
    pub fn set_period(&self, id: TaskId, period_ms: u64) -> Result<(), SchedError> {
        let slot = self.slot(id)?;
        if period_ms == 0 {
            return Err(SchedError::InvalidTiming {
                index: id.0,
                period_ms,
                deadline_ms: slot.shared.deadline_ms(),
            });
        }
        slot.shared.set_period_ms(period_ms);
        Ok(())
    }

    /// Change the relative deadline used from the next activation on
    pub fn set_deadline(&self, id: TaskId, deadline_ms: u64) -> Result<(), SchedError> {
        let slot = self.slot(id)?;
        if deadline_ms == 0 {
            return Err(SchedError::InvalidTiming {
                index: id.0,
                period_ms: slot.shared.period_ms(),
                deadline_ms,
            });
        }
        slot.shared.set_deadline_ms(deadline_ms);
        Ok(())
    }

    pub fn period_ms(&self, id: TaskId) -> Result<u64, SchedError> {
        Ok(self.slot(id)?.shared.period_ms())
    }

    pub fn deadline_ms(&self, id: TaskId) -> Result<u64, SchedError> {
        Ok(self.slot(id)?.shared.deadline_ms())
    }

    pub fn priority(&self, id: TaskId) -> Result<u8, SchedError> {
        Ok(self.slot(id)?.shared.priority)
    }

    /// Deadline misses recorded so far
    pub fn deadline_miss_count(&self, id: TaskId) -> Result<u32, SchedError> {
        Ok(self.slot(id)?.shared.misses())
    }

    /// Next absolute activation time
    pub fn activation_time(&self, id: TaskId) -> Result<Instant, SchedError> {
        Ok(self.slot(id)?.shared.next_activation())
    }

    /// Current absolute deadline
    pub fn absolute_deadline(&self, id: TaskId) -> Result<Instant, SchedError> {
        Ok(self.slot(id)?.shared.absolute_deadline())
    }

    /// Global termination flag as seen by tasks
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Raise the termination flag and open every gate so blocked tasks can see it
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
        for slot in self.slots.iter().flatten() {
            slot.shared.gate.post();
        }
    }

    /// Block until task `id` leaves its loop
    pub fn join(&mut self, id: TaskId) -> Result<(), SchedError> {
        let handle = self
            .slots
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(SchedError::UnknownTask(id.0))?
            .handle
            .take();
        if let Some(handle) = handle
            && handle.join().is_err()
        {
            log::error!("task {} panicked", id.0);
        }
        Ok(())
    }

    /// Stop and join every task
    pub fn shutdown(&mut self) {
        self.stop();
        for index in 0..MAX_TASKS {
            if self.slots.get(index).is_some_and(Option::is_some) {
                let _ = self.join(TaskId(index));
            }
        }
        log::info!(
            "scheduler shut down at +{} ms",
            self.clock.systime(TimeUnit::Milli)
        );
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if self.slots.iter().flatten().any(|s| s.handle.is_some()) {
            self.shutdown();
        }
    }
}
