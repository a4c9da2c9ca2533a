//! Error types for the scheduler and configuration layer.
//!
//! Only startup can fail: task-table capacity, thread creation and real-time
//! class assignment. Deadline misses, degenerate geometry and out-of-turn
//! commands are absorbed where they happen and never become errors.

use std::io;

use thiserror::Error;

/// Errors raised while creating or addressing periodic tasks.
#[derive(Error, Debug)]
pub enum SchedError {
    /// Task index beyond the fixed task table.
    #[error("task index {index} exceeds task table capacity {capacity}")]
    TableFull { index: usize, capacity: usize },

    /// A task already occupies this slot.
    #[error("task slot {0} is already in use")]
    SlotTaken(usize),

    /// Handle does not name a live task.
    #[error("no task registered at slot {0}")]
    UnknownTask(usize),

    /// Period or deadline of zero milliseconds.
    #[error("invalid timing for task {index}: period {period_ms} ms, deadline {deadline_ms} ms")]
    InvalidTiming {
        index: usize,
        period_ms: u64,
        deadline_ms: u64,
    },

    /// Priority outside the 0..=99 scale.
    #[error("priority {0} outside 0..=99")]
    InvalidPriority(u8),

    /// The OS refused to create the thread.
    #[error("failed to spawn task thread")]
    Spawn(#[from] io::Error),

    /// The OS refused the fixed-priority class (typically missing CAP_SYS_NICE).
    #[error("failed to apply real-time priority {priority}")]
    Priority {
        priority: u8,
        #[source]
        source: io::Error,
    },

    /// The task thread exited before reporting its start-up status.
    #[error("task {0} exited during start-up")]
    StartupLost(usize),
}

impl SchedError {
    /// Short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            SchedError::TableFull { .. } => "sched_table_full",
            SchedError::SlotTaken(_) => "sched_slot_taken",
            SchedError::UnknownTask(_) => "sched_unknown_task",
            SchedError::InvalidTiming { .. } => "sched_invalid_timing",
            SchedError::InvalidPriority(_) => "sched_invalid_priority",
            SchedError::Spawn(_) => "sched_spawn",
            SchedError::Priority { .. } => "sched_priority",
            SchedError::StartupLost(_) => "sched_startup_lost",
        }
    }
}

/// Errors raised while loading or validating a [`crate::GameConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file")]
    Io(#[from] io::Error),

    #[error("failed to parse config")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}
