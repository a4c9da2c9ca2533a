//! Discrete commands from an input layer
//!
//! The core never polls devices. An input layer submits [`Command`]s to the
//! [`CommandBus`], which routes each to the queue of the task that consumes
//! it; that task drains its queue once per period.

use std::collections::VecDeque;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Tunable physics parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Param {
    Friction,
    Restitution,
    TimeScale,
}

/// A command accepted by the core.
///
/// Commands that do not apply in the current state are dropped silently.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Strike the cue ball with the current power and aim
    Shoot,
    /// Aim along a direction
    Aim { dx: f32, dy: f32 },
    /// Nudge the aim by whole aim steps
    Rotate(i32),
    /// Change shot power by whole steps
    AdjustPower(i32),
    /// Change a tunable by whole steps
    AdjustParam(Param, i32),
    ToggleTrail,
    /// Place the cue ball after a foul
    Respot { x: f32, y: f32 },
    /// Move the declared pocket for the eight by this many positions
    CyclePocket(i32),
    /// Finish the pocket declaration
    ConfirmPocket,
    /// Back to the break formation
    Reset,
    /// Debug: take a group ball off the table as if pocketed
    ForceEliminate(u8),
}

/// Task that consumes a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consumer {
    Shot,
    Params,
    Rules,
}

impl Command {
    pub fn consumer(&self) -> Consumer {
        match self {
            Command::Shoot | Command::Aim { .. } | Command::Rotate(_) | Command::AdjustPower(_) => {
                Consumer::Shot
            }
            Command::AdjustParam(..) | Command::ToggleTrail => Consumer::Params,
            Command::Respot { .. }
            | Command::CyclePocket(_)
            | Command::ConfirmPocket
            | Command::Reset
            | Command::ForceEliminate(_) => Consumer::Rules,
        }
    }
}

/// FIFO of pending commands for one consumer
#[derive(Debug, Default)]
pub struct CommandQueue {
    pending: Mutex<VecDeque<Command>>,
}

impl CommandQueue {
    pub fn push(&self, command: Command) {
        self.pending.lock().push_back(command);
    }

    /// Take everything queued so far, oldest first
    pub fn drain(&self) -> Vec<Command> {
        self.pending.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Per-consumer command queues
#[derive(Debug, Default)]
pub struct CommandBus {
    shot: CommandQueue,
    params: CommandQueue,
    rules: CommandQueue,
}

impl CommandBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit(&self, command: Command) {
        self.queue(command.consumer()).push(command);
    }

    pub fn queue(&self, consumer: Consumer) -> &CommandQueue {
        match consumer {
            Consumer::Shot => &self.shot,
            Consumer::Params => &self.params,
            Consumer::Rules => &self.rules,
        }
    }
}
