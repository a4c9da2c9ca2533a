//! Pool RT - real-time core of a two-player eight-ball game
//!
//! Core modules:
//! - `time`: Monotonic clock and absolute-time helpers
//! - `sched`: Fixed-priority periodic task scheduler with deadline-miss accounting
//! - `sim`: Ball table, physics tick, and the turn/phase rule state machine
//! - `input`: Discrete commands accepted from an input layer
//! - `snapshot`: Renderer-facing copy of the table
//! - `game`: Wires the shared world to the periodic tasks
//! - `config`: Data-driven task timing and physics tuning

pub mod config;
pub mod error;
pub mod game;
pub mod input;
pub mod sched;
pub mod sim;
pub mod snapshot;
pub mod time;

pub use config::GameConfig;
pub use error::{ConfigError, SchedError};
pub use game::Game;
pub use input::Command;

use glam::Vec2;

/// Table geometry and physical constants (metres, seconds)
pub mod consts {
    /// Balls on the table: cue, seven solids, eight, seven stripes
    pub const N_BALLS: usize = 16;
    /// Pockets: four corners, two side-middles
    pub const N_POCKETS: usize = 6;
    /// Balls per group that must be cleared before the eight is playable
    pub const GROUP_SIZE: u32 = 7;

    /// Ball diameter
    pub const BALL_DIAMETER: f32 = 0.055;
    /// Ball radius
    pub const BALL_RADIUS: f32 = BALL_DIAMETER / 2.0;

    /// Playable field width (x)
    pub const TABLE_LX: f32 = 1.77;
    /// Playable field height (y)
    pub const TABLE_LY: f32 = 0.85;
    /// Pocket centres sit this far outside the field corners/edges
    pub const POCKET_OFFSET: f32 = 0.035;
    /// Rail gap at each pocket, also the capture radius
    pub const POCKET_GAP: f32 = 0.065;
    /// Distance below which a ball centre is captured by a pocket
    pub const CAPTURE_RADIUS: f32 = POCKET_GAP;

    /// Cue ball spawn point
    pub const CUE_SPOT: (f32, f32) = (0.425, 0.425);
    /// Rack apex (ball 1)
    pub const RACK_APEX: (f32, f32) = (1.345, 0.425);
    /// Spacing factor between racked balls
    pub const RACK_SPACING: f32 = 1.1;
    /// Origin of the off-table rest column for pocketed balls
    pub const REST_ORIGIN: (f32, f32) = (1.94, 0.0);

    /// Positions kept in each ball's trail
    pub const TRAIL_LENGTH: usize = 100;

    /// Below this centre distance the collision normal is undefined
    pub const NORMAL_EPSILON: f32 = 1e-6;
}

/// Unit vector for an angle in radians
#[inline]
pub fn unit(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

/// True if `p` lies strictly inside the playable rectangle
#[inline]
pub fn in_table(p: Vec2) -> bool {
    p.x > 0.0 && p.x < consts::TABLE_LX && p.y > 0.0 && p.y < consts::TABLE_LY
}
