//! Simulation module
//!
//! Ball table, physics tick, rule state machine and the controllers that turn
//! commands into table changes. Nothing here spawns threads; the periodic
//! tasks in [`crate::game`] drive these pieces against a shared [`World`].

pub mod collision;
pub mod control;
pub mod physics;
pub mod rails;
pub mod rules;
pub mod state;
pub mod world;

pub use control::{ParamController, ShotController};
pub use rules::RuleEngine;
pub use state::{
    Awaiting, Ball, BallGroup, GamePhase, GroupAssignment, Player, Pocket, Table, Trail,
};
pub use world::{CounterSnapshot, World};
