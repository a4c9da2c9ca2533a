//! Renderer-facing copy of the table
//!
//! A consumer never touches [`World`] directly: once per display period the
//! display task copies the ball table under the lock, adds the game flags,
//! and hands the copy to a [`SnapshotSink`].

use bytemuck::{Pod, Zeroable};

use crate::consts::N_BALLS;
use crate::sim::{Awaiting, BallGroup, CounterSnapshot, GamePhase, GroupAssignment, Player, World};

/// One ball, laid out for direct upload
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct BallSnapshot {
    pub pos: [f32; 2],
    pub vel: [f32; 2],
    /// 1 if on the table
    pub active: u32,
    /// 0 solid, 1 striped, 2 cue/eight
    pub group: u32,
}

impl BallSnapshot {
    pub fn is_active(&self) -> bool {
        self.active != 0
    }
}

/// Everything a display needs for one frame
#[derive(Debug, Clone)]
pub struct TableSnapshot {
    pub balls: [BallSnapshot; N_BALLS],
    /// Per-ball trail, newest first; empty while trails are off
    pub trails: Vec<Vec<[f32; 2]>>,
    pub phase: GamePhase,
    pub turn: Player,
    pub assignment: GroupAssignment,
    pub eligible: [bool; 2],
    pub declared_pocket: usize,
    pub awaiting: Awaiting,
    pub winner: Option<Player>,
    pub quiescent: bool,
    pub shot_speed: f32,
    pub aim: f32,
    pub counters: CounterSnapshot,
}

impl TableSnapshot {
    /// Copy the table under the lock, then the flags
    pub fn capture(world: &World) -> Self {
        let trail_on = world.flags.trail_enabled();
        let (balls, trails) = {
            let table = world.lock();
            let balls = std::array::from_fn(|i| {
                let b = &table.balls[i];
                BallSnapshot {
                    pos: b.pos.to_array(),
                    vel: b.vel.to_array(),
                    active: u32::from(b.active),
                    group: group_code(b.group),
                }
            });
            let trails = if trail_on {
                table
                    .balls
                    .iter()
                    .map(|b| b.trail.iter().map(|p| p.to_array()).collect())
                    .collect()
            } else {
                Vec::new()
            };
            (balls, trails)
        };

        let flags = &world.flags;
        Self {
            balls,
            trails,
            phase: flags.phase(),
            turn: flags.turn(),
            assignment: flags.assignment(),
            eligible: [flags.eligible(Player::A), flags.eligible(Player::B)],
            declared_pocket: flags.declared_pocket(),
            awaiting: flags.awaiting(),
            winner: flags.winner(),
            quiescent: flags.quiescent(),
            shot_speed: world.params.shot_speed.load(),
            aim: world.params.aim.load(),
            counters: world.counters.snapshot(),
        }
    }

    /// Ball records as raw bytes
    pub fn ball_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.balls)
    }

    pub fn active_count(&self) -> usize {
        self.balls.iter().filter(|b| b.is_active()).count()
    }
}

fn group_code(group: BallGroup) -> u32 {
    match group {
        BallGroup::Solid => 0,
        BallGroup::Striped => 1,
        BallGroup::Neutral => 2,
    }
}

/// Receives one snapshot per display period
pub trait SnapshotSink: Send {
    fn present(&mut self, snapshot: &TableSnapshot);
}

/// Sink that only logs game-state changes
#[derive(Debug, Default)]
pub struct LogSink {
    last: Option<(GamePhase, Player, Option<Player>)>,
}

impl SnapshotSink for LogSink {
    fn present(&mut self, snapshot: &TableSnapshot) {
        let state = (snapshot.phase, snapshot.turn, snapshot.winner);
        if self.last != Some(state) {
            log::info!(
                "{:?}: {:?} to play, {} balls on table, winner {:?}",
                snapshot.phase,
                snapshot.turn,
                snapshot.active_count(),
                snapshot.winner
            );
            self.last = Some(state);
        }
    }
}
