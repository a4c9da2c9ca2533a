//! Shared simulation aggregate
//!
//! The ball table sits behind one lock that the physics task holds for a
//! whole tick. Counters, game flags and tunables are plain atomics accessed
//! with `Relaxed` ordering: the rule task reads them without the lock and
//! relies on its coarse period for consistency, so a read may observe a
//! physics tick half-way through its counter updates.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering};

use parking_lot::{Mutex, MutexGuard};

use super::state::{Awaiting, BallGroup, GamePhase, GroupAssignment, Player, Table};
use crate::config::PhysicsConfig;

/// Counter values at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterSnapshot {
    /// First cue-ball contacts with a solid
    pub cue_solid: u32,
    /// First cue-ball contacts with a stripe
    pub cue_striped: u32,
    /// First cue-ball contacts with the eight
    pub cue_eight: u32,
    /// Rail bounces during the break
    pub break_bounces: u32,
    pub solids_pocketed: u32,
    pub stripes_pocketed: u32,
    pub fouls: u32,
}

impl CounterSnapshot {
    /// Contacts with `group` (Neutral means the eight ball)
    pub fn touches(&self, group: BallGroup) -> u32 {
        match group {
            BallGroup::Solid => self.cue_solid,
            BallGroup::Striped => self.cue_striped,
            BallGroup::Neutral => self.cue_eight,
        }
    }

    pub fn pocketed(&self, group: BallGroup) -> u32 {
        match group {
            BallGroup::Solid => self.solids_pocketed,
            BallGroup::Striped => self.stripes_pocketed,
            BallGroup::Neutral => 0,
        }
    }

    pub fn total_touches(&self) -> u32 {
        self.cue_solid + self.cue_striped + self.cue_eight
    }

    pub fn total_pocketed(&self) -> u32 {
        self.solids_pocketed + self.stripes_pocketed
    }
}

/// Monotonic game counters
#[derive(Debug, Default)]
pub struct Counters {
    cue_solid: AtomicU32,
    cue_striped: AtomicU32,
    cue_eight: AtomicU32,
    break_bounces: AtomicU32,
    solids_pocketed: AtomicU32,
    stripes_pocketed: AtomicU32,
    fouls: AtomicU32,
}

impl Counters {
    #[inline]
    pub fn record_touch(&self, group: BallGroup) {
        let counter = match group {
            BallGroup::Solid => &self.cue_solid,
            BallGroup::Striped => &self.cue_striped,
            BallGroup::Neutral => &self.cue_eight,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_break_bounce(&self) {
        self.break_bounces.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_pocketed(&self, group: BallGroup) {
        match group {
            BallGroup::Solid => self.solids_pocketed.fetch_add(1, Ordering::Relaxed),
            BallGroup::Striped => self.stripes_pocketed.fetch_add(1, Ordering::Relaxed),
            BallGroup::Neutral => return,
        };
    }

    #[inline]
    pub fn record_foul(&self) {
        self.fouls.fetch_add(1, Ordering::Relaxed);
    }

    /// Best-effort copy; fields are read independently
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            cue_solid: self.cue_solid.load(Ordering::Relaxed),
            cue_striped: self.cue_striped.load(Ordering::Relaxed),
            cue_eight: self.cue_eight.load(Ordering::Relaxed),
            break_bounces: self.break_bounces.load(Ordering::Relaxed),
            solids_pocketed: self.solids_pocketed.load(Ordering::Relaxed),
            stripes_pocketed: self.stripes_pocketed.load(Ordering::Relaxed),
            fouls: self.fouls.load(Ordering::Relaxed),
        }
    }

    /// Overwrite every counter; only game reset and test setup go backwards
    pub fn restore(&self, values: CounterSnapshot) {
        self.cue_solid.store(values.cue_solid, Ordering::Relaxed);
        self.cue_striped.store(values.cue_striped, Ordering::Relaxed);
        self.cue_eight.store(values.cue_eight, Ordering::Relaxed);
        self.break_bounces.store(values.break_bounces, Ordering::Relaxed);
        self.solids_pocketed.store(values.solids_pocketed, Ordering::Relaxed);
        self.stripes_pocketed.store(values.stripes_pocketed, Ordering::Relaxed);
        self.fouls.store(values.fouls, Ordering::Relaxed);
    }

    /// Zero what a replayed break produced: rail contacts and balls pocketed
    /// off the re-racked formation
    pub fn restart_break(&self) {
        self.break_bounces.store(0, Ordering::Relaxed);
        self.solids_pocketed.store(0, Ordering::Relaxed);
        self.stripes_pocketed.store(0, Ordering::Relaxed);
    }
}

const NO_WINNER: u8 = u8::MAX;

/// Game flags shared between the physics, rule and controller tasks
#[derive(Debug)]
pub struct Flags {
    phase: AtomicU8,
    turn: AtomicU8,
    assignment: AtomicU8,
    foul_pending: AtomicBool,
    eligible: [AtomicBool; 2],
    declared_pocket: AtomicU8,
    winner: AtomicU8,
    quiescent: AtomicBool,
    awaiting: AtomicU8,
    first_touch_armed: AtomicBool,
    trail: AtomicBool,
}

impl Default for Flags {
    fn default() -> Self {
        Self {
            phase: AtomicU8::new(GamePhase::Break as u8),
            turn: AtomicU8::new(Player::A as u8),
            assignment: AtomicU8::new(GroupAssignment::Unassigned as u8),
            foul_pending: AtomicBool::new(false),
            eligible: [AtomicBool::new(false), AtomicBool::new(false)],
            declared_pocket: AtomicU8::new(0),
            winner: AtomicU8::new(NO_WINNER),
            quiescent: AtomicBool::new(true),
            awaiting: AtomicU8::new(Awaiting::Nothing as u8),
            first_touch_armed: AtomicBool::new(true),
            trail: AtomicBool::new(false),
        }
    }
}

impl Flags {
    pub fn phase(&self) -> GamePhase {
        GamePhase::from_u8(self.phase.load(Ordering::Relaxed))
    }

    pub fn set_phase(&self, phase: GamePhase) {
        self.phase.store(phase as u8, Ordering::Relaxed);
    }

    /// Player whose shot is in progress or next
    pub fn turn(&self) -> Player {
        Player::from_u8(self.turn.load(Ordering::Relaxed))
    }

    pub fn set_turn(&self, player: Player) {
        self.turn.store(player as u8, Ordering::Relaxed);
    }

    pub fn assignment(&self) -> GroupAssignment {
        GroupAssignment::from_u8(self.assignment.load(Ordering::Relaxed))
    }

    pub fn set_assignment(&self, assignment: GroupAssignment) {
        self.assignment.store(assignment as u8, Ordering::Relaxed);
    }

    pub fn foul_pending(&self) -> bool {
        self.foul_pending.load(Ordering::Relaxed)
    }

    pub fn set_foul_pending(&self, pending: bool) {
        self.foul_pending.store(pending, Ordering::Relaxed);
    }

    /// May `player` legally pocket the eight
    pub fn eligible(&self, player: Player) -> bool {
        self.eligible[player.slot()].load(Ordering::Relaxed)
    }

    pub fn set_eligible(&self, player: Player, eligible: bool) {
        self.eligible[player.slot()].store(eligible, Ordering::Relaxed);
    }

    pub fn declared_pocket(&self) -> usize {
        self.declared_pocket.load(Ordering::Relaxed) as usize
    }

    pub fn set_declared_pocket(&self, pocket: usize) {
        self.declared_pocket
            .store((pocket % crate::consts::N_POCKETS) as u8, Ordering::Relaxed);
    }

    pub fn winner(&self) -> Option<Player> {
        match self.winner.load(Ordering::Relaxed) {
            NO_WINNER => None,
            v => Some(Player::from_u8(v)),
        }
    }

    pub fn set_winner(&self, winner: Option<Player>) {
        let v = winner.map_or(NO_WINNER, |p| p as u8);
        self.winner.store(v, Ordering::Relaxed);
    }

    /// Last quiescence sample taken by the rule task
    pub fn quiescent(&self) -> bool {
        self.quiescent.load(Ordering::Relaxed)
    }

    pub fn set_quiescent(&self, quiescent: bool) {
        self.quiescent.store(quiescent, Ordering::Relaxed);
    }

    pub fn awaiting(&self) -> Awaiting {
        Awaiting::from_u8(self.awaiting.load(Ordering::Relaxed))
    }

    pub fn set_awaiting(&self, awaiting: Awaiting) {
        self.awaiting.store(awaiting as u8, Ordering::Relaxed);
    }

    /// Arm first-contact counting for the next shot
    pub fn arm_first_touch(&self) {
        self.first_touch_armed.store(true, Ordering::Relaxed);
    }

    /// Consume the first-contact token; true for exactly one caller per arm
    pub fn take_first_touch(&self) -> bool {
        self.first_touch_armed.swap(false, Ordering::Relaxed)
    }

    pub fn trail_enabled(&self) -> bool {
        self.trail.load(Ordering::Relaxed)
    }

    pub fn toggle_trail(&self) -> bool {
        !self.trail.fetch_xor(true, Ordering::Relaxed)
    }

    /// Start-of-game values; the trail switch is a display preference and is kept
    fn reset(&self) {
        self.set_phase(GamePhase::Break);
        self.set_turn(Player::A);
        self.set_assignment(GroupAssignment::Unassigned);
        self.set_foul_pending(false);
        self.set_eligible(Player::A, false);
        self.set_eligible(Player::B, false);
        self.declared_pocket.store(0, Ordering::Relaxed);
        self.set_winner(None);
        self.set_quiescent(true);
        self.set_awaiting(Awaiting::Nothing);
        self.arm_first_touch();
    }
}

/// `f32` stored in an `AtomicU32`
#[derive(Debug)]
pub struct AtomicF32(AtomicU32);

impl AtomicF32 {
    pub fn new(v: f32) -> Self {
        Self(AtomicU32::new(v.to_bits()))
    }

    #[inline]
    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn store(&self, v: f32) {
        self.0.store(v.to_bits(), Ordering::Relaxed);
    }
}

/// Live tunables written by the controllers and read by the physics tick
#[derive(Debug)]
pub struct Params {
    pub friction: AtomicF32,
    pub restitution: AtomicF32,
    pub time_scale: AtomicF32,
    pub shot_speed: AtomicF32,
    /// Shot angle in radians
    pub aim: AtomicF32,
}

impl Params {
    fn new(config: &PhysicsConfig) -> Self {
        Self {
            friction: AtomicF32::new(config.friction.initial),
            restitution: AtomicF32::new(config.restitution.initial),
            time_scale: AtomicF32::new(config.time_scale.initial),
            shot_speed: AtomicF32::new(config.power.max),
            aim: AtomicF32::new(0.0),
        }
    }
}

/// Everything the periodic tasks share
#[derive(Debug)]
pub struct World {
    table: Mutex<Table>,
    pub counters: Counters,
    pub flags: Flags,
    pub params: Params,
    physics: PhysicsConfig,
}

impl World {
    pub fn new(physics: &PhysicsConfig) -> Self {
        Self {
            table: Mutex::new(Table::new()),
            counters: Counters::default(),
            flags: Flags::default(),
            params: Params::new(physics),
            physics: *physics,
        }
    }

    /// Take the table lock
    pub fn lock(&self) -> MutexGuard<'_, Table> {
        self.table.lock()
    }

    /// Tuning bounds this world was created with
    pub fn physics_config(&self) -> &PhysicsConfig {
        &self.physics
    }

    /// Back to the break formation with zeroed counters and start-of-game flags.
    ///
    /// Friction, restitution and time scale keep their current values.
    pub fn reset(&self) {
        self.lock().rerack();
        self.counters.restore(CounterSnapshot::default());
        self.flags.reset();
        self.params.shot_speed.store(self.physics.power.max);
        self.params.aim.store(0.0);
        log::info!("game reset");
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(&PhysicsConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_snapshot_and_restore() {
        let counters = Counters::default();
        counters.record_touch(BallGroup::Solid);
        counters.record_touch(BallGroup::Neutral);
        counters.record_pocketed(BallGroup::Striped);
        counters.record_pocketed(BallGroup::Neutral);
        counters.record_break_bounce();
        let snap = counters.snapshot();
        assert_eq!(snap.cue_solid, 1);
        assert_eq!(snap.cue_eight, 1);
        assert_eq!(snap.stripes_pocketed, 1);
        assert_eq!(snap.total_pocketed(), 1);
        assert_eq!(snap.break_bounces, 1);

        counters.restore(CounterSnapshot::default());
        assert_eq!(counters.snapshot(), CounterSnapshot::default());
    }

    #[test]
    fn test_first_touch_token_is_single_use() {
        let flags = Flags::default();
        assert!(flags.take_first_touch());
        assert!(!flags.take_first_touch());
        flags.arm_first_touch();
        assert!(flags.take_first_touch());
    }

    #[test]
    fn test_winner_round_trip() {
        let flags = Flags::default();
        assert_eq!(flags.winner(), None);
        flags.set_winner(Some(Player::B));
        assert_eq!(flags.winner(), Some(Player::B));
        flags.set_winner(None);
        assert_eq!(flags.winner(), None);
    }

    #[test]
    fn test_declared_pocket_wraps() {
        let flags = Flags::default();
        flags.set_declared_pocket(7);
        assert_eq!(flags.declared_pocket(), 1);
    }

    #[test]
    fn test_trail_toggle() {
        let flags = Flags::default();
        assert!(flags.toggle_trail());
        assert!(flags.trail_enabled());
        assert!(!flags.toggle_trail());
    }

    #[test]
    fn test_reset_keeps_tunables() {
        let world = World::default();
        world.params.friction.store(0.05);
        world.params.shot_speed.store(0.3);
        world.params.aim.store(1.0);
        world.flags.set_phase(GamePhase::Standard);
        world.flags.set_winner(Some(Player::A));
        world.counters.record_foul();
        world.lock().balls[4].park();

        world.reset();

        assert_eq!(world.params.friction.load(), 0.05);
        assert_eq!(world.params.shot_speed.load(), 2.0);
        assert_eq!(world.params.aim.load(), 0.0);
        assert_eq!(world.flags.phase(), GamePhase::Break);
        assert_eq!(world.flags.winner(), None);
        assert_eq!(world.counters.snapshot().fouls, 0);
        assert!(world.lock().balls[4].active);
    }
}
