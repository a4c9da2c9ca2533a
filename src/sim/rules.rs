//! Turn and phase rules
//!
//! The rule engine samples table quiescence once per period and acts only on
//! edges. Entering quiescence evaluates the shot that just finished by
//! comparing counters against the snapshot taken at the previous settle;
//! leaving quiescence re-arms the once-per-shot decisions.
//!
//! Counters and flags are read without the table lock, so an evaluation can
//! in principle see a physics tick half-applied. The rule period is several
//! physics periods long and evaluation only happens once every ball is still,
//! which keeps that window practically closed.

use glam::Vec2;

use super::rails::captured_by;
use super::state::{Awaiting, BallGroup, GamePhase, GroupAssignment, Player, Table};
use super::world::{CounterSnapshot, World};
use crate::config::RulesConfig;
use crate::consts::{BALL_DIAMETER, GROUP_SIZE, N_POCKETS};
use crate::in_table;
use crate::input::Command;

/// Decisions taken at most once between two motion starts
#[derive(Debug, Clone, Copy)]
struct OneShots {
    phase_switch: bool,
    turn_decision: bool,
}

impl OneShots {
    const ARMED: Self = Self {
        phase_switch: true,
        turn_decision: true,
    };
}

/// Edge-triggered rule state machine
#[derive(Debug)]
pub struct RuleEngine {
    config: RulesConfig,
    /// Counters at the last settle
    prev: CounterSnapshot,
    /// Quiescence at the previous sample
    was_quiet: bool,
    one_shots: OneShots,
}

impl RuleEngine {
    pub fn new(config: RulesConfig) -> Self {
        Self {
            config,
            prev: CounterSnapshot::default(),
            was_quiet: true,
            one_shots: OneShots::ARMED,
        }
    }

    /// Counters as of the last settle
    pub fn last_settle(&self) -> CounterSnapshot {
        self.prev
    }

    /// Sample quiescence and act on an edge.
    ///
    /// The published flag is only written on an edge, so a shot that clears it
    /// between two samples is never overwritten and always yields a falling
    /// edge, even when every ball is back at rest by the next sample.
    pub fn tick(&mut self, world: &World) {
        let (shot_taken, quiet) = {
            let table = world.lock();
            (
                !world.flags.quiescent(),
                table.is_quiescent(self.config.quiescence_threshold),
            )
        };

        if self.was_quiet && shot_taken {
            if world.flags.winner().is_none() {
                self.on_motion(world);
            }
            self.was_quiet = false;
        }

        if quiet != self.was_quiet {
            if world.flags.winner().is_some() {
                // Game over: nothing to evaluate until reset
            } else if quiet {
                self.on_settle(world);
            } else {
                self.on_motion(world);
            }
            world.flags.set_quiescent(quiet);
        }

        self.was_quiet = quiet;
    }

    fn on_motion(&mut self, world: &World) {
        self.one_shots = OneShots::ARMED;
        world.flags.set_foul_pending(false);
    }

    fn on_settle(&mut self, world: &World) {
        let flags = &world.flags;
        let counters = &world.counters;
        flags.arm_first_touch();

        let now = counters.snapshot();
        let prev = self.prev;
        let phase = flags.phase();
        let turn = flags.turn();
        let assignment = flags.assignment();

        if matches!(phase, GamePhase::Open | GamePhase::Standard)
            && self.missed_required_contact(world, turn, &now)
        {
            log::debug!("foul: {turn:?} missed the required contact");
            counters.record_foul();
        }

        if phase == GamePhase::Standard {
            for player in [Player::A, Player::B] {
                if let Some(group) = assignment.group_of(player)
                    && now.pocketed(group) >= GROUP_SIZE
                    && !flags.eligible(player)
                {
                    flags.set_eligible(player, true);
                    log::info!("player {player:?} may now play the eight");
                }
            }

            if let Some(other) = assignment.group_of(turn.other())
                && now.touches(other) > prev.touches(other)
            {
                log::debug!("foul: {turn:?} touched the opponent's group");
                counters.record_foul();
            }
        }

        let fouled = counters.snapshot().fouls > prev.fouls && flags.winner().is_none();
        if fouled {
            self.foul(world);
        } else {
            if assignment == GroupAssignment::Unassigned && phase == GamePhase::Open {
                self.assign_groups(world, turn);
            }
            if self.one_shots.phase_switch {
                self.switch_phase(world, phase, &now);
                self.one_shots.phase_switch = false;
            }
            if self.one_shots.turn_decision {
                self.decide_turn(world, turn, &now, &prev);
                self.one_shots.turn_decision = false;
            }
        }

        if flags.eligible(flags.turn())
            && flags.awaiting() == Awaiting::Nothing
            && flags.winner().is_none()
        {
            flags.set_awaiting(Awaiting::Declaration);
        }

        self.prev = counters.snapshot();
    }

    /// True if the acting player's shot failed to touch what it had to
    fn missed_required_contact(&self, world: &World, turn: Player, now: &CounterSnapshot) -> bool {
        let prev = &self.prev;
        let touched_group = now.cue_solid + now.cue_striped > prev.cue_solid + prev.cue_striped;
        let touched_eight = now.cue_eight > prev.cue_eight;
        if world.flags.eligible(turn) {
            !touched_eight
        } else {
            !touched_group
        }
    }

    /// Cue ball in hand for the opponent
    fn foul(&mut self, world: &World) {
        world.lock().cue_mut().park();
        let next = world.flags.turn().other();
        world.flags.set_turn(next);
        world.flags.set_foul_pending(true);
        world.flags.set_awaiting(Awaiting::Respot);
        log::debug!("foul: ball in hand for {next:?}");
    }

    fn assign_groups(&self, world: &World, turn: Player) {
        let group = world.lock().last_pocketed_group(GamePhase::Open);
        if let Some(group) = group {
            let assignment = GroupAssignment::giving(turn, group);
            world.flags.set_assignment(assignment);
            log::info!("groups assigned: {turn:?} plays {group:?}");
        }
    }

    fn switch_phase(&self, world: &World, phase: GamePhase, now: &CounterSnapshot) {
        match phase {
            GamePhase::Open => {
                let pocketed = world.lock().last_pocketed_group(GamePhase::Open).is_some();
                if pocketed {
                    world.flags.set_phase(GamePhase::Standard);
                    log::info!("phase: Open -> Standard");
                }
            }
            GamePhase::Break if now.break_bounces >= self.config.min_break_bounces => {
                world.flags.set_phase(GamePhase::Open);
                log::info!("phase: Break -> Open ({} rail contacts)", now.break_bounces);
            }
            GamePhase::Break => {
                world.lock().rerack();
                world.counters.restart_break();
                log::debug!(
                    "break replayed: {} of {} rail contacts",
                    now.break_bounces,
                    self.config.min_break_bounces
                );
            }
            GamePhase::Standard => {}
        }
    }

    fn decide_turn(
        &self,
        world: &World,
        turn: Player,
        now: &CounterSnapshot,
        prev: &CounterSnapshot,
    ) {
        let keep = match world.flags.phase() {
            GamePhase::Standard => world
                .flags
                .assignment()
                .group_of(turn)
                .is_some_and(|g| now.pocketed(g) > prev.pocketed(g)),
            GamePhase::Break | GamePhase::Open => now.total_pocketed() > prev.total_pocketed(),
        };
        if !keep {
            world.flags.set_turn(turn.other());
            log::debug!("turn: {:?}", turn.other());
        }
    }

    /// Apply a rule-level command. Commands that do not apply now are ignored.
    pub fn handle(&mut self, world: &World, command: Command) {
        let flags = &world.flags;
        match command {
            Command::Respot { x, y } => {
                let pos = Vec2::new(x, y);
                if flags.awaiting() != Awaiting::Respot || !in_table(pos) {
                    return;
                }
                let mut table = world.lock();
                if !spot_is_free(&table, pos) {
                    log::debug!("re-spot at ({x:.3}, {y:.3}) refused");
                    return;
                }
                table.cue_mut().place(pos);
                drop(table);
                let next = if flags.eligible(flags.turn()) {
                    Awaiting::Declaration
                } else {
                    Awaiting::Nothing
                };
                flags.set_awaiting(next);
                log::debug!("cue ball re-spotted at ({x:.3}, {y:.3})");
            }
            Command::CyclePocket(step) => {
                if flags.eligible(flags.turn()) && flags.winner().is_none() {
                    let n = N_POCKETS as i32;
                    let next = (flags.declared_pocket() as i32 + step.rem_euclid(n)).rem_euclid(n);
                    flags.set_declared_pocket(next as usize);
                }
            }
            Command::ConfirmPocket => {
                if flags.awaiting() == Awaiting::Declaration {
                    flags.set_awaiting(Awaiting::Nothing);
                    log::debug!("pocket {} declared", flags.declared_pocket());
                }
            }
            Command::Reset => {
                world.reset();
                *self = Self::new(self.config);
            }
            Command::ForceEliminate(id) => {
                let id = id as usize;
                let group = BallGroup::of(id);
                if group == BallGroup::Neutral {
                    return;
                }
                let phase = flags.phase();
                let mut table = world.lock();
                let Some(ball) = table.balls.get_mut(id).filter(|b| b.active) else {
                    return;
                };
                ball.park();
                ball.pocketed_in = Some(phase);
                world.counters.record_pocketed(group);
                log::debug!("ball {id} eliminated");
            }
            _ => {}
        }
    }
}

/// A cue ball placed at `pos` would neither drop at once nor overlap another ball
fn spot_is_free(table: &Table, pos: Vec2) -> bool {
    captured_by(pos, &table.pockets).is_none()
        && table
            .active_balls()
            .filter(|b| !b.is_cue())
            .all(|b| b.pos.distance(pos) >= BALL_DIAMETER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PhysicsConfig;
    use crate::consts::TABLE_LX;
    use crate::sim::state::rack_position;

    fn setup() -> (World, RuleEngine) {
        (
            World::new(&PhysicsConfig::default()),
            RuleEngine::new(RulesConfig::default()),
        )
    }

    /// Put the cue ball in motion and bring it back to rest, ticking on each edge
    fn settle(world: &World, engine: &mut RuleEngine) {
        world.lock().cue_mut().vel = Vec2::new(0.5, 0.0);
        engine.tick(world);
        world.lock().cue_mut().vel = Vec2::ZERO;
        engine.tick(world);
    }

    #[test]
    fn test_no_evaluation_without_edge() {
        let (world, mut engine) = setup();
        engine.tick(&world);
        engine.tick(&world);
        assert_eq!(world.flags.turn(), Player::A);
        assert!(world.flags.quiescent());
    }

    #[test]
    fn test_motion_clears_foul_pending() {
        let (world, mut engine) = setup();
        world.flags.set_foul_pending(true);
        world.lock().cue_mut().vel = Vec2::new(1.0, 0.0);
        engine.tick(&world);
        assert!(!world.flags.foul_pending());
        assert!(!world.flags.quiescent());
    }

    #[test]
    fn test_break_without_pot_passes_turn() {
        let (world, mut engine) = setup();
        for _ in 0..5 {
            world.counters.record_break_bounce();
        }
        settle(&world, &mut engine);
        assert_eq!(world.flags.phase(), GamePhase::Open);
        assert_eq!(world.flags.turn(), Player::B);
    }

    #[test]
    fn test_short_break_is_replayed() {
        let (world, mut engine) = setup();
        world.counters.record_break_bounce();
        world.lock().balls[6].pos = Vec2::new(0.2, 0.2);
        settle(&world, &mut engine);
        assert_eq!(world.flags.phase(), GamePhase::Break);
        assert_eq!(world.lock().balls[6].pos, rack_position(6));
        assert_eq!(world.counters.snapshot().break_bounces, 0);
    }

    #[test]
    fn test_open_phase_pot_assigns_group_and_keeps_turn() {
        let (world, mut engine) = setup();
        world.flags.set_phase(GamePhase::Open);
        world.flags.set_turn(Player::B);
        world.counters.record_touch(BallGroup::Solid);
        engine.handle(&world, Command::ForceEliminate(4));
        engine.handle(&world, Command::ForceEliminate(13));
        settle(&world, &mut engine);

        // Highest-numbered ball decides: 13 is a stripe, so B plays stripes
        assert_eq!(world.flags.assignment(), GroupAssignment::ASolids);
        assert_eq!(world.flags.phase(), GamePhase::Standard);
        assert_eq!(world.flags.turn(), Player::B);
    }

    #[test]
    fn test_touching_eight_first_in_open_is_foul() {
        let (world, mut engine) = setup();
        world.flags.set_phase(GamePhase::Open);
        world.counters.record_touch(BallGroup::Neutral);
        settle(&world, &mut engine);
        assert_eq!(world.counters.snapshot().fouls, 1);
        assert_eq!(world.flags.awaiting(), Awaiting::Respot);
        assert!(!world.lock().cue().active);
    }

    #[test]
    fn test_wrong_group_touch_is_foul() {
        let (world, mut engine) = setup();
        world.flags.set_phase(GamePhase::Standard);
        world.flags.set_assignment(GroupAssignment::ASolids);
        world.counters.record_touch(BallGroup::Striped);
        settle(&world, &mut engine);
        assert_eq!(world.counters.snapshot().fouls, 1);
        assert_eq!(world.flags.turn(), Player::B);
    }

    #[test]
    fn test_standard_keeps_turn_only_for_own_group() {
        let (world, mut engine) = setup();
        world.flags.set_phase(GamePhase::Standard);
        world.flags.set_assignment(GroupAssignment::AStripes);

        world.counters.record_touch(BallGroup::Striped);
        engine.handle(&world, Command::ForceEliminate(10));
        settle(&world, &mut engine);
        assert_eq!(world.flags.turn(), Player::A);

        world.counters.record_touch(BallGroup::Striped);
        engine.handle(&world, Command::ForceEliminate(2));
        settle(&world, &mut engine);
        assert_eq!(world.flags.turn(), Player::B);
        assert_eq!(world.counters.snapshot().fouls, 0);
    }

    #[test]
    fn test_respot_rejected_out_of_bounds_or_when_not_awaited() {
        let (world, mut engine) = setup();
        engine.handle(&world, Command::Respot { x: 0.3, y: 0.3 });
        assert_eq!(world.lock().cue().pos, rack_position(0));

        world.flags.set_phase(GamePhase::Open);
        settle(&world, &mut engine);
        assert_eq!(world.flags.awaiting(), Awaiting::Respot);
        engine.handle(&world, Command::Respot { x: 2.5, y: 0.3 });
        assert!(!world.lock().cue().active);
        engine.handle(&world, Command::Respot { x: 0.3, y: 0.3 });
        assert!(world.lock().cue().active);
        assert_eq!(world.flags.awaiting(), Awaiting::Nothing);
    }

    #[test]
    fn test_cycle_pocket_requires_eligibility() {
        let (world, mut engine) = setup();
        engine.handle(&world, Command::CyclePocket(1));
        assert_eq!(world.flags.declared_pocket(), 0);

        world.flags.set_eligible(Player::A, true);
        engine.handle(&world, Command::CyclePocket(-1));
        assert_eq!(world.flags.declared_pocket(), 5);
        engine.handle(&world, Command::CyclePocket(2));
        assert_eq!(world.flags.declared_pocket(), 1);
    }

    #[test]
    fn test_cycle_pocket_survives_extreme_steps() {
        let (world, mut engine) = setup();
        world.flags.set_eligible(Player::A, true);
        engine.handle(&world, Command::CyclePocket(1));
        engine.handle(&world, Command::CyclePocket(i32::MAX));
        // i32::MAX = 6 * 357913941 + 1
        assert_eq!(world.flags.declared_pocket(), 2);
        engine.handle(&world, Command::CyclePocket(i32::MIN));
        // i32::MIN rem_euclid 6 = 4
        assert_eq!(world.flags.declared_pocket(), 0);
    }

    #[test]
    fn test_respot_refused_in_pocket_mouth_or_on_a_ball() {
        let (world, mut engine) = setup();
        world.flags.set_phase(GamePhase::Open);
        settle(&world, &mut engine);
        assert_eq!(world.flags.awaiting(), Awaiting::Respot);

        engine.handle(&world, Command::Respot { x: 0.01, y: 0.01 });
        engine.handle(&world, Command::Respot { x: TABLE_LX / 2.0, y: 0.01 });
        let apex = rack_position(1);
        engine.handle(
            &world,
            Command::Respot {
                x: apex.x - BALL_DIAMETER / 2.0,
                y: apex.y,
            },
        );
        assert!(!world.lock().cue().active);
        assert_eq!(world.flags.awaiting(), Awaiting::Respot);

        engine.handle(
            &world,
            Command::Respot {
                x: apex.x - 1.5 * BALL_DIAMETER,
                y: apex.y,
            },
        );
        assert!(world.lock().cue().active);
    }

    #[test]
    fn test_shot_settled_between_samples_is_evaluated() {
        let (world, mut engine) = setup();
        world.flags.set_phase(GamePhase::Open);

        // Shot taken and over before the next sample; nothing was touched
        world.flags.set_quiescent(false);
        engine.tick(&world);

        assert!(world.flags.foul_pending());
        assert_eq!(world.counters.snapshot().fouls, 1);
        assert_eq!(world.flags.turn(), Player::B);
        assert_eq!(world.flags.awaiting(), Awaiting::Respot);
        assert!(world.flags.quiescent());
    }

    #[test]
    fn test_force_eliminate_skips_cue_and_eight() {
        let (world, mut engine) = setup();
        engine.handle(&world, Command::ForceEliminate(0));
        engine.handle(&world, Command::ForceEliminate(8));
        engine.handle(&world, Command::ForceEliminate(16));
        assert!(world.lock().cue().active);
        assert!(world.lock().eight().active);
        assert_eq!(world.counters.snapshot().total_pocketed(), 0);
    }

    #[test]
    fn test_winner_freezes_evaluation() {
        let (world, mut engine) = setup();
        world.flags.set_phase(GamePhase::Open);
        world.flags.set_winner(Some(Player::B));
        settle(&world, &mut engine);
        assert_eq!(world.counters.snapshot().fouls, 0);
        assert_eq!(world.flags.turn(), Player::A);

        engine.handle(&world, Command::Reset);
        assert_eq!(world.flags.winner(), None);
        assert_eq!(engine.last_settle(), CounterSnapshot::default());
    }
}
