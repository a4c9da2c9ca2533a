//! Physics tick
//!
//! One tick runs entirely under the table lock: pocket capture, integration
//! with cushion and funnel reflection, then pairwise collisions. Counter and
//! flag side effects go through the relaxed atomics on [`World`].

use std::time::Duration;

use super::collision::resolve_pair;
use super::rails::{bounce_cushions, captured_by, steer_funnels};
use super::state::{BallGroup, GamePhase, Player, Table};
use super::world::World;
use crate::consts::N_BALLS;

/// Lock the table and advance it by one task period
pub fn tick(world: &World, period: Duration) {
    let mut table = world.lock();
    step(&mut table, world, period.as_secs_f32());
}

/// Advance an already locked table by `period_s` wall-clock seconds
pub fn step(table: &mut Table, world: &World, period_s: f32) {
    capture_pocketed(table, world);

    let dt = period_s * world.params.time_scale.load();
    let damping = 1.0 - world.params.friction.load();
    let dump = world.params.restitution.load();
    let breaking = world.flags.phase() == GamePhase::Break;
    let trail = world.flags.trail_enabled();

    for ball in table.balls.iter_mut().filter(|b| b.active) {
        ball.pos += ball.vel * dt;
        ball.vel *= damping;
        if trail {
            ball.trail.record(ball.pos);
        }

        let hits = bounce_cushions(ball, dump);
        if breaking {
            for _ in 0..hits {
                world.counters.record_break_bounce();
            }
        }
        steer_funnels(ball, dump);
    }

    resolve_collisions(table, world, dump);
}

/// Deactivate every active ball inside a pocket and apply its consequences
fn capture_pocketed(table: &mut Table, world: &World) {
    let phase = world.flags.phase();
    let turn = world.flags.turn();

    for id in 0..N_BALLS {
        let ball = &table.balls[id];
        if !ball.active {
            continue;
        }
        let Some(pocket) = captured_by(ball.pos, &table.pockets) else {
            continue;
        };
        let group = ball.group;
        let eight_down = !table.eight().active;

        let ball = &mut table.balls[id];
        ball.park();
        match id {
            0 if eight_down => {
                decide(world, turn.other());
            }
            0 => {
                world.counters.record_foul();
                log::debug!("cue ball pocketed in {pocket}");
            }
            8 => {
                let winner = if world.flags.eligible(turn) && pocket == world.flags.declared_pocket()
                {
                    turn
                } else {
                    turn.other()
                };
                log::debug!(
                    "eight pocketed in {pocket} (declared {}) by {turn:?}",
                    world.flags.declared_pocket()
                );
                decide(world, winner);
            }
            _ => {
                debug_assert_ne!(group, BallGroup::Neutral);
                ball.pocketed_in = Some(phase);
                world.counters.record_pocketed(group);
            }
        }
    }
}

fn decide(world: &World, winner: Player) {
    if world.flags.winner().is_none() {
        world.flags.set_winner(Some(winner));
        log::info!("player {winner:?} wins");
    }
}

/// Resolve every overlapping unordered pair once, counting the cue ball's first contact
fn resolve_collisions(table: &mut Table, world: &World, dump: f32) {
    for i in 0..N_BALLS {
        let (head, tail) = table.balls.split_at_mut(i + 1);
        let bi = &mut head[i];
        if !bi.active {
            continue;
        }
        for bj in tail.iter_mut().filter(|b| b.active) {
            if resolve_pair(bi, bj, dump) && bi.is_cue() && world.flags.take_first_touch() {
                world.counters.record_touch(bj.group);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;
    use proptest::prelude::*;

    use super::*;
    use crate::consts::{BALL_DIAMETER, TABLE_LX, TABLE_LY};

    const PERIOD: f32 = 0.04;

    /// World with every ball parked except the ones a test places
    fn empty_world() -> World {
        let world = World::default();
        for ball in world.lock().balls.iter_mut() {
            ball.park();
        }
        world
    }

    fn place(world: &World, id: usize, x: f32, y: f32, vx: f32, vy: f32) {
        let mut table = world.lock();
        table.balls[id].place(Vec2::new(x, y));
        table.balls[id].vel = Vec2::new(vx, vy);
    }

    fn run(world: &World, ticks: usize) {
        for _ in 0..ticks {
            let mut table = world.lock();
            step(&mut table, world, PERIOD);
        }
    }

    #[test]
    fn test_friction_is_per_tick_damping() {
        let world = empty_world();
        world.params.friction.store(0.1);
        place(&world, 0, 0.5, 0.4, 1.0, 0.0);
        run(&world, 1);
        let table = world.lock();
        assert!((table.balls[0].vel.x - 0.9).abs() < 1e-6);
        assert!((table.balls[0].pos.x - 0.54).abs() < 1e-6);
    }

    #[test]
    fn test_time_scale_scales_displacement() {
        let world = empty_world();
        world.params.time_scale.store(2.0);
        place(&world, 0, 0.5, 0.4, 1.0, 0.0);
        run(&world, 1);
        assert!((world.lock().balls[0].pos.x - 0.58).abs() < 1e-6);
    }

    #[test]
    fn test_pocket_capture_happens_once() {
        let world = empty_world();
        world.flags.set_phase(GamePhase::Open);
        place(&world, 3, 0.0, 0.0, 0.0, 0.0);
        run(&world, 5);

        let table = world.lock();
        let ball = &table.balls[3];
        assert!(!ball.active);
        assert_eq!(ball.pos, ball.rest);
        assert_eq!(ball.pocketed_in, Some(GamePhase::Open));
        assert_eq!(world.counters.snapshot().solids_pocketed, 1);
    }

    #[test]
    fn test_cue_scratch_is_foul() {
        let world = empty_world();
        place(&world, 8, 0.8, 0.4, 0.0, 0.0);
        place(&world, 0, TABLE_LX, TABLE_LY, 0.0, 0.0);
        run(&world, 2);
        assert_eq!(world.counters.snapshot().fouls, 1);
        assert!(!world.lock().balls[0].active);
        assert_eq!(world.flags.winner(), None);
    }

    #[test]
    fn test_cue_scratch_after_eight_loses() {
        let world = empty_world();
        world.flags.set_turn(Player::B);
        place(&world, 0, TABLE_LX, TABLE_LY, 0.0, 0.0);
        run(&world, 1);
        assert_eq!(world.flags.winner(), Some(Player::A));
        assert_eq!(world.counters.snapshot().fouls, 0);
    }

    #[test]
    fn test_early_eight_loses() {
        let world = empty_world();
        place(&world, 8, 0.0, 0.0, 0.0, 0.0);
        run(&world, 1);
        assert_eq!(world.flags.winner(), Some(Player::B));
    }

    #[test]
    fn test_break_bounces_counted_only_in_break() {
        let world = empty_world();
        place(&world, 0, 0.03, 0.4, -1.0, 0.0);
        run(&world, 1);
        assert_eq!(world.counters.snapshot().break_bounces, 1);

        world.flags.set_phase(GamePhase::Open);
        place(&world, 0, 0.03, 0.4, -1.0, 0.0);
        run(&world, 1);
        assert_eq!(world.counters.snapshot().break_bounces, 1);
    }

    #[test]
    fn test_first_touch_counted_once_per_arm() {
        let world = empty_world();
        world.params.friction.store(0.0);
        place(&world, 0, 0.5, 0.4, 1.0, 0.0);
        place(&world, 12, 0.5 + BALL_DIAMETER * 0.9, 0.4, 0.0, 0.0);
        place(&world, 2, 0.3, 0.4, 0.0, 0.0);
        run(&world, 1);
        assert_eq!(world.counters.snapshot().cue_striped, 1);

        // Second contact in the same shot is not counted
        place(&world, 0, 0.3 + BALL_DIAMETER * 0.9, 0.4, 0.0, 0.0);
        run(&world, 1);
        let snap = world.counters.snapshot();
        assert_eq!(snap.cue_solid, 0);
        assert_eq!(snap.total_touches(), 1);
    }

    #[test]
    fn test_trail_records_only_when_enabled() {
        let world = empty_world();
        place(&world, 0, 0.5, 0.4, 0.5, 0.0);
        run(&world, 3);
        assert!(world.lock().balls[0].trail.is_empty());
        world.flags.toggle_trail();
        run(&world, 3);
        assert_eq!(world.lock().balls[0].trail.len(), 3);
    }

    #[test]
    fn test_full_rack_break_stays_finite() {
        let world = World::default();
        world.lock().balls[0].vel = Vec2::new(2.0, 0.01);
        run(&world, 200);
        let table = world.lock();
        for ball in table.active_balls() {
            assert!(ball.pos.is_finite() && ball.vel.is_finite());
        }
        assert!(world.counters.snapshot().cue_solid == 1);
    }

    proptest! {
        #[test]
        fn prop_tick_keeps_balls_near_table(
            x in 0.1f32..1.6,
            y in 0.1f32..0.75,
            vx in -2.0f32..2.0,
            vy in -2.0f32..2.0,
        ) {
            let world = empty_world();
            place(&world, 5, x, y, vx, vy);
            run(&world, 1);
            let table = world.lock();
            let ball = &table.balls[5];
            prop_assume!(ball.active);
            let reach = Vec2::new(vx, vy).length() * PERIOD + 1e-5;
            prop_assert!(ball.pos.x >= -reach && ball.pos.x <= TABLE_LX + reach);
            prop_assert!(ball.pos.y >= -reach && ball.pos.y <= TABLE_LY + reach);
        }
    }
}
