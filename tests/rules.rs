//! Rule scenarios driven through the public world, physics and rule APIs.

use glam::Vec2;

use pool_rt::Command;
use pool_rt::config::{PhysicsConfig, RulesConfig};
use pool_rt::consts::N_BALLS;
use pool_rt::sim::physics;
use pool_rt::sim::state::{pockets, rack_position};
use pool_rt::sim::{
    Awaiting, BallGroup, GamePhase, GroupAssignment, Player, RuleEngine, ShotController, World,
};

const PERIOD_S: f32 = 0.04;

fn new_game() -> (World, RuleEngine) {
    (
        World::new(&PhysicsConfig::default()),
        RuleEngine::new(RulesConfig::default()),
    )
}

/// A shot starts and ends between two rule samples
fn settle(world: &World, engine: &mut RuleEngine) {
    world.lock().cue_mut().vel = Vec2::new(0.3, 0.0);
    engine.tick(world);
    world.lock().cue_mut().vel = Vec2::ZERO;
    engine.tick(world);
}

fn step(world: &World) {
    let mut table = world.lock();
    physics::step(&mut table, world, PERIOD_S);
}

#[test]
fn test_break_with_three_bounces_is_replayed() {
    let (world, mut engine) = new_game();
    for _ in 0..3 {
        world.counters.record_break_bounce();
    }
    {
        let mut table = world.lock();
        table.balls[1].pos = Vec2::new(1.0, 0.3);
        table.balls[14].pos = Vec2::new(0.6, 0.7);
    }

    settle(&world, &mut engine);

    assert_eq!(world.flags.phase(), GamePhase::Break);
    let table = world.lock();
    for (id, ball) in table.balls.iter().enumerate() {
        assert!(ball.active);
        assert_eq!(ball.pos, rack_position(id), "ball {id} not re-racked");
    }
    assert_eq!(world.counters.snapshot().break_bounces, 0);
}

#[test]
fn test_break_with_four_bounces_opens_the_table() {
    let (world, mut engine) = new_game();
    for _ in 0..4 {
        world.counters.record_break_bounce();
    }
    settle(&world, &mut engine);
    assert_eq!(world.flags.phase(), GamePhase::Open);
}

#[test]
fn test_missed_shot_is_foul_and_cue_is_respotted() {
    let (world, mut engine) = new_game();
    world.flags.set_phase(GamePhase::Standard);
    world.flags.set_assignment(GroupAssignment::ASolids);

    settle(&world, &mut engine);

    assert_eq!(world.counters.snapshot().fouls, 1);
    assert_eq!(world.flags.turn(), Player::B);
    assert!(world.flags.foul_pending());
    assert_eq!(world.flags.awaiting(), Awaiting::Respot);
    {
        let table = world.lock();
        assert!(!table.cue().active);
        assert_eq!(table.cue().pos, table.cue().rest);
    }

    engine.handle(&world, Command::Respot { x: 0.4, y: 0.3 });

    let table = world.lock();
    assert!(table.cue().active);
    assert_eq!(table.cue().pos, Vec2::new(0.4, 0.3));
    assert_eq!(table.cue().vel, Vec2::ZERO);
    assert_eq!(world.flags.awaiting(), Awaiting::Nothing);
}

#[test]
fn test_quick_scratch_after_respot_hands_the_ball_over() {
    let (world, mut engine) = new_game();
    world.flags.set_phase(GamePhase::Open);
    settle(&world, &mut engine);
    assert_eq!(world.flags.awaiting(), Awaiting::Respot);
    assert_eq!(world.flags.turn(), Player::B);

    // Inside the table but already in the mouth of pocket 0
    engine.handle(&world, Command::Respot { x: 0.01, y: 0.01 });
    assert!(!world.lock().cue().active);
    assert_eq!(world.flags.awaiting(), Awaiting::Respot);

    engine.handle(&world, Command::Respot { x: 0.12, y: 0.12 });
    assert!(ShotController::ready(&world));
    let fouls = world.counters.snapshot().fouls;

    // The shot drops the cue ball within one physics tick, before any rule sample
    let mut shot = ShotController::new();
    shot.handle(&world, Command::Shoot);
    world.lock().cue_mut().pos = pockets()[0].pos;
    step(&world);
    assert!(!world.lock().cue().active);

    for _ in 0..5 {
        step(&world);
        engine.tick(&world);
    }

    assert!(world.counters.snapshot().fouls > fouls);
    assert_eq!(world.flags.turn(), Player::A);
    assert_eq!(world.flags.awaiting(), Awaiting::Respot);
    engine.handle(&world, Command::Respot { x: 0.4, y: 0.3 });
    assert!(ShotController::ready(&world));
}

/// Player A holds solids and has just cleared all seven
fn eligible_a(declare: i32) -> (World, RuleEngine) {
    let (world, mut engine) = new_game();
    world.flags.set_phase(GamePhase::Standard);
    world.flags.set_assignment(GroupAssignment::ASolids);
    for id in 1..=7 {
        engine.handle(&world, Command::ForceEliminate(id));
    }
    world.counters.record_touch(BallGroup::Solid);
    settle(&world, &mut engine);

    assert!(world.flags.eligible(Player::A));
    assert_eq!(world.flags.turn(), Player::A);
    assert_eq!(world.flags.awaiting(), Awaiting::Declaration);

    engine.handle(&world, Command::CyclePocket(declare));
    engine.handle(&world, Command::ConfirmPocket);
    assert_eq!(world.flags.awaiting(), Awaiting::Nothing);
    (world, engine)
}

/// Drop the eight into pocket `index`
fn sink_eight(world: &World, index: usize) {
    let mouth = pockets()[index].pos;
    let mut table = world.lock();
    table.balls[8].pos = mouth;
    table.balls[8].vel = Vec2::ZERO;
}

#[test]
fn test_eight_in_declared_pocket_wins() {
    let (world, _engine) = eligible_a(2);
    assert_eq!(world.flags.declared_pocket(), 2);
    sink_eight(&world, 2);
    step(&world);
    assert_eq!(world.flags.winner(), Some(Player::A));
}

#[test]
fn test_eight_in_other_pocket_loses() {
    let (world, _engine) = eligible_a(4);
    assert_eq!(world.flags.declared_pocket(), 4);
    sink_eight(&world, 2);
    step(&world);
    assert_eq!(world.flags.winner(), Some(Player::B));
}

#[test]
fn test_reset_restores_start_of_game() {
    let (world, mut engine) = eligible_a(2);
    sink_eight(&world, 2);
    step(&world);
    world.params.restitution.store(0.5);

    engine.handle(&world, Command::Reset);

    assert_eq!(world.flags.winner(), None);
    assert_eq!(world.flags.phase(), GamePhase::Break);
    assert_eq!(world.flags.assignment(), GroupAssignment::Unassigned);
    assert!(!world.flags.eligible(Player::A));
    assert_eq!(world.counters.snapshot().total_pocketed(), 0);
    assert_eq!(world.params.restitution.load(), 0.5);
    let table = world.lock();
    assert_eq!(table.active_balls().count(), N_BALLS);
}
