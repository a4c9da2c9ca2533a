//! Pool RT headless demo
//!
//! Starts the periodic tasks and lets a seeded random player take every shot
//! until someone wins or the time limit runs out, then prints the
//! deadline-miss report.
//!
//! Usage: `pool-rt [config.json] [seconds] [seed]`

use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use pool_rt::consts::{BALL_DIAMETER, N_POCKETS, TABLE_LX, TABLE_LY};
use pool_rt::sim::{Awaiting, BallGroup};
use pool_rt::snapshot::{LogSink, TableSnapshot};
use pool_rt::{Command, Game, GameConfig};

/// How often the demo player looks at the table
const POLL: Duration = Duration::from_millis(100);

fn main() -> ExitCode {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => GameConfig::load_or_default(path),
        None => GameConfig::default(),
    };
    let limit = Duration::from_secs(args.next().and_then(|s| s.parse().ok()).unwrap_or(120));
    let seed = args.next().and_then(|s| s.parse().ok()).unwrap_or(7);

    log::info!("Pool RT (headless) starting: seed {seed}, limit {limit:?}");

    let game = match Game::start(config, Box::new(LogSink::default())) {
        Ok(game) => game,
        Err(e) => {
            log::error!("start-up failed [{}]: {e}", e.as_label());
            eprintln!("pool-rt: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut rng = Pcg32::seed_from_u64(seed);
    let started = Instant::now();
    let mut shots = 0u32;

    while started.elapsed() < limit {
        thread::sleep(POLL);
        let snap = game.snapshot();

        if let Some(winner) = snap.winner {
            println!("Player {winner:?} wins after {shots} shots");
            break;
        }

        match snap.awaiting {
            Awaiting::Respot => {
                let x = rng.random_range(BALL_DIAMETER..TABLE_LX / 2.0);
                let y = rng.random_range(BALL_DIAMETER..TABLE_LY - BALL_DIAMETER);
                game.submit(Command::Respot { x, y });
            }
            Awaiting::Declaration => {
                game.submit(Command::CyclePocket(rng.random_range(0..N_POCKETS as i32)));
                game.submit(Command::ConfirmPocket);
            }
            Awaiting::Nothing if snap.quiescent && snap.balls[0].is_active() => {
                for command in plan_shot(&snap, &mut rng) {
                    game.submit(command);
                }
                shots += 1;
                // Let the shot start before sampling again
                thread::sleep(POLL);
            }
            Awaiting::Nothing => {}
        }
    }

    let report = game.shutdown();
    println!("\n{:<8} {:>7} {:>9} {:>5} {:>7}", "task", "period", "deadline", "prio", "misses");
    for task in &report {
        println!(
            "{:<8} {:>5}ms {:>7}ms {:>5} {:>7}",
            task.name, task.period_ms, task.deadline_ms, task.priority, task.misses
        );
    }
    ExitCode::SUCCESS
}

/// Aim at a random legal-looking target with a random power
fn plan_shot(snap: &TableSnapshot, rng: &mut Pcg32) -> Vec<Command> {
    let cue = Vec2::from_array(snap.balls[0].pos);
    // The eight is the only Neutral ball left once the cue is skipped
    let wanted = if snap.eligible[snap.turn as usize] {
        Some(BallGroup::Neutral)
    } else {
        snap.assignment.group_of(snap.turn)
    };

    let targets: Vec<Vec2> = snap
        .balls
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(id, b)| {
            b.is_active()
                && match wanted {
                    Some(group) => BallGroup::of(*id) == group,
                    None => true,
                }
        })
        .map(|(_, b)| Vec2::from_array(b.pos))
        .collect();

    let mut commands = Vec::with_capacity(3);
    if !targets.is_empty() {
        let target = targets[rng.random_range(0..targets.len())];
        let jitter = Vec2::new(rng.random_range(-0.01..0.01), rng.random_range(-0.01..0.01));
        let dir = target + jitter - cue;
        commands.push(Command::Aim {
            dx: dir.x,
            dy: dir.y,
        });
    }
    commands.push(Command::AdjustPower(rng.random_range(-60..=60)));
    commands.push(Command::Shoot);
    commands
}
