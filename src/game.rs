//! Game wiring
//!
//! One [`World`] shared by five periodic tasks: physics, shot controller,
//! display, parameter controller and rules. Commands reach the controllers
//! and the rule engine through a [`CommandBus`].

use std::sync::Arc;

use serde::Serialize;

use crate::config::GameConfig;
use crate::error::SchedError;
use crate::input::{Command, CommandBus, Consumer};
use crate::sched::{Scheduler, TaskId};
use crate::sim::{ParamController, RuleEngine, ShotController, World, physics};
use crate::snapshot::{SnapshotSink, TableSnapshot};

/// Task slots in the scheduler table
pub const PHYSICS_TASK: usize = 0;
pub const SHOT_TASK: usize = 1;
pub const DISPLAY_TASK: usize = 2;
pub const PARAMS_TASK: usize = 3;
pub const RULES_TASK: usize = 4;

/// Timing and deadline misses of one task
#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    pub name: &'static str,
    pub period_ms: u64,
    pub deadline_ms: u64,
    pub priority: u8,
    pub misses: u32,
}

/// A running game
pub struct Game {
    scheduler: Scheduler,
    world: Arc<World>,
    bus: Arc<CommandBus>,
    tasks: Vec<(&'static str, TaskId)>,
}

impl Game {
    /// Build the world and start every task.
    ///
    /// Any scheduler error aborts start-up; tasks already running are stopped
    /// and joined before the error is returned.
    pub fn start(config: GameConfig, mut sink: Box<dyn SnapshotSink>) -> Result<Self, SchedError> {
        let world = Arc::new(World::new(&config.physics));
        let bus = Arc::new(CommandBus::new());
        let mut scheduler = Scheduler::new(config.policy);
        let mut tasks = Vec::with_capacity(5);

        let t = &config.tasks;

        let w = Arc::clone(&world);
        tasks.push((
            "physics",
            scheduler.create(PHYSICS_TASK, t.physics, move |ctx| {
                ctx.run(|ctx| physics::tick(&w, ctx.period()))
            })?,
        ));

        let (w, b) = (Arc::clone(&world), Arc::clone(&bus));
        tasks.push((
            "shot",
            scheduler.create(SHOT_TASK, t.shot, move |ctx| {
                let mut shot = ShotController::new();
                ctx.run(|_| {
                    for command in b.queue(Consumer::Shot).drain() {
                        shot.handle(&w, command);
                    }
                })
            })?,
        ));

        let w = Arc::clone(&world);
        tasks.push((
            "display",
            scheduler.create(DISPLAY_TASK, t.display, move |ctx| {
                ctx.run(|_| sink.present(&TableSnapshot::capture(&w)))
            })?,
        ));

        let (w, b) = (Arc::clone(&world), Arc::clone(&bus));
        tasks.push((
            "params",
            scheduler.create(PARAMS_TASK, t.params, move |ctx| {
                let mut params = ParamController::new();
                ctx.run(|_| {
                    for command in b.queue(Consumer::Params).drain() {
                        params.handle(&w, command);
                    }
                })
            })?,
        ));

        let (w, b) = (Arc::clone(&world), Arc::clone(&bus));
        let rules_config = config.rules;
        tasks.push((
            "rules",
            scheduler.create(RULES_TASK, t.rules, move |ctx| {
                let mut rules = RuleEngine::new(rules_config);
                ctx.run(|_| {
                    for command in b.queue(Consumer::Rules).drain() {
                        rules.handle(&w, command);
                    }
                    rules.tick(&w);
                })
            })?,
        ));

        log::info!("game started with {} tasks ({:?})", tasks.len(), config.policy);
        Ok(Self {
            scheduler,
            world,
            bus,
            tasks,
        })
    }

    /// Queue a command for the task that consumes it
    pub fn submit(&self, command: Command) {
        self.bus.submit(command);
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Copy of the table as the display task would see it
    pub fn snapshot(&self) -> TableSnapshot {
        TableSnapshot::capture(&self.world)
    }

    /// Open a deferred task's activation gate
    pub fn activate(&self, index: usize) -> Result<(), SchedError> {
        let (_, id) = self
            .tasks
            .iter()
            .find(|(_, id)| id.index() == index)
            .ok_or(SchedError::UnknownTask(index))?;
        self.scheduler.activate(*id)
    }

    /// Per-task timing and deadline-miss counts
    pub fn task_report(&self) -> Vec<TaskReport> {
        self.tasks
            .iter()
            .filter_map(|&(name, id)| {
                Some(TaskReport {
                    name,
                    period_ms: self.scheduler.period_ms(id).ok()?,
                    deadline_ms: self.scheduler.deadline_ms(id).ok()?,
                    priority: self.scheduler.priority(id).ok()?,
                    misses: self.scheduler.deadline_miss_count(id).ok()?,
                })
            })
            .collect()
    }

    /// Stop and join every task
    pub fn shutdown(mut self) -> Vec<TaskReport> {
        self.scheduler.shutdown();
        self.task_report()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::snapshot::LogSink;

    fn fast_config() -> GameConfig {
        let mut config = GameConfig::default();
        let t = &mut config.tasks;
        t.physics = t.physics.with_period(5);
        t.shot = t.shot.with_period(5);
        t.display = t.display.with_period(10);
        t.params = t.params.with_period(5);
        t.rules = t.rules.with_period(10);
        config
    }

    #[test]
    fn test_start_and_shutdown() {
        let game = Game::start(fast_config(), Box::new(LogSink::default())).unwrap();
        thread::sleep(Duration::from_millis(50));
        let report = game.shutdown();
        let names: Vec<_> = report.iter().map(|r| r.name).collect();
        assert_eq!(names, ["physics", "shot", "display", "params", "rules"]);
        assert_eq!(report[0].priority, 90);
    }

    #[test]
    fn test_shot_moves_the_cue_ball() {
        let game = Game::start(fast_config(), Box::new(LogSink::default())).unwrap();
        game.submit(Command::Shoot);
        thread::sleep(Duration::from_millis(60));
        let snap = game.snapshot();
        assert!(snap.balls[0].pos[0] > crate::consts::CUE_SPOT.0);
        game.shutdown();
    }
}
