//! Shot and parameter controllers
//!
//! Translate discrete commands into cue-ball impulses and tunable changes.
//! Anything arriving while the table is not ready for it is dropped.

use super::state::Awaiting;
use super::world::World;
use crate::input::{Command, Param};
use crate::unit;

/// Aim, power and shoot
#[derive(Debug, Default)]
pub struct ShotController {
    shots: u32,
}

impl ShotController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shots taken so far
    pub fn shots(&self) -> u32 {
        self.shots
    }

    /// Still table, cue ball in play, no pending input, game not over
    pub fn ready(world: &World) -> bool {
        let flags = &world.flags;
        flags.quiescent()
            && flags.awaiting() == Awaiting::Nothing
            && flags.winner().is_none()
            && world.lock().cue().active
    }

    pub fn handle(&mut self, world: &World, command: Command) {
        if !Self::ready(world) {
            return;
        }
        let config = world.physics_config();
        let params = &world.params;
        match command {
            Command::Shoot => {
                let velocity = unit(params.aim.load()) * params.shot_speed.load();
                let mut table = world.lock();
                table.cue_mut().vel = velocity;
                // Motion starts now; the rule task confirms on its next sample
                world.flags.set_quiescent(false);
                drop(table);
                self.shots += 1;
                log::debug!(
                    "shot {} by {:?}: speed {:.2}, angle {:.3}",
                    self.shots,
                    world.flags.turn(),
                    params.shot_speed.load(),
                    params.aim.load()
                );
            }
            Command::Aim { dx, dy } => {
                if dx.is_finite() && dy.is_finite() && (dx != 0.0 || dy != 0.0) {
                    params.aim.store(dy.atan2(dx));
                }
            }
            Command::Rotate(steps) => {
                let angle = params.aim.load() + config.aim_step * steps as f32;
                params.aim.store(angle.rem_euclid(std::f32::consts::TAU));
            }
            Command::AdjustPower(steps) => {
                let speed = config.power.adjust(params.shot_speed.load(), steps);
                params.shot_speed.store(speed);
            }
            _ => {}
        }
    }
}

/// Friction, restitution, time scale and the trail switch
#[derive(Debug, Default)]
pub struct ParamController;

impl ParamController {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&mut self, world: &World, command: Command) {
        if !world.flags.quiescent() {
            return;
        }
        let config = world.physics_config();
        let params = &world.params;
        match command {
            Command::AdjustParam(param, steps) => {
                let (cell, bounds) = match param {
                    Param::Friction => (&params.friction, &config.friction),
                    Param::Restitution => (&params.restitution, &config.restitution),
                    Param::TimeScale => (&params.time_scale, &config.time_scale),
                };
                let value = bounds.adjust(cell.load(), steps);
                cell.store(value);
                log::debug!("{param:?} = {value:.3}");
            }
            Command::ToggleTrail => {
                let on = world.flags.toggle_trail();
                log::debug!("trails {}", if on { "on" } else { "off" });
            }
            _ => {}
        }
    }
}
