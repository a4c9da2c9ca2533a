//! Game configuration
//!
//! Task timing, physics tuning and rule thresholds. Loaded from JSON; any
//! missing field falls back to its default.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::sched::{MAX_PRIORITY, SchedPolicy, TaskParams};

/// Timing of the five periodic tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskTable {
    /// Physics tick, must be the highest priority
    pub physics: TaskParams,
    /// Shot controller
    pub shot: TaskParams,
    /// Snapshot consumer
    pub display: TaskParams,
    /// Parameter controller
    pub params: TaskParams,
    /// Rule state machine
    pub rules: TaskParams,
}

impl Default for TaskTable {
    fn default() -> Self {
        Self {
            physics: TaskParams::periodic(40, 90),
            shot: TaskParams::periodic(20, 70),
            display: TaskParams::periodic(50, 50),
            params: TaskParams::periodic(20, 60),
            rules: TaskParams::periodic(200, 80),
        }
    }
}

impl TaskTable {
    /// (name, params) in task-index order
    pub fn entries(&self) -> [(&'static str, TaskParams); 5] {
        [
            ("physics", self.physics),
            ("shot", self.shot),
            ("display", self.display),
            ("params", self.params),
            ("rules", self.rules),
        ]
    }
}

/// A tunable bounded value: initial value, adjustment step, bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tunable {
    pub initial: f32,
    pub step: f32,
    pub min: f32,
    pub max: f32,
}

impl Tunable {
    pub const fn new(initial: f32, step: f32, min: f32, max: f32) -> Self {
        Self {
            initial,
            step,
            min,
            max,
        }
    }

    /// `value` moved by `steps` increments, clamped to the bounds
    pub fn adjust(&self, value: f32, steps: i32) -> f32 {
        (value + self.step * steps as f32).clamp(self.min, self.max)
    }
}

/// Physics tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Per-tick velocity damping `f`, applied as `v *= 1 - f`
    pub friction: Tunable,
    /// Restitution factor for rails and collisions
    pub restitution: Tunable,
    /// Simulated seconds per wall-clock second
    pub time_scale: Tunable,
    /// Shot speed; reset restores the maximum
    pub power: Tunable,
    /// Aim change per unit of directional input, radians
    pub aim_step: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            friction: Tunable::new(0.02, 0.001, 0.0, 0.1),
            restitution: Tunable::new(0.9, 0.01, 0.0, 1.0),
            time_scale: Tunable::new(1.0, 0.1, 0.1, 3.0),
            power: Tunable::new(2.0, 0.01, 0.01, 2.0),
            aim_step: 0.01,
        }
    }
}

/// Rule state machine thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Speed below which a ball counts as still
    pub quiescence_threshold: f32,
    /// Rail contacts required for a valid break
    pub min_break_bounces: u32,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            quiescence_threshold: 1e-3,
            min_break_bounces: 4,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub policy: SchedPolicy,
    pub tasks: TaskTable,
    pub physics: PhysicsConfig,
    pub rules: RulesConfig,
}

impl GameConfig {
    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Load from `path`, falling back to defaults on any failure
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => {
                log::info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("Using default config ({}): {e}", path.display());
                Self::default()
            }
        }
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, task) in self.tasks.entries() {
            if task.period_ms == 0 {
                return Err(invalid("tasks.period_ms", format!("{name}: period is zero")));
            }
            if task.deadline_ms == 0 {
                return Err(invalid(
                    "tasks.deadline_ms",
                    format!("{name}: deadline is zero"),
                ));
            }
            if task.priority > MAX_PRIORITY {
                return Err(invalid(
                    "tasks.priority",
                    format!("{name}: {} above {MAX_PRIORITY}", task.priority),
                ));
            }
        }
        let physics = self.tasks.physics.priority;
        if let Some((name, _)) = self
            .tasks
            .entries()
            .into_iter()
            .skip(1)
            .find(|(_, t)| t.priority >= physics)
        {
            return Err(invalid(
                "tasks.priority",
                format!("{name} must run below the physics task ({physics})"),
            ));
        }

        let p = &self.physics;
        for (field, t) in [
            ("physics.friction", p.friction),
            ("physics.restitution", p.restitution),
            ("physics.time_scale", p.time_scale),
            ("physics.power", p.power),
        ] {
            if !(t.step > 0.0) || t.max < t.step || t.min > t.max {
                return Err(invalid(
                    field,
                    format!("step {} / bounds [{}, {}]", t.step, t.min, t.max),
                ));
            }
            if !(t.min..=t.max).contains(&t.initial) {
                return Err(invalid(field, format!("initial {} out of bounds", t.initial)));
            }
        }
        if p.restitution.min < 0.0 || p.restitution.max > 1.0 {
            return Err(invalid("physics.restitution", "must stay within [0, 1]".into()));
        }
        if p.friction.min < 0.0 || p.friction.max >= 1.0 {
            return Err(invalid("physics.friction", "must stay within [0, 1)".into()));
        }
        if !(self.rules.quiescence_threshold > 0.0) {
            return Err(invalid(
                "rules.quiescence_threshold",
                "must be positive".into(),
            ));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { field, reason }
}
