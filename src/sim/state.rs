//! Table, ball and pocket data
//!
//! Ball ids follow the rack numbering: 0 is the cue ball, 1..=7 solids,
//! 8 the eight ball, 9..=15 stripes. An inactive ball always sits on its
//! fixed off-table rest coordinate.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Game phase, forward-only except that Break may repeat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum GamePhase {
    /// Opening shot, needs enough rail contacts
    #[default]
    Break = 0,
    /// Groups not yet assigned
    Open = 1,
    /// Groups assigned
    Standard = 2,
}

impl GamePhase {
    pub(crate) fn from_u8(v: u8) -> Self {
        match v {
            1 => GamePhase::Open,
            2 => GamePhase::Standard,
            _ => GamePhase::Break,
        }
    }
}

/// One of the two players
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Player {
    #[default]
    A = 0,
    B = 1,
}

impl Player {
    #[inline]
    pub fn other(self) -> Self {
        match self {
            Player::A => Player::B,
            Player::B => Player::A,
        }
    }

    #[inline]
    pub(crate) fn slot(self) -> usize {
        self as usize
    }

    pub(crate) fn from_u8(v: u8) -> Self {
        if v == 1 { Player::B } else { Player::A }
    }
}

/// Ball group tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum BallGroup {
    Solid = 0,
    Striped = 1,
    /// Cue ball and eight ball
    Neutral = 2,
}

impl BallGroup {
    /// Group of the ball with this rack number
    pub fn of(id: usize) -> Self {
        match id {
            1..=7 => BallGroup::Solid,
            9..=15 => BallGroup::Striped,
            _ => BallGroup::Neutral,
        }
    }

    /// Solid <-> Striped; Neutral maps to itself
    pub fn opposite(self) -> Self {
        match self {
            BallGroup::Solid => BallGroup::Striped,
            BallGroup::Striped => BallGroup::Solid,
            BallGroup::Neutral => BallGroup::Neutral,
        }
    }
}

/// Which group player A owns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum GroupAssignment {
    #[default]
    Unassigned = 0,
    ASolids = 1,
    AStripes = 2,
}

impl GroupAssignment {
    /// Assignment that gives `group` to `player`
    pub fn giving(player: Player, group: BallGroup) -> Self {
        match (player, group) {
            (_, BallGroup::Neutral) => GroupAssignment::Unassigned,
            (Player::A, BallGroup::Solid) | (Player::B, BallGroup::Striped) => {
                GroupAssignment::ASolids
            }
            (Player::A, BallGroup::Striped) | (Player::B, BallGroup::Solid) => {
                GroupAssignment::AStripes
            }
        }
    }

    /// Group owned by `player`, if assigned
    pub fn group_of(self, player: Player) -> Option<BallGroup> {
        let a_group = match self {
            GroupAssignment::Unassigned => return None,
            GroupAssignment::ASolids => BallGroup::Solid,
            GroupAssignment::AStripes => BallGroup::Striped,
        };
        Some(match player {
            Player::A => a_group,
            Player::B => a_group.opposite(),
        })
    }

    /// Player owning `group`, if assigned
    pub fn owner_of(self, group: BallGroup) -> Option<Player> {
        [Player::A, Player::B]
            .into_iter()
            .find(|p| self.group_of(*p) == Some(group))
    }

    pub(crate) fn from_u8(v: u8) -> Self {
        match v {
            1 => GroupAssignment::ASolids,
            2 => GroupAssignment::AStripes,
            _ => GroupAssignment::Unassigned,
        }
    }
}

/// Input the rule machine is waiting for before play resumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Awaiting {
    #[default]
    Nothing = 0,
    /// Cue ball in hand after a foul
    Respot = 1,
    /// Eligible player must choose the pocket for the eight
    Declaration = 2,
}

impl Awaiting {
    pub(crate) fn from_u8(v: u8) -> Self {
        match v {
            1 => Awaiting::Respot,
            2 => Awaiting::Declaration,
            _ => Awaiting::Nothing,
        }
    }
}

/// Bounded circular history of past positions
#[derive(Debug, Clone)]
pub struct Trail {
    points: [Vec2; TRAIL_LENGTH],
    top: usize,
    len: usize,
}

impl Trail {
    pub fn new() -> Self {
        Self {
            points: [Vec2::ZERO; TRAIL_LENGTH],
            top: 0,
            len: 0,
        }
    }

    /// Record a position, overwriting the oldest once full
    pub fn record(&mut self, pos: Vec2) {
        self.top = (self.top + 1) % TRAIL_LENGTH;
        if let Some(slot) = self.points.get_mut(self.top) {
            *slot = pos;
        }
        self.len = (self.len + 1).min(TRAIL_LENGTH);
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Positions, newest first
    pub fn iter(&self) -> impl Iterator<Item = Vec2> + '_ {
        (0..self.len).filter_map(move |k| {
            let idx = (self.top + TRAIL_LENGTH - k) % TRAIL_LENGTH;
            self.points.get(idx).copied()
        })
    }
}

impl Default for Trail {
    fn default() -> Self {
        Self::new()
    }
}

/// A ball on (or parked beside) the table
#[derive(Debug, Clone)]
pub struct Ball {
    pub id: u8,
    pub pos: Vec2,
    pub vel: Vec2,
    pub group: BallGroup,
    pub active: bool,
    /// Phase in which the ball was pocketed, `None` if never
    pub pocketed_in: Option<GamePhase>,
    /// Fixed off-table rest coordinate
    pub rest: Vec2,
    pub trail: Trail,
}

impl Ball {
    pub fn new(id: u8, pos: Vec2) -> Self {
        Self {
            id,
            pos,
            vel: Vec2::ZERO,
            group: BallGroup::of(id as usize),
            active: true,
            pocketed_in: None,
            rest: rest_position(id as usize),
            trail: Trail::new(),
        }
    }

    #[inline]
    pub fn is_cue(&self) -> bool {
        self.id == 0
    }

    #[inline]
    pub fn is_eight(&self) -> bool {
        self.id == 8
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.vel.length()
    }

    /// Take the ball off the table onto its rest coordinate
    pub fn park(&mut self) {
        self.active = false;
        self.pos = self.rest;
        self.vel = Vec2::ZERO;
        self.trail.clear();
    }

    /// Put the ball back in play at `pos`, at rest
    pub fn place(&mut self, pos: Vec2) {
        self.active = true;
        self.pos = pos;
        self.vel = Vec2::ZERO;
        self.trail.clear();
    }
}

/// A pocket mouth
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pocket {
    pub pos: Vec2,
}

/// Six pockets, clockwise from the upper-left corner
pub fn pockets() -> [Pocket; N_POCKETS] {
    let p = |x: f32, y: f32| Pocket { pos: Vec2::new(x, y) };
    [
        p(-POCKET_OFFSET, -POCKET_OFFSET),
        p(TABLE_LX / 2.0, -POCKET_OFFSET),
        p(TABLE_LX + POCKET_OFFSET, -POCKET_OFFSET),
        p(TABLE_LX + POCKET_OFFSET, TABLE_LY + POCKET_OFFSET),
        p(TABLE_LX / 2.0, TABLE_LY + POCKET_OFFSET),
        p(-POCKET_OFFSET, TABLE_LY + POCKET_OFFSET),
    ]
}

/// Off-table parking spot: solids then the eight in one column, stripes then the cue in the next
pub fn rest_position(id: usize) -> Vec2 {
    let (x0, y0) = REST_ORIGIN;
    let d = BALL_DIAMETER;
    let (col, row) = match id {
        1..=8 => (0.0, (id - 1) as f32),
        9..=15 => (1.0, (id - 9) as f32),
        _ => (1.0, 7.0),
    };
    Vec2::new(x0 + col * 2.0 * d, y0 + row * 2.0 * d)
}

/// Rack offsets in (row step, half-spacing) units, indexed by ball id - 1
const RACK_LAYOUT: [(f32, f32); 15] = [
    (0.0, 0.0),
    (1.0, 1.0),
    (2.0, 2.0),
    (3.0, 3.0),
    (4.0, -4.0),
    (4.0, 0.0),
    (3.0, -1.0),
    (2.0, 0.0),
    (1.0, -1.0),
    (2.0, -2.0),
    (3.0, -3.0),
    (4.0, 4.0),
    (4.0, -2.0),
    (3.0, 1.0),
    (4.0, 2.0),
];

/// Start position of ball `id` in the break formation
pub fn rack_position(id: usize) -> Vec2 {
    if id == 0 {
        return Vec2::new(CUE_SPOT.0, CUE_SPOT.1);
    }
    let row_step = RACK_SPACING * 3.0_f32.sqrt() * BALL_DIAMETER / 2.0;
    let half = RACK_SPACING * BALL_DIAMETER / 2.0;
    let (rows, halves) = RACK_LAYOUT.get(id - 1).copied().unwrap_or((0.0, 0.0));
    Vec2::new(RACK_APEX.0 + rows * row_step, RACK_APEX.1 + halves * half)
}

/// Ball table and pocket table; everything the physics lock protects
#[derive(Debug, Clone)]
pub struct Table {
    pub balls: [Ball; N_BALLS],
    pub pockets: [Pocket; N_POCKETS],
}

impl Table {
    /// Table in the break formation
    pub fn new() -> Self {
        Self {
            balls: std::array::from_fn(|id| Ball::new(id as u8, rack_position(id))),
            pockets: pockets(),
        }
    }

    /// Re-rack every ball, all still and active
    pub fn rerack(&mut self) {
        for (id, ball) in self.balls.iter_mut().enumerate() {
            ball.place(rack_position(id));
            ball.pocketed_in = None;
        }
    }

    pub fn cue(&self) -> &Ball {
        &self.balls[0]
    }

    pub fn cue_mut(&mut self) -> &mut Ball {
        &mut self.balls[0]
    }

    pub fn eight(&self) -> &Ball {
        &self.balls[8]
    }

    pub fn active_balls(&self) -> impl Iterator<Item = &Ball> {
        self.balls.iter().filter(|b| b.active)
    }

    /// True iff every active ball is slower than `threshold`
    pub fn is_quiescent(&self, threshold: f32) -> bool {
        self.active_balls().all(|b| b.speed() < threshold)
    }

    /// Group of the highest-numbered ball pocketed during `phase`
    pub fn last_pocketed_group(&self, phase: GamePhase) -> Option<BallGroup> {
        self.balls
            .iter()
            .rev()
            .find(|b| !b.active && b.pocketed_in == Some(phase) && b.group != BallGroup::Neutral)
            .map(|b| b.group)
    }
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}
