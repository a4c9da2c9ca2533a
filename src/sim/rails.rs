//! Cushions, corner funnels and pocket capture
//!
//! The playable field is `[0, LX] x [0, LY]`. Each straight cushion is open
//! only between the pocket gaps; inside a gap near a corner a short diagonal
//! funnel redirects the ball toward the pocket mouth instead.

use glam::Vec2;

use super::state::{Ball, Pocket};
use crate::consts::{BALL_RADIUS, CAPTURE_RADIUS, POCKET_GAP, TABLE_LX, TABLE_LY};

const R: f32 = BALL_RADIUS;
const HP: f32 = POCKET_GAP;
const LX: f32 = TABLE_LX;
const LY: f32 = TABLE_LY;

#[inline]
fn open(v: f32, lo: f32, hi: f32) -> bool {
    v > lo && v < hi
}

/// Span of a short (vertical) cushion, between the corner gaps
#[inline]
fn on_side_span(y: f32) -> bool {
    open(y, HP - R, LY - HP + R)
}

/// Spans of a long (horizontal) cushion, either side of the middle pocket
#[inline]
fn on_long_span(x: f32) -> bool {
    open(x, HP - R, LX / 2.0 - HP + R) || open(x, LX / 2.0 + HP - R, LX - HP + R)
}

/// Reflect off the straight cushions. Returns the number of cushions hit.
pub fn bounce_cushions(ball: &mut Ball, dump: f32) -> u32 {
    let mut hits = 0;
    let p = ball.pos;

    if on_side_span(p.y) {
        if p.x < R {
            ball.pos.x = R;
            ball.vel.x = -dump * ball.vel.x;
            hits += 1;
        } else if p.x > LX - R {
            ball.pos.x = LX - R;
            ball.vel.x = -dump * ball.vel.x;
            hits += 1;
        }
    }

    if on_long_span(p.x) {
        if p.y < R {
            ball.pos.y = R;
            ball.vel.y = -dump * ball.vel.y;
            hits += 1;
        } else if p.y > LY - R {
            ball.pos.y = LY - R;
            ball.vel.y = -dump * ball.vel.y;
            hits += 1;
        }
    }

    hits
}

/// Swap and scale the velocity components; `sign` selects the diagonal
#[inline]
fn swap_velocity(v: Vec2, dump: f32, sign: f32) -> Vec2 {
    Vec2::new(sign * dump * v.y, sign * dump * v.x)
}

/// Redirect along a corner funnel's diagonal. Velocity only; position untouched.
///
/// Returns true if a funnel fired.
pub fn steer_funnels(ball: &mut Ball, dump: f32) -> bool {
    let Vec2 { x, y } = ball.pos;

    // Upper-left: diagonal x = y
    let upper_left = (y < R && x < HP && x > y + HP - R) || (x < R && y < HP && x < y - HP + R);
    // Lower-left: diagonal x = LY - y
    let lower_left = (x < R && y > LY - HP && x < -y + LY - HP + R)
        || (y > LY - R && x < HP && x > -y + LY + HP - R);
    // Upper-right: diagonal x = LX - y
    let upper_right = (x > LX - R && y < HP && x > -y + LX + HP - R)
        || (y < R && x > LX - HP && x < -y + LX - HP + R);
    // Lower-right: diagonal x = y + LX - LY
    let lower_right = (y > LY - R && x > LX - HP && x < y + LX - LY - HP + R)
        || (x > LX - R && y > LY - HP && x > y + LX - LY + HP - R);

    let sign = if upper_left || lower_right {
        1.0
    } else if lower_left || upper_right {
        -1.0
    } else {
        return false;
    };
    ball.vel = swap_velocity(ball.vel, dump, sign);
    true
}

/// Index of the first pocket whose centre is within the capture radius of `pos`
pub fn captured_by(pos: Vec2, pockets: &[Pocket]) -> Option<usize> {
    pockets
        .iter()
        .position(|p| pos.distance(p.pos) < CAPTURE_RADIUS)
}
