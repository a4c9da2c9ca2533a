//! Ball-ball collision response
//!
//! Velocities are split along the line of centres. Tangential components pass
//! through untouched; the normal pair goes through a partially inelastic
//! exchange bounded by the restitution factor.

use glam::Vec2;

use super::state::Ball;
use crate::consts::{BALL_DIAMETER, NORMAL_EPSILON};

/// Geometry of one overlapping pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Unit vector from the second ball's centre toward the first's
    pub normal: Vec2,
    /// How far the balls interpenetrate
    pub overlap: f32,
}

/// Overlap between balls centred at `pi` and `pj`, if any.
///
/// Coincident centres get the canonical normal +x.
pub fn contact(pi: Vec2, pj: Vec2) -> Option<Contact> {
    let delta = pi - pj;
    let d = delta.length();
    if d >= BALL_DIAMETER {
        return None;
    }
    let normal = if d < NORMAL_EPSILON {
        Vec2::X
    } else {
        delta / d
    };
    Some(Contact {
        normal,
        overlap: BALL_DIAMETER - d,
    })
}

/// Partially inelastic exchange of normal velocities.
///
/// With `S = a + b` and `K = (2·dump² − 1)(a² + b²) − 2ab`, returns
/// `(S/2 + A, S/2 − A)` where `A = ½√K` for positive `K` and zero otherwise.
/// Momentum is conserved and the separation speed `2A` never exceeds
/// `dump · |a − b|`.
pub fn exchange_normal(a: f32, b: f32, dump: f32) -> (f32, f32) {
    let s = a + b;
    let k = (2.0 * dump * dump - 1.0) * (a * a + b * b) - 2.0 * a * b;
    let half = if k > 0.0 { 0.5 * k.sqrt() } else { 0.0 };
    (0.5 * s + half, 0.5 * s - half)
}

/// Separate and bounce two balls if they overlap. Returns true on contact.
pub fn resolve_pair(bi: &mut Ball, bj: &mut Ball, dump: f32) -> bool {
    let Some(Contact { normal: n, overlap }) = contact(bi.pos, bj.pos) else {
        return false;
    };

    bi.pos += n * (overlap / 2.0);
    bj.pos -= n * (overlap / 2.0);

    let t = n.perp();
    let (vni, vti) = (bi.vel.dot(n), bi.vel.dot(t));
    let (vnj, vtj) = (bj.vel.dot(n), bj.vel.dot(t));
    let (vni, vnj) = exchange_normal(vni, vnj, dump);

    bi.vel = n * vni + t * vti;
    bj.vel = n * vnj + t * vtj;
    true
}
