//! Arc center solving and sweep-angle geometry for [`ARC_CW`](super::BlockType::ArcCw)
//! and [`ARC_CCW`](super::BlockType::ArcCcw) blocks.
//!
//! Solves the inverse of G-code arc emission: given I/J/R words plus start
//! and target points, recovers the arc center and a signed sweep angle
//! rather than emitting the words from a known center.

use crate::error::{CncError, CncResult};
use crate::point::Point;
use std::f64::consts::PI;

/// Resolved arc geometry in the XY plane, plus the Z handled linearly by the
/// caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcGeometry {
    pub center_x: f64,
    pub center_y: f64,
    pub radius: f64,
    pub theta0: f64,
    pub dtheta: f64,
}

impl ArcGeometry {
    /// 3D arc length: hypot of the Z rise and the planar arc length.
    pub fn length(&self, dz: f64) -> f64 {
        (dz * dz + (self.dtheta.abs() * self.radius).powi(2)).sqrt()
    }
}

/// Solves the I,J form: center = start + (i, j).
pub fn solve_ijk(
    block_n: u64,
    start: &Point,
    target: &Point,
    i: f64,
    j: f64,
    clockwise: bool,
    machine_error: f64,
) -> CncResult<ArcGeometry> {
    let center_x = start.x() + i;
    let center_y = start.y() + j;
    let radius = i.hypot(j);

    let r_target = (target.x() - center_x).hypot(target.y() - center_y);
    let diff = (r_target - radius).abs();
    if diff > machine_error {
        return Err(CncError::ArcMismatch(block_n, diff));
    }

    let (theta0, dtheta) = sweep(start, target, center_x, center_y, clockwise);
    Ok(ArcGeometry {
        center_x,
        center_y,
        radius,
        theta0,
        dtheta,
    })
}

/// Solves the R form via the perpendicular-bisector construction, selecting
/// one of the two equidistant centers with the sign table:
/// R>0 on CW is "+", R>0 on CCW is "-"; R<0 inverts both.
pub fn solve_r(
    block_n: u64,
    start: &Point,
    target: &Point,
    r: f64,
    clockwise: bool,
    machine_error: f64,
) -> CncResult<ArcGeometry> {
    let dx = target.x() - start.x();
    let dy = target.y() - start.y();
    let d = dx.hypot(dy);
    let radius = r.abs();

    if d < machine_error {
        return Err(CncError::ArcMismatch(block_n, d));
    }
    let half = d / 2.0;
    if radius < half {
        return Err(CncError::ArcMismatch(block_n, half - radius));
    }
    let h = (radius * radius - half * half).sqrt();

    let mid_x = (start.x() + target.x()) / 2.0;
    let mid_y = (start.y() + target.y()) / 2.0;
    // unit vector rotated +90 deg CCW from (dx, dy)
    let perp_x = -dy / d;
    let perp_y = dx / d;

    let positive = r > 0.0;
    let plus_branch = match (positive, clockwise) {
        (true, true) => true,
        (true, false) => false,
        (false, true) => false,
        (false, false) => true,
    };

    let (center_x, center_y) = if plus_branch {
        (mid_x + h * perp_x, mid_y + h * perp_y)
    } else {
        (mid_x - h * perp_x, mid_y - h * perp_y)
    };

    let (theta0, dtheta) = sweep(start, target, center_x, center_y, clockwise);
    Ok(ArcGeometry {
        center_x,
        center_y,
        radius,
        theta0,
        dtheta,
    })
}

/// theta0 = atan2(y0-yc, x0-xc); raw = atan2(yf-yc, xf-xc) - theta0;
/// normalised into (0, 2*PI); then complemented by -2*PI for clockwise arcs.
fn sweep(start: &Point, target: &Point, center_x: f64, center_y: f64, clockwise: bool) -> (f64, f64) {
    let theta0 = (start.y() - center_y).atan2(start.x() - center_x);
    let theta_f = (target.y() - center_y).atan2(target.x() - center_x);

    let mut dtheta = (theta_f - theta0).rem_euclid(2.0 * PI);
    if dtheta.abs() < 1e-12 {
        dtheta = 2.0 * PI;
    }
    if clockwise {
        dtheta -= 2.0 * PI;
    }
    (theta0, dtheta)
}
