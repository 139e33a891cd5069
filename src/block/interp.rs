//! Time parameterisation: curvilinear abscissa `lambda(t)` and path
//! interpolation `interpolate(lambda)`.

use super::arc::ArcGeometry;
use super::profile::Profile;
use crate::point::Point;

/// Evaluates the profile at elapsed time `t` (seconds since the block
/// started). Returns `(lambda, feed_mm_min)`; `lambda` is clamped to
/// `[0, 1]` and is 1 for any `t >= dt`.
pub fn lambda(profile: &Profile, t: f64) -> (f64, f64) {
    if t < 0.0 {
        return (0.0, 0.0);
    }
    if t >= profile.dt {
        return (1.0, 0.0);
    }

    let (s, v) = if t < profile.dt1 {
        (0.5 * profile.a_plus * t * t, profile.a_plus * t)
    } else if t < profile.dt1 + profile.dtm {
        let tau = t - profile.dt1;
        (
            profile.feed * profile.dt1 / 2.0 + profile.feed * tau,
            profile.feed,
        )
    } else {
        let t2 = profile.dt1 + profile.dtm;
        let tau = t - t2;
        let s = profile.feed * profile.dt1 / 2.0
            + profile.feed * profile.dtm
            + profile.feed * tau
            + 0.5 * profile.a_minus * tau * tau;
        let v = profile.feed + profile.a_minus * tau;
        (s, v)
    };

    let lam = if profile.length > 0.0 {
        (s / profile.length).clamp(0.0, 1.0)
    } else {
        1.0
    };
    (lam, v * 60.0)
}

/// Linear interpolation: `p = start + delta * lambda`.
pub fn interpolate_line(start: &Point, delta: &Point, lam: f64) -> Point {
    let mut out = Point::zero();
    out.set_xyz(
        start.x() + delta.x() * lam,
        start.y() + delta.y() * lam,
        start.z() + delta.z() * lam,
    );
    out
}

/// Arc interpolation: planar position follows the arc, Z is linear.
pub fn interpolate_arc(geom: &ArcGeometry, start_z: f64, dz: f64, lam: f64) -> Point {
    let theta = geom.theta0 + geom.dtheta * lam;
    let mut out = Point::zero();
    out.set_xyz(
        geom.center_x + geom.radius * theta.cos(),
        geom.center_y + geom.radius * theta.sin(),
        start_z + dz * lam,
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::profile::Profile;

    #[test]
    fn lambda_is_zero_before_start() {
        let p = Profile::compute(100.0, 1000.0, 100.0, 0.005);
        let (lam, v) = lambda(&p, -1.0);
        assert_eq!(lam, 0.0);
        assert_eq!(v, 0.0);
    }

    #[test]
    fn lambda_is_one_past_duration() {
        let p = Profile::compute(100.0, 1000.0, 100.0, 0.005);
        let (lam, v) = lambda(&p, p.dt + 1.0);
        assert_eq!(lam, 1.0);
        assert_eq!(v, 0.0);
    }

    #[test]
    fn lambda_reaches_one_at_exact_duration_boundary() {
        let p = Profile::compute(100.0, 1000.0, 100.0, 0.005);
        let (lam, _) = lambda(&p, p.dt - 1e-9);
        assert!(lam > 0.999);
    }

    #[test]
    fn lambda_is_monotone_non_decreasing() {
        let p = Profile::compute(100.0, 1000.0, 100.0, 0.005);
        let mut prev = 0.0;
        let mut t = 0.0;
        while t <= p.dt + 0.01 {
            let (lam, _) = lambda(&p, t);
            assert!(lam + 1e-9 >= prev);
            prev = lam;
            t += p.dt / 200.0;
        }
    }

    #[test]
    fn interpolate_line_at_lambda_zero_and_one() {
        let mut start = Point::zero();
        start.set_xyz(0.0, 0.0, 0.0);
        let mut delta = Point::zero();
        delta.set_xyz(100.0, 0.0, 0.0);
        let p0 = interpolate_line(&start, &delta, 0.0);
        let p1 = interpolate_line(&start, &delta, 1.0);
        assert_eq!((p0.x(), p0.y(), p0.z()), (0.0, 0.0, 0.0));
        assert_eq!((p1.x(), p1.y(), p1.z()), (100.0, 0.0, 0.0));
    }
}
