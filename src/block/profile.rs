//! Trapezoidal/triangular velocity-profile computation for a single block.
//!
//! The profile is computed once, at parse time, from the block's resolved
//! length and feed; [`super::Block::lambda`] then walks it at run time.

/// Velocity-profile record for one block: acceleration/cruise/deceleration
/// phase durations, feed, and the quantised total duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Profile {
    /// Acceleration phase rate (mm/s^2, positive).
    pub a_plus: f64,
    /// Deceleration phase rate (mm/s^2, negative).
    pub a_minus: f64,
    /// Cruise feed, mm/s.
    pub feed: f64,
    /// Path length, mm.
    pub length: f64,
    pub dt1: f64,
    pub dtm: f64,
    pub dt2: f64,
    /// Quantised total duration, an integer multiple of `t_q`.
    pub dt: f64,
}

impl Profile {
    /// Computes the profile for a move of `length` mm at `feed_mm_min`
    /// mm/min bounded by acceleration `accel` mm/s^2, quantised to cycle
    /// time `t_q` seconds.
    pub fn compute(length: f64, feed_mm_min: f64, accel: f64, t_q: f64) -> Profile {
        let f = feed_mm_min / 60.0;

        let dt1_prov = f / accel;
        let dt2_prov = f / accel;
        let dtm_prov = length / f - (dt1_prov + dt2_prov) / 2.0;

        if dtm_prov > 0.0 {
            let raw_total = dt1_prov + dtm_prov + dt2_prov;
            let dt = (raw_total / t_q).ceil() * t_q;
            let dq = dt - raw_total;
            let dtm = dtm_prov + dq;
            let feed = 2.0 * length / (dt1_prov + dt2_prov + 2.0 * dtm);
            Profile {
                a_plus: feed / dt1_prov,
                a_minus: -feed / dt2_prov,
                feed,
                length,
                dt1: dt1_prov,
                dtm,
                dt2: dt2_prov,
                dt,
            }
        } else {
            let dt1 = (length / accel).sqrt();
            let dt2_prov = dt1;
            let raw_total = dt1 + dt2_prov;
            let dt = (raw_total / t_q).ceil() * t_q;
            let dq = dt - raw_total;
            let dt2 = dt2_prov + dq;
            let feed = 2.0 * length / (dt1 + dt2);
            Profile {
                a_plus: feed / dt1,
                a_minus: -feed / dt2,
                feed,
                length,
                dt1,
                dtm: 0.0,
                dt2,
                dt,
            }
        }
    }
}
