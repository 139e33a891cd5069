//! Word tokenizer and modal-inheritance dispatch for one G-code line.

use super::arc as arc_geom;
use super::profile::Profile;
use super::{Block, BlockType};
use crate::error::{CncError, CncResult};
use crate::machine::config::MachineConfig;
use crate::point::{self, Point};

enum FeedWord {
    Value(f64),
    Max,
}

#[derive(Default)]
struct Words {
    n: Option<u64>,
    g: Option<u8>,
    x: Option<f64>,
    y: Option<f64>,
    z: Option<f64>,
    i: Option<f64>,
    j: Option<f64>,
    r: Option<f64>,
    f: Option<FeedWord>,
    s: Option<f64>,
    t: Option<u32>,
}

/// Parses one whitespace-separated G-code line, resolving modal state from
/// `prev` and kinematic limits from `cfg`.
pub fn parse_line(line: &str, prev: Option<&Block>, cfg: &MachineConfig) -> CncResult<Block> {
    let line = line.trim();
    let mut n_hint = prev.map(|b| b.n()).unwrap_or(0);
    for tok in line.split_whitespace() {
        if let Some(c) = tok.chars().next() {
            if c.to_ascii_uppercase() == 'N' {
                if let Ok(v) = tok[c.len_utf8()..].parse::<u64>() {
                    n_hint = v;
                }
            }
        }
    }

    let mut words = Words::default();
    let mut word_errors = 0u32;
    for tok in line.split_whitespace() {
        let mut chars = tok.chars();
        let Some(letter) = chars.next() else { continue };
        let letter = letter.to_ascii_uppercase();
        let rest = &tok[letter.len_utf8()..];
        match letter {
            'N' => words.n = rest.parse().ok(),
            'G' => words.g = rest.parse().ok(),
            'X' => words.x = rest.parse().ok(),
            'Y' => words.y = rest.parse().ok(),
            'Z' => words.z = rest.parse().ok(),
            'I' => words.i = rest.parse().ok(),
            'J' => words.j = rest.parse().ok(),
            'R' => words.r = rest.parse().ok(),
            'F' => {
                words.f = if rest.eq_ignore_ascii_case("MAX") {
                    Some(FeedWord::Max)
                } else {
                    rest.parse().ok().map(FeedWord::Value)
                };
            }
            'S' => words.s = rest.parse().ok(),
            'T' => words.t = rest.parse().ok(),
            other => {
                word_errors += 1;
                let err = CncError::GCodeUnknownWord {
                    block: n_hint,
                    letter: other,
                };
                tracing::warn!(%err, "parsing continues");
            }
        }
    }

    if (words.i.is_some() || words.j.is_some()) && words.r.is_some() {
        return Err(CncError::GCodeMixedArc(n_hint));
    }

    let n = words.n.unwrap_or(n_hint);
    let tool = words.t.unwrap_or_else(|| prev.map(|b| b.tool()).unwrap_or(0));
    let spindle = words.s.unwrap_or_else(|| prev.map(|b| b.spindle()).unwrap_or(0.0));

    let feed_mm_min = match words.f {
        Some(FeedWord::Max) => cfg.f_max(),
        Some(FeedWord::Value(v)) => v.min(cfg.f_max()),
        None => prev.map(|b| b.feed()).unwrap_or(0.0),
    };

    let start = prev.map(|b| *b.target()).unwrap_or_else(|| cfg.zero());

    let mut target = Point::zero();
    if let Some(x) = words.x {
        target.set_x(x);
    }
    if let Some(y) = words.y {
        target.set_y(y);
    }
    if let Some(z) = words.z {
        target.set_z(z);
    }
    point::modal(&start, &mut target);

    let mut delta = Point::zero();
    point::delta(&start, &target, &mut delta);
    let chord_length = point::dist(&start, &target);

    let block_type = match words.g {
        Some(0) => BlockType::Rapid,
        Some(1) => BlockType::Line,
        Some(2) => BlockType::ArcCw,
        Some(3) => BlockType::ArcCcw,
        _ => BlockType::NoMotion,
    };

    let mut arc = None;
    let mut profile = None;
    let mut length = chord_length;

    match block_type {
        BlockType::Line => {
            profile = Some(Profile::compute(
                chord_length,
                feed_mm_min,
                cfg.accel(),
                cfg.cycle_time(),
            ));
        }
        BlockType::ArcCw | BlockType::ArcCcw => {
            let clockwise = block_type == BlockType::ArcCw;
            let geom = if let Some(r) = words.r {
                arc_geom::solve_r(n, &start, &target, r, clockwise, cfg.max_error())?
            } else {
                let i = words.i.unwrap_or(0.0);
                let j = words.j.unwrap_or(0.0);
                arc_geom::solve_ijk(n, &start, &target, i, j, clockwise, cfg.max_error())?
            };

            // f' = min(F, sqrt(A/2 * r) * 60)
            let arc_feed_cap = (cfg.accel() / 2.0 * geom.radius).sqrt() * 60.0;
            let effective_feed = feed_mm_min.min(arc_feed_cap);
            let f_per_sec = effective_feed / 60.0;
            let tangential_sq =
                cfg.accel().powi(2) - f_per_sec.powi(4) / (geom.radius * geom.radius);
            if !(tangential_sq >= 0.0) {
                return Err(CncError::InsufficientAcceleration(n));
            }
            let tangential_accel = tangential_sq.sqrt();

            length = geom.length(delta.z());
            profile = Some(Profile::compute(
                length,
                effective_feed,
                tangential_accel,
                cfg.cycle_time(),
            ));
            arc = Some(geom);
        }
        BlockType::Rapid | BlockType::NoMotion => {}
    }

    Ok(Block {
        n,
        tool,
        block_type,
        feed: feed_mm_min,
        spindle,
        start,
        target,
        delta,
        length,
        arc,
        profile,
        word_errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_machine() -> MachineConfig {
        MachineConfig::for_testing(100.0, 0.005, 1e-3, 10_000.0)
    }

    #[test]
    fn first_block_starts_at_machine_zero() {
        let m = test_machine();
        let b = parse_line("N10 G01 X0 Y0 Z0 F1000", None, &m).unwrap();
        assert_eq!((b.start().x(), b.start().y(), b.start().z()), (0.0, 0.0, 0.0));
    }

    #[test]
    fn second_block_inherits_feed_and_unset_axes() {
        let m = test_machine();
        let b1 = parse_line("N10 G01 X0 Y0 Z0 F1000", None, &m).unwrap();
        let b2 = parse_line("N20 G01 X100", Some(&b1), &m).unwrap();
        assert_eq!(b2.feed(), 1000.0);
        assert_eq!(b2.target().y(), 0.0);
        assert_eq!(b2.target().z(), 0.0);
        assert_eq!(b2.length(), 100.0);
    }

    #[test]
    fn mixed_arc_words_is_rejected() {
        let m = test_machine();
        let err = parse_line("N10 G01 X1 I2 R3 F100", None, &m).unwrap_err();
        assert!(matches!(err, CncError::GCodeMixedArc(10)));
    }

    #[test]
    fn feed_max_resolves_to_machine_f_max() {
        let m = test_machine();
        let b = parse_line("N10 G01 X10 FMAX", None, &m).unwrap();
        assert_eq!(b.feed(), m.f_max());
    }

    #[test]
    fn feed_above_f_max_is_clamped() {
        let m = test_machine();
        let b = parse_line("N10 G01 X10 F999999", None, &m).unwrap();
        assert_eq!(b.feed(), m.f_max());
    }

    #[test]
    fn block_without_g_or_motion_words_is_no_motion() {
        let m = test_machine();
        let b = parse_line("N10 S500 T1", None, &m).unwrap();
        assert_eq!(b.block_type(), BlockType::NoMotion);
    }

    #[test]
    fn unknown_word_is_logged_and_does_not_abort() {
        let m = test_machine();
        let b = parse_line("N10 G01 X10 Q5", None, &m).unwrap();
        assert_eq!(b.target().x(), 10.0);
        assert_eq!(b.word_errors(), 1);
    }

    #[test]
    fn recognised_words_do_not_count_as_errors() {
        let m = test_machine();
        let b = parse_line("N10 G01 X10 F100", None, &m).unwrap();
        assert_eq!(b.word_errors(), 0);
    }

    #[test]
    fn arc_block_carries_geometry_and_profile() {
        let m = test_machine();
        let b0 = parse_line("N10 G01 X0 Y0", None, &m).unwrap();
        let b1 = parse_line("N20 G02 X10 Y10 I10 J0 F600", Some(&b0), &m).unwrap();
        assert!(b1.arc().is_some());
        assert!(b1.profile().is_some());
    }
}
