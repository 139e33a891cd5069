//! End-to-end block planning scenarios driven through the public
//! `Program`/`Block` API rather than the crate-internal unit tests that
//! exercise the individual formulas.

use cnc_core::machine::config::MachineConfig;
use cnc_core::program::Program;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_program(contents: &str) -> NamedTempFile {
    let mut f = NamedTempFile::new().unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    f
}

fn cfg(accel: f64) -> MachineConfig {
    MachineConfig::for_testing(accel, 0.005, 1e-3, 10_000.0)
}

/// A 100mm line move at F1000 under A=100 mm/s^2 quantises to a
/// trapezoidal profile whose three phases sum to the quantised total.
#[test]
fn trapezoidal_line_move_phases_sum_to_quantised_total() {
    let f = write_program("N10 G01 X0 Y0 Z0 F1000\nN20 G01 X100\n");
    let program = Program::parse(f.path(), &cfg(100.0)).unwrap();
    let mut iter = program;
    let b1 = iter.next().unwrap();
    assert_eq!(b1.n(), 10);
    let b2 = iter.next().unwrap();
    let profile = b2.profile().expect("line block has a profile");

    assert_eq!(b2.length(), 100.0);
    assert!((profile.dt1 - 0.1667).abs() < 1e-3);
    assert!((profile.dtm - 5.8331).abs() < 2e-3);
    assert!((profile.dt - 6.1665).abs() < 1e-2);
    assert!((profile.dt1 + profile.dtm + profile.dt2 - profile.dt).abs() < 1e-9);

    let cycles = profile.dt / 0.005;
    assert!((cycles - cycles.round()).abs() < 1e-6);
}

/// An I/J-form CW quarter circle centers at (10, 0), radius 10, and sweeps
/// -pi/2 (the short clockwise way from the start angle of pi to the target
/// angle of pi/2, applying the theta0/thetaf/normalise/CW-complement
/// formula literally — see DESIGN.md for a note on this scenario's
/// figures).
#[test]
fn ijk_cw_arc_geometry() {
    let f = write_program("N10 G01 X0 Y0\nN20 G02 X10 Y10 I10 J0 F600\n");
    let mut program = Program::parse(f.path(), &cfg(100.0)).unwrap();
    program.next();
    let arc_block = program.next().unwrap();
    let geom = arc_block.arc().expect("arc block carries geometry");

    assert!((geom.center_x - 10.0).abs() < 1e-6);
    assert!((geom.center_y - 0.0).abs() < 1e-6);
    assert!((geom.radius - 10.0).abs() < 1e-6);
    assert!((geom.dtheta - (-0.5 * std::f64::consts::PI)).abs() < 1e-6);
    assert!((arc_block.length() - 10.0 * 0.5 * std::f64::consts::PI).abs() < 1e-3);
}

/// An R-form CCW arc with negative radius selects the major-arc branch,
/// landing the center at (0, 10).
#[test]
fn r_form_negative_radius_selects_major_arc() {
    let f = write_program("N10 G01 X0 Y0\nN20 G03 X10 Y10 R-10 F600\n");
    let mut program = Program::parse(f.path(), &cfg(100.0)).unwrap();
    program.next();
    let arc_block = program.next().unwrap();
    let geom = arc_block.arc().expect("arc block carries geometry");

    assert!((geom.center_x - 0.0).abs() < 1e-6);
    assert!((geom.center_y - 10.0).abs() < 1e-6);
}

/// Mixing R with I/J on the same block is a parse-time error that aborts
/// the whole program.
#[test]
fn mixed_arc_words_abort_the_program() {
    let f = write_program("N10 G01 X1 I2 R3 F100\n");
    let err = Program::parse(f.path(), &cfg(100.0));
    assert!(err.is_err());
}

/// Invariant 2: at every sampled lambda, the interpolated position lies on
/// (within machine_error of) the straight path between start and target.
#[test]
fn interpolated_line_positions_lie_on_the_chord() {
    let f = write_program("N10 G01 X0 Y0 Z0 F1000\nN20 G01 X30 Y40 Z0 F500\n");
    let mut program = Program::parse(f.path(), &cfg(100.0)).unwrap();
    program.next();
    let block = program.next().unwrap();

    for i in 0..=10 {
        let lambda = i as f64 / 10.0;
        let p = block.interpolate(lambda);
        // On the chord: p = start + lambda*(target - start); check the
        // cross-track distance to the analytic chord point is ~0.
        let expected_x = 0.0 + lambda * 30.0;
        let expected_y = 0.0 + lambda * 40.0;
        assert!((p.x() - expected_x).abs() < 1e-9);
        assert!((p.y() - expected_y).abs() < 1e-9);
    }
}

/// Invariant 4: for an R-form arc, the generated center is equidistant from
/// start and target, matching |R|.
#[test]
fn r_form_center_is_equidistant_across_a_small_grid() {
    for radius in [5.0, 10.0, 25.0] {
        let text = format!("N10 G01 X0 Y0\nN20 G02 X10 Y0 R{radius}\n");
        let f = write_program(&text);
        let mut program = Program::parse(f.path(), &cfg(100.0)).unwrap();
        program.next();
        let block = program.next().unwrap();
        let geom = block.arc().unwrap();
        let d_start = geom.center_x.hypot(geom.center_y);
        let d_target = (10.0 - geom.center_x).hypot(-geom.center_y);
        assert!((d_start - radius).abs() < 1e-6);
        assert!((d_target - radius).abs() < 1e-6);
    }
}
