//! Per-axis second-order plant simulator with a PID position loop.
//!
//! The opaque C struct with field-by-field getters becomes a small set of
//! methods over a lock-guarded state.

pub mod worker;

use crate::machine::config::AxisConfig;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

/// Mutable plant + PID state, shared between the public handle and the
/// detached integration worker.
#[derive(Debug, Clone, Copy)]
pub struct AxisState {
    pub position: f64,
    pub speed: f64,
    pub effective_mass: f64,
    pub pid_integral: f64,
    pub prev_error: f64,
    pub torque: f64,
}

/// One linear axis: plant parameters plus the running integration worker.
pub struct Axis {
    name: String,
    config: AxisConfig,
    state: Arc<Mutex<AxisState>>,
    target: Arc<Mutex<f64>>,
    stop_flag: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Axis {
    pub fn new(name: &str, config: AxisConfig) -> Axis {
        let effective_mass = config.mass;
        Axis {
            name: name.to_string(),
            config,
            state: Arc::new(Mutex::new(AxisState {
                position: 0.0,
                speed: 0.0,
                effective_mass,
                pid_integral: 0.0,
                prev_error: 0.0,
                torque: 0.0,
            })),
            target: Arc::new(Mutex::new(0.0)),
            stop_flag: Arc::new(AtomicBool::new(false)),
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &AxisConfig {
        &self.config
    }

    /// Chains `other`'s own mass into this axis's effective mass, modeling a
    /// downstream axis carried by this one (call X.link(&Y), X.link(&Z) so
    /// X carries Y+Z, then Y.link(&Z) so Y carries Z).
    pub fn link(&mut self, other: &Axis) {
        self.state.lock().unwrap().effective_mass += other.config.mass;
    }

    /// Zeros speed and the PID accumulators, sets position, and resets the
    /// worker's PID cadence.
    pub fn reset(&self, position: f64) {
        let mut s = self.state.lock().unwrap();
        s.position = position;
        s.speed = 0.0;
        s.pid_integral = 0.0;
        s.prev_error = 0.0;
        s.torque = 0.0;
    }

    pub fn position(&self) -> f64 {
        self.state.lock().unwrap().position
    }

    pub fn speed(&self) -> f64 {
        self.state.lock().unwrap().speed
    }

    pub fn torque(&self) -> f64 {
        self.state.lock().unwrap().torque
    }

    pub fn is_running(&self) -> bool {
        self.running.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Updates the PID setpoint consumed by the integration worker.
    pub fn set_target(&self, value: f64) {
        *self.target.lock().unwrap() = value;
    }

    /// Current setpoint minus reported position, for status publishing.
    pub fn target_error(&self) -> f64 {
        *self.target.lock().unwrap() - self.state.lock().unwrap().position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> AxisConfig {
        AxisConfig {
            length: 1.0,
            mass: 1.0,
            friction: 100.0,
            max_torque: 1000.0,
            pitch: 1.0,
            gravity: 9.81,
            p: 1000.0,
            i: 0.0,
            d: 0.0,
            integration_dt_us: 1000,
        }
    }

    #[test]
    fn link_adds_the_others_own_mass() {
        let mut x = Axis::new("X", cfg());
        let y = Axis::new("Y", cfg());
        let z = Axis::new("Z", cfg());
        x.link(&y);
        x.link(&z);
        assert_eq!(x.state.lock().unwrap().effective_mass, 3.0);
    }

    #[test]
    fn reset_zeros_speed_and_sets_position() {
        let axis = Axis::new("X", cfg());
        axis.reset(0.25);
        assert_eq!(axis.position(), 0.25);
        assert_eq!(axis.speed(), 0.0);
    }

    #[test]
    fn target_error_reflects_set_target() {
        let axis = Axis::new("X", cfg());
        axis.set_target(0.4);
        assert!((axis.target_error() - 0.4).abs() < 1e-9);
    }
}
