//! The detached integration worker: Euler-steps the plant at a fixed
//! micro-step, re-evaluating the PID loop once per cycle.

use super::{Axis, AxisState};
use crate::machine::config::AxisConfig;
use std::sync::atomic::Ordering;
use std::time::Duration;

impl Axis {
    /// Spawns the worker thread. A no-op if already running.
    pub fn run(&mut self, cycle_time: f64) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        self.stop_flag.store(false, Ordering::SeqCst);

        let state = self.state.clone();
        let target = self.target.clone();
        let stop = self.stop_flag.clone();
        let running = self.running.clone();
        let config = self.config.clone();
        let name = self.name.clone();

        let handle = std::thread::spawn(move || {
            set_realtime_priority_best_effort(&name);
            let micro_step = Duration::from_micros(config.integration_dt_us.max(1));
            let cycle = Duration::from_secs_f64(cycle_time.max(micro_step.as_secs_f64()));
            let mut since_pid = Duration::ZERO;

            while !stop.load(Ordering::SeqCst) {
                let setpoint = *target.lock().unwrap();
                {
                    let mut s = state.lock().unwrap();
                    if since_pid >= cycle {
                        pid_step(&mut s, &config, setpoint, cycle.as_secs_f64());
                        since_pid = Duration::ZERO;
                    }
                    forward_integrate(&mut s, &config, micro_step.as_secs_f64());
                }
                since_pid += micro_step;
                std::thread::sleep(micro_step);
            }
            running.store(false, Ordering::SeqCst);
        });

        self.handle = Some(handle);
    }

    /// Signals the worker to stop and joins it, bounded by `timeout`. An
    /// overrun is logged, not propagated: "`free` is only safe after `stop`
    /// has observed exit", but a hung integrator must not hang the caller.
    pub fn stop(&mut self, timeout: Duration) {
        self.stop_flag.store(true, Ordering::SeqCst);
        let Some(handle) = self.handle.take() else {
            return;
        };

        let (tx, rx) = std::sync::mpsc::channel();
        let name = self.name.clone();
        let joiner = std::thread::spawn(move || {
            let _ = handle.join();
            let _ = tx.send(());
        });
        if rx.recv_timeout(timeout).is_err() {
            tracing::warn!(axis = %name, "axis worker did not stop within the bounded wait");
        }
        let _ = joiner.join();
    }
}

/// Explicit Euler step: `x += v*dt; v = v*(1 - friction/m*dt) + F*dt/m`,
/// hard-clipped to `[0, length]`, resetting speed and the PID accumulators
/// on clip.
fn forward_integrate(state: &mut AxisState, config: &AxisConfig, dt: f64) {
    let force = std::f64::consts::PI * state.torque / config.pitch
        - config.gravity * state.effective_mass * config.pitch;

    state.position += state.speed * dt;
    state.speed = state.speed * (1.0 - (config.friction / state.effective_mass) * dt)
        + force * dt / state.effective_mass;

    if state.position <= 0.0 {
        state.position = 0.0;
        state.speed = 0.0;
        state.pid_integral = 0.0;
        state.prev_error = 0.0;
    } else if state.position >= config.length {
        state.position = config.length;
        state.speed = 0.0;
        state.pid_integral = 0.0;
        state.prev_error = 0.0;
    }
}

/// One PID evaluation: trapezoid-accumulated integral, finite-difference
/// derivative, output saturated to `+-max_torque`.
fn pid_step(state: &mut AxisState, config: &AxisConfig, setpoint: f64, dt: f64) {
    let error = setpoint - state.position;
    state.pid_integral += (error + state.prev_error) / 2.0 * dt;
    let derivative = if dt > 0.0 {
        (error - state.prev_error) / dt
    } else {
        0.0
    };
    state.prev_error = error;

    let torque = config.p * error + config.i * state.pid_integral + config.d * derivative;
    state.torque = torque.clamp(-config.max_torque, config.max_torque);
}

#[cfg(target_os = "linux")]
fn set_realtime_priority_best_effort(name: &str) {
    // SCHED_FIFO priority 1: lowest real-time priority, enough to preempt
    // normal SCHED_OTHER threads. Unprivileged processes almost never get
    // this; EPERM is expected and not fatal.
    unsafe {
        let param = libc::sched_param { sched_priority: 1 };
        let rc = libc::sched_setscheduler(0, libc::SCHED_FIFO, &param);
        if rc != 0 {
            let err = std::io::Error::last_os_error();
            tracing::debug!(axis = %name, %err, "could not set real-time scheduling, continuing as-is");
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn set_realtime_priority_best_effort(_name: &str) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::Axis;
    use crate::machine::config::AxisConfig;
    use std::time::Duration;

    fn cfg() -> AxisConfig {
        AxisConfig {
            length: 1.0,
            mass: 1.0,
            friction: 100.0,
            max_torque: 1_000_000.0,
            pitch: 1.0,
            gravity: 9.81,
            p: 1000.0,
            i: 0.0,
            d: 0.0,
            integration_dt_us: 1000,
        }
    }

    #[test]
    fn zero_torque_and_positive_gravity_clips_to_zero() {
        let mut state = AxisState {
            position: 0.5,
            speed: 0.0,
            effective_mass: 1.0,
            pid_integral: 0.0,
            prev_error: 0.0,
            torque: 0.0,
        };
        let config = cfg();
        for _ in 0..100_000 {
            forward_integrate(&mut state, &config, 0.001);
        }
        assert_eq!(state.position, 0.0);
        assert_eq!(state.speed, 0.0);
        assert_eq!(state.pid_integral, 0.0);
    }

    #[test]
    fn s6_step_response_settles_near_setpoint() {
        // mass=1, friction=100, P=1000, I=0, D=0, step to 0.5, dt=1ms.
        let config = AxisConfig {
            gravity: 0.0,
            ..cfg()
        };
        let mut state = AxisState {
            position: 0.0,
            speed: 0.0,
            effective_mass: config.mass,
            pid_integral: 0.0,
            prev_error: 0.0,
            torque: 0.0,
        };
        let dt = 0.001;
        for _ in 0..1000 {
            pid_step(&mut state, &config, 0.5, dt);
            forward_integrate(&mut state, &config, dt);
        }
        assert!((state.position - 0.5).abs() / 0.5 < 0.01);
        assert!(state.speed.abs() < 0.05);
    }

    #[test]
    fn run_then_stop_leaves_worker_not_running() {
        let mut axis = Axis::new("X", cfg());
        axis.run(0.01);
        assert!(axis.is_running());
        axis.set_target(0.2);
        std::thread::sleep(Duration::from_millis(20));
        axis.stop(Duration::from_secs(1));
        assert!(!axis.is_running());
    }
}
