//! Kinematic configuration plus live state: setpoint, reported position,
//! reported tracking error, and the transport client.
//!
//! Status messages arrive over a bounded channel (`Transport::try_recv_status`)
//! drained only by the FSM thread via [`Machine::poll_status`], so
//! `position`/`error` have a single writer already and need no lock.

pub mod config;
pub mod transport;

use crate::error::CncResult;
use crate::point::Point;
use config::MachineConfig;
use transport::{StatusMessage, Transport};

pub struct Machine {
    config: MachineConfig,
    setpoint: Point,
    position: Point,
    error: f64,
    transport: Box<dyn Transport>,
}

impl Machine {
    pub fn new(config: MachineConfig, transport: Box<dyn Transport>) -> Machine {
        let setpoint = config.zero();
        Machine {
            config,
            setpoint,
            position: Point::zero(),
            error: 0.0,
            transport,
        }
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    pub fn setpoint(&self) -> Point {
        self.setpoint
    }

    pub fn set_setpoint(&mut self, p: Point) {
        self.setpoint = p;
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn error(&self) -> f64 {
        self.error
    }

    pub fn connect(&mut self) -> CncResult<()> {
        self.transport.connect()
    }

    /// Publishes the current setpoint, offset into machine coordinates, as
    /// `{"x":..,"y":..,"z":..,"rapid":bool}`.
    pub fn sync(&mut self, rapid: bool) -> CncResult<()> {
        let offset = self.config.offset();
        let payload = serde_json::json!({
            "x": self.setpoint.x() + offset.x(),
            "y": self.setpoint.y() + offset.y(),
            "z": self.setpoint.z() + offset.z(),
            "rapid": rapid,
        });
        self.transport.publish_setpoint(&payload.to_string())
    }

    /// Seeds `error` to 10x the tolerance so a "within tolerance" check
    /// cannot spuriously pass before the first status update arrives.
    pub fn listen_start(&mut self) -> CncResult<()> {
        self.error = 10.0 * self.config.max_error();
        self.transport.subscribe_status()
    }

    pub fn listen_stop(&mut self) -> CncResult<()> {
        self.transport.unsubscribe_status()
    }

    pub fn disconnect(&mut self) -> CncResult<()> {
        self.transport.disconnect()
    }

    /// Drains all pending status messages, dispatching each by the last
    /// `/`-segment of its topic: `error` updates the tracking error, `position`
    /// updates the reported position, anything else is logged and dropped.
    pub fn poll_status(&mut self) {
        while let Some(msg) = self.transport.try_recv_status() {
            self.dispatch(msg);
        }
    }

    fn dispatch(&mut self, msg: StatusMessage) {
        match msg.topic_tail.as_str() {
            "error" => match msg.payload.trim().parse::<f64>() {
                Ok(v) => self.error = v,
                Err(_) => tracing::warn!(payload = %msg.payload, "malformed error payload"),
            },
            "position" => match parse_triple(&msg.payload) {
                Some((x, y, z)) => {
                    let mut p = Point::zero();
                    p.set_xyz(x, y, z);
                    self.position = p;
                }
                None => tracing::warn!(payload = %msg.payload, "malformed position payload"),
            },
            other => tracing::warn!(topic = %other, "unhandled status topic"),
        }
    }

    /// Logs the active kinematic configuration once, at startup.
    pub fn log_params(&self) {
        let zero = self.config.zero();
        let offset = self.config.offset();
        tracing::info!(
            accel = self.config.accel(),
            cycle_time = self.config.cycle_time(),
            max_error = self.config.max_error(),
            f_max = self.config.f_max(),
            rt_pacing = self.config.rt_pacing(),
            zero = %zero,
            offset = %offset,
            "machine configuration"
        );
    }
}

fn parse_triple(payload: &str) -> Option<(f64, f64, f64)> {
    let mut parts = payload.split(',').map(|s| s.trim());
    let x = parts.next()?.parse().ok()?;
    let y = parts.next()?.parse().ok()?;
    let z = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((x, y, z))
}
