//! TOML configuration: `[C-CNC]` kinematic limits, `[MQTT]` transport
//! endpoint, and the per-axis `[X]`/`[Y]`/`[Z]` sections.
//!
//! Deserialized permissively (every field `Option`) so that a missing key
//! reports a precise [`CncError::ConfigMissing`] rather than a generic
//! `toml` parse failure.

use crate::error::{CncError, CncResult};
use crate::point::Point;
use serde::Deserialize;
use std::path::Path;

/// `[C-CNC]` kinematic limits and cycle pacing, ready for use by `Block`
/// parsing and the FSM's run loop.
#[derive(Debug, Clone, PartialEq)]
pub struct MachineConfig {
    accel: f64,
    cycle_time: f64,
    max_error: f64,
    f_max: f64,
    rt_pacing: f64,
    zero: Point,
    offset: Point,
}

impl MachineConfig {
    pub fn accel(&self) -> f64 {
        self.accel
    }

    pub fn cycle_time(&self) -> f64 {
        self.cycle_time
    }

    pub fn max_error(&self) -> f64 {
        self.max_error
    }

    pub fn f_max(&self) -> f64 {
        self.f_max
    }

    pub fn rt_pacing(&self) -> f64 {
        self.rt_pacing
    }

    pub fn zero(&self) -> Point {
        self.zero
    }

    pub fn offset(&self) -> Point {
        self.offset
    }

    /// Builds a config directly from values, bypassing TOML, for unit tests.
    pub fn for_testing(accel: f64, cycle_time: f64, max_error: f64, f_max: f64) -> MachineConfig {
        MachineConfig {
            accel,
            cycle_time,
            max_error,
            f_max,
            rt_pacing: 1.0,
            zero: point_of([0.0, 0.0, 0.0]),
            offset: point_of([0.0, 0.0, 0.0]),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MqttConfig {
    pub broker_address: String,
    pub broker_port: u16,
    pub pub_topic: String,
    pub sub_topic: String,
}

#[derive(Debug, Clone)]
pub struct AxisConfig {
    pub length: f64,
    pub mass: f64,
    pub friction: f64,
    pub max_torque: f64,
    pub pitch: f64,
    pub gravity: f64,
    pub p: f64,
    pub i: f64,
    pub d: f64,
    /// Micro-stepping integration interval, microseconds.
    pub integration_dt_us: u64,
}

#[derive(Debug, Clone)]
pub struct AxesConfig {
    pub x: AxisConfig,
    pub y: AxisConfig,
    pub z: AxisConfig,
}

/// The whole parsed and validated configuration document.
#[derive(Debug, Clone)]
pub struct Config {
    pub machine: MachineConfig,
    pub mqtt: MqttConfig,
    pub axes: AxesConfig,
}

impl Config {
    pub fn load(path: &Path) -> CncResult<Config> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> CncResult<Config> {
        let raw: RawFile = toml::from_str(text)?;
        let c_cnc = raw.c_cnc.unwrap_or_default();
        let mqtt = raw.mqtt.unwrap_or_default();

        let accel = require(c_cnc.a, "C-CNC.A")?;
        let cycle_time = require(c_cnc.tq, "C-CNC.tq")?;
        let max_error = require(c_cnc.max_error, "C-CNC.max_error")?;
        let f_max = require(c_cnc.fmax, "C-CNC.fmax")?;
        let rt_pacing = require(c_cnc.rt_pacing, "C-CNC.rt_pacing")?;
        let zero = require(c_cnc.zero, "C-CNC.zero")?;
        let offset = require(c_cnc.offset, "C-CNC.offset")?;

        if !(cycle_time > 0.0 && cycle_time <= 1.0) {
            return Err(CncError::ConfigMalformed(format!(
                "C-CNC.tq must be in (0, 1] seconds, got {cycle_time}"
            )));
        }
        if !(accel > 0.0) {
            return Err(CncError::ConfigMalformed(format!(
                "C-CNC.A must be positive, got {accel}"
            )));
        }
        if !(rt_pacing > 0.0 && rt_pacing <= 1.0) {
            return Err(CncError::ConfigMalformed(format!(
                "C-CNC.rt_pacing must be in (0, 1], got {rt_pacing}"
            )));
        }

        let machine = MachineConfig {
            accel,
            cycle_time,
            max_error,
            f_max,
            rt_pacing,
            zero: point_of(zero),
            offset: point_of(offset),
        };

        let mqtt = MqttConfig {
            broker_address: require(mqtt.broker_address, "MQTT.broker_address")?,
            broker_port: require(mqtt.broker_port, "MQTT.broker_port")?,
            pub_topic: require(mqtt.pub_topic, "MQTT.pub_topic")?,
            sub_topic: require(mqtt.sub_topic, "MQTT.sub_topic")?,
        };

        let axes = AxesConfig {
            x: parse_axis(raw.x, "X")?,
            y: parse_axis(raw.y, "Y")?,
            z: parse_axis(raw.z, "Z")?,
        };

        Ok(Config { machine, mqtt, axes })
    }
}

fn parse_axis(raw: Option<RawAxis>, section: &str) -> CncResult<AxisConfig> {
    let raw = raw.ok_or_else(|| CncError::ConfigMissing(section.to_string()))?;
    Ok(AxisConfig {
        length: require(raw.length, &format!("{section}.length"))?,
        mass: require(raw.mass, &format!("{section}.mass"))?,
        friction: require(raw.friction, &format!("{section}.friction"))?,
        max_torque: require(raw.max_torque, &format!("{section}.max_torque"))?,
        pitch: require(raw.pitch, &format!("{section}.pitch"))?,
        gravity: require(raw.gravity, &format!("{section}.gravity"))?,
        p: require(raw.p, &format!("{section}.p"))?,
        i: require(raw.i, &format!("{section}.i"))?,
        d: require(raw.d, &format!("{section}.d"))?,
        integration_dt_us: require(raw.integration_dt, &format!("{section}.integration_dt"))?,
    })
}

fn require<T>(value: Option<T>, key: &str) -> CncResult<T> {
    value.ok_or_else(|| CncError::ConfigMissing(key.to_string()))
}

fn point_of(xyz: [f64; 3]) -> Point {
    let mut p = Point::zero();
    p.set_xyz(xyz[0], xyz[1], xyz[2]);
    p
}

#[derive(Debug, Deserialize, Default)]
struct RawFile {
    #[serde(rename = "C-CNC")]
    c_cnc: Option<RawCCnc>,
    #[serde(rename = "MQTT")]
    mqtt: Option<RawMqtt>,
    #[serde(rename = "X")]
    x: Option<RawAxis>,
    #[serde(rename = "Y")]
    y: Option<RawAxis>,
    #[serde(rename = "Z")]
    z: Option<RawAxis>,
}

#[derive(Debug, Deserialize, Default)]
struct RawCCnc {
    #[serde(rename = "A")]
    a: Option<f64>,
    tq: Option<f64>,
    max_error: Option<f64>,
    fmax: Option<f64>,
    rt_pacing: Option<f64>,
    zero: Option<[f64; 3]>,
    offset: Option<[f64; 3]>,
}

#[derive(Debug, Deserialize, Default)]
struct RawMqtt {
    broker_address: Option<String>,
    broker_port: Option<u16>,
    pub_topic: Option<String>,
    sub_topic: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct RawAxis {
    length: Option<f64>,
    mass: Option<f64>,
    friction: Option<f64>,
    max_torque: Option<f64>,
    pitch: Option<f64>,
    gravity: Option<f64>,
    p: Option<f64>,
    i: Option<f64>,
    d: Option<f64>,
    integration_dt: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [C-CNC]
        A = 100.0
        tq = 0.005
        max_error = 0.001
        fmax = 10000.0
        rt_pacing = 1.0
        zero = [0.0, 0.0, 0.0]
        offset = [0.0, 0.0, 0.0]

        [MQTT]
        broker_address = "localhost"
        broker_port = 1883
        pub_topic = "c-cnc/setpoint"
        sub_topic = "c-cnc/status/#"

        [X]
        length = 500.0
        mass = 5.0
        friction = 100.0
        max_torque = 10.0
        pitch = 5.0
        gravity = 0.0
        p = 1000.0
        i = 0.0
        d = 0.0
        integration_dt = 1000

        [Y]
        length = 500.0
        mass = 5.0
        friction = 100.0
        max_torque = 10.0
        pitch = 5.0
        gravity = 0.0
        p = 1000.0
        i = 0.0
        d = 0.0
        integration_dt = 1000

        [Z]
        length = 200.0
        mass = 2.0
        friction = 50.0
        max_torque = 10.0
        pitch = 5.0
        gravity = 9.81
        p = 1000.0
        i = 0.0
        d = 0.0
        integration_dt = 1000
    "#;

    #[test]
    fn parses_a_complete_document() {
        let cfg = Config::parse(SAMPLE).unwrap();
        assert_eq!(cfg.machine.accel(), 100.0);
        assert_eq!(cfg.mqtt.broker_port, 1883);
        assert_eq!(cfg.axes.z.gravity, 9.81);
    }

    #[test]
    fn missing_section_is_config_missing() {
        let text = SAMPLE.replace("[MQTT]", "[NOTMQTT]");
        let err = Config::parse(&text).unwrap_err();
        assert!(matches!(err, CncError::ConfigMissing(ref k) if k.starts_with("MQTT")));
    }

    #[test]
    fn out_of_range_cycle_time_is_malformed() {
        let text = SAMPLE.replace("tq = 0.005", "tq = 2.0");
        let err = Config::parse(&text).unwrap_err();
        assert!(matches!(err, CncError::ConfigMalformed(_)));
    }

    #[test]
    fn non_positive_accel_is_malformed() {
        let text = SAMPLE.replace("A = 100.0", "A = -1.0");
        let err = Config::parse(&text).unwrap_err();
        assert!(matches!(err, CncError::ConfigMalformed(_)));
    }
}
