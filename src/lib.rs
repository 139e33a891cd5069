//! Soft-real-time CNC motion controller core.
//!
//! Reads a G-code part program ([`block`], [`program`]), plans a
//! kinematically-bounded trajectory for each move, and drives a three-axis
//! cartesian machine ([`machine`], [`axis`]) by streaming setpoints on a
//! fixed cycle cadence from a lifecycle state machine ([`fsm`]).

pub mod axis;
pub mod block;
pub mod cli;
pub mod error;
pub mod fsm;
pub mod machine;
pub mod point;
pub mod program;

pub use error::{CncError, CncResult};

#[cfg(test)]
mod tests {
    use crate::machine::config::Config;

    /// Sanity check: a complete config document loads through every layer
    /// of the crate without panicking.
    #[test]
    fn sample_config_loads() {
        let text = r#"
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
        Config::parse(text).expect("sample config parses");
    }
}
