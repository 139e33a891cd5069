//! Library-wide error type for the CNC controller core.
//!
//! All fallible operations in this crate return [`CncError`] through
//! [`CncResult`]. Parse-time variants abort program loading; run-time
//! transport variants are logged by the caller and do not unwind the FSM.

/// Errors produced while parsing, planning, configuring, or driving the
/// controller.
#[derive(Debug, thiserror::Error)]
pub enum CncError {
    /// A mandatory config section or key is absent.
    #[error("missing config section or key: {0}")]
    ConfigMissing(String),

    /// A config key parses but fails a validation constraint.
    #[error("malformed config value: {0}")]
    ConfigMalformed(String),

    /// A G-code command letter outside the recognised set.
    #[error("block {block}: unknown G-code word '{letter}'")]
    GCodeUnknownWord { block: u64, letter: char },

    /// R specified together with I or J on the same block.
    #[error("block {0}: cannot mix R with I/J on an arc")]
    GCodeMixedArc(u64),

    /// The I/J or R derived arc center does not equidistance start and target.
    #[error("block {0}: arc center mismatch ({1:.6} mm over tolerance)")]
    ArcMismatch(u64, f64),

    /// The arc's required tangential acceleration evaluates to NaN.
    #[error("block {0}: insufficient acceleration for requested arc feed")]
    InsufficientAcceleration(u64),

    /// The MQTT broker could not be reached within the connect deadline.
    #[error("transport unavailable: {0}")]
    TransportUnavailable(String),

    /// An FSM step did not complete within its allotted cycle budget.
    #[error("FSM step overran its cycle budget: {actual:?} > {budget:?}")]
    Overrun {
        actual: std::time::Duration,
        budget: std::time::Duration,
    },

    /// A G-code program references no blocks, or the path is invalid.
    #[error("program error: {0}")]
    Program(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

/// Convenience alias used throughout the crate.
pub type CncResult<T> = Result<T, CncError>;
