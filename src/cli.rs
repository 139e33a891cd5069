//! `clap`-derived argument parsing for the two controller binaries.

use clap::Parser;
use std::path::PathBuf;

/// `cnc-ctl <GCODE_FILE> <INI_FILE>` — runs the controller FSM against a
/// parsed G-code program and a TOML configuration document.
#[derive(Parser, Debug)]
#[command(name = "cnc-ctl", version, about = "CNC motion controller")]
pub struct CtlArgs {
    /// Path to the G-code part program.
    pub gcode_file: PathBuf,
    /// Path to the TOML configuration document (`[C-CNC]`, `[MQTT]`, axes).
    pub ini_file: PathBuf,
}

/// `cnc-sim [LOG_FILE]` — standalone axis simulator, logs one CSV row per
/// cycle to stdout or to an optional file.
#[derive(Parser, Debug)]
#[command(name = "cnc-sim", version, about = "CNC axis plant simulator")]
pub struct SimArgs {
    /// Path to the TOML configuration document.
    pub ini_file: PathBuf,
    /// Optional CSV log file; defaults to stdout.
    pub log_file: Option<PathBuf>,
}
