//! A single parsed G-code line: motion type, target, arc geometry, and the
//! velocity profile that drives `lambda`/`interpolate` at run time.
//!
//! Generalised from "emit G-code for a toolpath segment" to "parse and
//! time-parameterise a commanded move".

pub mod arc;
pub mod interp;
pub mod parse;
pub mod profile;

use crate::error::CncResult;
use crate::machine::config::MachineConfig;
use crate::point::Point;
use arc::ArcGeometry;
use profile::Profile;
use std::io::{self, Write};

/// Motion type dispatched by the FSM's `LOAD_BLOCK` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    Rapid,
    Line,
    ArcCw,
    ArcCcw,
    NoMotion,
}

impl BlockType {
    pub fn is_interpolated(self) -> bool {
        matches!(self, BlockType::Line | BlockType::ArcCw | BlockType::ArcCcw)
    }
}

/// One parsed, planned G-code line.
#[derive(Debug, Clone)]
pub struct Block {
    pub(super) n: u64,
    pub(super) tool: u32,
    pub(super) block_type: BlockType,
    /// Resolved feed, mm/min (MAX already substituted by `machine.f_max`).
    pub(super) feed: f64,
    pub(super) spindle: f64,
    pub(super) start: Point,
    pub(super) target: Point,
    pub(super) delta: Point,
    pub(super) length: f64,
    pub(super) arc: Option<ArcGeometry>,
    pub(super) profile: Option<Profile>,
    /// Count of unrecognised-word warnings seen while tokenizing this line.
    pub(super) word_errors: u32,
}

impl Block {
    /// Parses one G-code line, inheriting modal state from `prev` (or
    /// machine zero / zero feed if this is the first block).
    pub fn parse(line: &str, prev: Option<&Block>, cfg: &MachineConfig) -> CncResult<Block> {
        parse::parse_line(line, prev, cfg)
    }

    pub fn n(&self) -> u64 {
        self.n
    }

    pub fn tool(&self) -> u32 {
        self.tool
    }

    pub fn block_type(&self) -> BlockType {
        self.block_type
    }

    pub fn feed(&self) -> f64 {
        self.feed
    }

    pub fn spindle(&self) -> f64 {
        self.spindle
    }

    pub fn start(&self) -> &Point {
        &self.start
    }

    pub fn target(&self) -> &Point {
        &self.target
    }

    pub fn delta(&self) -> &Point {
        &self.delta
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn arc(&self) -> Option<&ArcGeometry> {
        self.arc.as_ref()
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    /// Number of unrecognised-word warnings seen while parsing this line.
    pub fn word_errors(&self) -> u32 {
        self.word_errors
    }

    /// Total quantised duration, for blocks that carry a profile.
    pub fn duration(&self) -> f64 {
        self.profile.as_ref().map(|p| p.dt).unwrap_or(0.0)
    }

    /// Evaluates `(lambda, feed_mm_min)` at elapsed time `t` since the block
    /// started. Only valid for `Line`/`ArcCw`/`ArcCcw` blocks.
    pub fn lambda(&self, t: f64) -> (f64, f64) {
        let profile = self
            .profile
            .as_ref()
            .expect("lambda called on a block with no velocity profile");
        interp::lambda(profile, t)
    }

    /// Writes the position at abscissa `lambda` into `out`.
    pub fn interpolate(&self, lam: f64) -> Point {
        match self.block_type {
            BlockType::Line => interp::interpolate_line(&self.start, &self.delta, lam),
            BlockType::ArcCw | BlockType::ArcCcw => {
                let geom = self.arc.as_ref().expect("arc block with no geometry");
                interp::interpolate_arc(geom, self.start.z(), self.delta.z(), lam)
            }
            other => panic!("interpolate called on a {other:?} block"),
        }
    }

    pub fn print(&self, sink: &mut dyn Write) -> io::Result<()> {
        writeln!(sink, "{self}")
    }
}

impl std::fmt::Display for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "N{} {:?} target={} F{:.3} S{:.3} T{}",
            self.n, self.block_type, self.target, self.feed, self.spindle, self.tool
        )
    }
}
