//! The controller lifecycle: a seven-state machine that owns a `Machine`
//! and a `Program` and issues setpoints on a fixed cycle cadence.
//!
//! A function-pointer transition table would need a full 7x7 dispatch
//! matrix; Rust's enum exhaustiveness makes that unnecessary, so
//! `Fsm::step` matches `(from, to)` directly and fires edge actions only on
//! an actual transition, never on every state's step.

pub mod states;

use crate::error::CncResult;
use crate::machine::Machine;
use crate::program::Program;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;

/// The seven controller states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Init,
    Idle,
    LoadBlock,
    NoMotion,
    RapidMotion,
    InterpMotion,
    Stop,
}

/// An operator input, analogous to the original's single-keystroke console
/// control (spacebar / 'q').
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorCommand {
    Start,
    Quit,
}

/// Owns the `Machine`/`Program` and drives the lifecycle one tick at a time.
pub struct Fsm {
    pub(super) state: State,
    pub(super) machine: Machine,
    pub(super) program: Program,
    pub(super) t_blk: f64,
    pub(super) t_tot: f64,
    pub(super) exit_requested: Arc<AtomicBool>,
    pub(super) commands: Receiver<OperatorCommand>,
    /// SIGINT during RAPID_MOTION skips the current rapid move (absorbed
    /// into LOAD_BLOCK) the first time it fires per run; any further
    /// SIGINT anywhere forces STOP, matching the original controller's
    /// "CTRL-C skips over a rapid block" behavior.
    pub(super) rapid_skip_used: bool,
    pub(super) tick_count: u64,
    pub(super) init_error: Option<String>,
}

impl Fsm {
    pub fn new(
        machine: Machine,
        program: Program,
        commands: Receiver<OperatorCommand>,
        exit_requested: Arc<AtomicBool>,
    ) -> Fsm {
        Fsm {
            state: State::Init,
            machine,
            program,
            t_blk: 0.0,
            t_tot: 0.0,
            exit_requested,
            commands,
            rapid_skip_used: false,
            tick_count: 0,
            init_error: None,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn t_tot(&self) -> f64 {
        self.t_tot
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    /// Runs one FSM tick: executes the current state's step, and if it
    /// requests a different state, fires that edge's action before
    /// committing the transition.
    pub fn step(&mut self) -> State {
        let next = states::dispatch(self);
        if next != self.state {
            states::fire_edge(self, self.state, next);
            self.state = next;
        }
        self.tick_count += 1;
        self.state
    }

    /// Runs `step` in a loop, sleeping for the cycle period scaled by
    /// `rt_pacing`, until the terminal STOP state is reached.
    pub fn run(&mut self) -> CncResult<()> {
        let period = self.machine.config().cycle_time() / self.machine.config().rt_pacing();
        let period = std::time::Duration::from_secs_f64(period.max(0.0));
        loop {
            let deadline = std::time::Instant::now() + period;
            let budget = period * 10;
            let started = std::time::Instant::now();
            let state = self.step();
            let actual = started.elapsed();
            if actual > budget {
                let err = crate::error::CncError::Overrun { actual, budget };
                tracing::warn!(%err, "controller continues");
            }
            if state == State::Stop {
                return Ok(());
            }
            let now = std::time::Instant::now();
            if now < deadline {
                std::thread::sleep(deadline - now);
            }
        }
    }

    pub(super) fn exit_requested(&self) -> bool {
        self.exit_requested.load(Ordering::SeqCst)
    }

    pub(super) fn consume_exit_request(&self) {
        self.exit_requested.store(false, Ordering::SeqCst);
    }
}
