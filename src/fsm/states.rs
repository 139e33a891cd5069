//! The seven state-step functions plus the transition-edge actions.
//!
//! One function per state (INIT, IDLE, LOAD_BLOCK, NO_MOTION, RAPID_MOTION,
//! INTERP_MOTION, STOP) dispatched through a plain `match` rather than a
//! function-pointer table.

use super::{Fsm, OperatorCommand, State};
use crate::block::BlockType;

/// Executes the current state's own step and returns the state it requests
/// next ("no change" is simply returning the same state).
pub(super) fn dispatch(fsm: &mut Fsm) -> State {
    match fsm.state {
        State::Init => init(fsm),
        State::Idle => idle(fsm),
        State::LoadBlock => load_block(fsm),
        State::NoMotion => no_motion(fsm),
        State::RapidMotion => rapid_motion(fsm),
        State::InterpMotion => interp_motion(fsm),
        State::Stop => State::Stop,
    }
}

/// Fires the action registered for a `(from, to)` edge, if any. Invalid
/// transitions are not reachable here: `dispatch` only ever returns a state
/// this module considers valid for that source state.
pub(super) fn fire_edge(fsm: &mut Fsm, from: State, to: State) {
    match (from, to) {
        (State::Idle, State::LoadBlock) => {
            fsm.t_blk = 0.0;
            fsm.t_tot = 0.0;
            println!("t_tot,block,x,y,z,rapid");
        }
        (State::LoadBlock, State::RapidMotion) => {
            fsm.t_blk = 0.0;
            if let Err(err) = fsm.machine.listen_start() {
                tracing::warn!(%err, "could not begin status subscription");
            }
            if let Some(block) = fsm.program.current() {
                fsm.machine.set_setpoint(*block.target());
            }
            if let Err(err) = fsm.machine.sync(true) {
                tracing::warn!(%err, "rapid setpoint publish failed");
            }
        }
        (State::LoadBlock, State::InterpMotion) => {
            fsm.t_blk = 0.0;
            if let Some(block) = fsm.program.current() {
                eprint!("\rblock N{} ", block.n());
            }
        }
        (State::RapidMotion, State::LoadBlock) => {
            if let Err(err) = fsm.machine.listen_stop() {
                tracing::warn!(%err, "could not end status subscription");
            }
            eprint!("\r");
        }
        (State::InterpMotion, State::LoadBlock) => {
            eprint!("\r");
        }
        (_, State::Stop) => {
            if let Err(err) = fsm.machine.disconnect() {
                tracing::warn!(%err, "transport disconnect failed during shutdown");
            }
        }
        _ => {}
    }
}

fn init(fsm: &mut Fsm) -> State {
    if let Err(err) = fsm.machine.connect() {
        tracing::error!(%err, "init: transport connect failed");
        fsm.init_error = Some(err.to_string());
        return State::Stop;
    }
    if fsm.program.is_empty() {
        let err = crate::error::CncError::Program("program has no blocks".to_string());
        tracing::error!(%err, "init: empty program");
        fsm.init_error = Some(err.to_string());
        return State::Stop;
    }
    fsm.machine.log_params();
    if let Err(err) = fsm.machine.sync(false) {
        tracing::error!(%err, "init: initial sync to machine zero failed");
        fsm.init_error = Some(err.to_string());
        return State::Stop;
    }
    State::Idle
}

fn idle(fsm: &mut Fsm) -> State {
    if fsm.exit_requested() {
        return State::Stop;
    }
    match fsm.commands.try_recv() {
        Ok(OperatorCommand::Start) => State::LoadBlock,
        Ok(OperatorCommand::Quit) => State::Stop,
        Err(_) => State::Idle,
    }
}

fn load_block(fsm: &mut Fsm) -> State {
    match fsm.program.next() {
        None => State::Idle,
        Some(block) => match block.block_type() {
            BlockType::NoMotion => State::NoMotion,
            BlockType::Rapid => State::RapidMotion,
            BlockType::Line | BlockType::ArcCw | BlockType::ArcCcw => State::InterpMotion,
        },
    }
}

fn no_motion(fsm: &mut Fsm) -> State {
    if let Some(block) = fsm.program.current() {
        tracing::info!(block = block.n(), "no-motion block");
    }
    // NO_MOTION consumes exactly one cycle of t_tot, once per block, not
    // once per FSM tick.
    fsm.t_tot += fsm.machine.config().cycle_time();
    State::LoadBlock
}

fn rapid_motion(fsm: &mut Fsm) -> State {
    if fsm.exit_requested() {
        if !fsm.rapid_skip_used {
            fsm.rapid_skip_used = true;
            fsm.consume_exit_request();
            return State::LoadBlock;
        }
        return State::Stop;
    }

    fsm.machine.poll_status();
    if fsm.machine.error() < fsm.machine.config().max_error() {
        State::LoadBlock
    } else {
        State::RapidMotion
    }
}

fn interp_motion(fsm: &mut Fsm) -> State {
    if fsm.exit_requested() {
        return State::Stop;
    }

    let t_q = fsm.machine.config().cycle_time();
    let position = match fsm.program.current() {
        None => return State::LoadBlock,
        Some(block) => {
            let dt = block.duration();
            if fsm.t_blk >= dt + t_q / 10.0 {
                return State::LoadBlock;
            }
            let (lambda, _feed) = block.lambda(fsm.t_blk);
            block.interpolate(lambda)
        }
    };

    fsm.machine.set_setpoint(position);
    if let Err(err) = fsm.machine.sync(false) {
        tracing::warn!(%err, "setpoint publish failed");
    }
    fsm.t_blk += t_q;
    fsm.t_tot += t_q;
    State::InterpMotion
}
