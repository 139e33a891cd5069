//! Controller binary: drives the FSM against a G-code program and a
//! TOML machine configuration, publishing setpoints over MQTT.

use clap::Parser;
use cnc_core::cli::CtlArgs;
use cnc_core::fsm::{Fsm, OperatorCommand};
use cnc_core::machine::config::Config;
use cnc_core::machine::transport::RumqttcTransport;
use cnc_core::machine::Machine;
use cnc_core::program::Program;
use std::sync::atomic::AtomicBool;
use std::sync::mpsc;
use std::sync::Arc;

/// Installs a non-blocking rolling-file subscriber so FSM/transport log
/// traffic doesn't interleave with the CSV progress table on stdout. The
/// returned guard must stay alive for the duration of `main` or buffered
/// log lines are dropped on exit.
fn init_logging() -> tracing_appender::non_blocking::WorkerGuard {
    let file_appender = tracing_appender::rolling::never(".", "cnc-ctl.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(writer)
        .init();
    guard
}

/// Spawns a console-input thread translating lines to operator commands:
/// an empty line is "start/advance" (spacebar in the original's raw
/// keystroke UI), `q` requests STOP. No raw-terminal library is in the
/// dependency stack, so this reads whole lines rather than single
/// keystrokes.
fn spawn_console(tx: mpsc::Sender<OperatorCommand>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut line = String::new();
        loop {
            line.clear();
            match stdin.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {
                    let trimmed = line.trim();
                    let cmd = if trimmed.eq_ignore_ascii_case("q") {
                        OperatorCommand::Quit
                    } else {
                        OperatorCommand::Start
                    };
                    if tx.send(cmd).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });
}

fn main() {
    let _log_guard = init_logging();
    let args = CtlArgs::parse();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "cnc-core controller starting"
    );

    let config = match Config::load(&args.ini_file) {
        Ok(c) => c,
        Err(err) => {
            tracing::error!(%err, "failed to load configuration");
            std::process::exit(1);
        }
    };

    let program = match Program::parse(&args.gcode_file, &config.machine) {
        Ok(p) => p,
        Err(err) => {
            tracing::error!(%err, "failed to parse G-code program");
            std::process::exit(1);
        }
    };

    let transport = match RumqttcTransport::new(&config.mqtt) {
        Ok(t) => t,
        Err(err) => {
            tracing::error!(%err, "failed to construct MQTT transport");
            std::process::exit(1);
        }
    };
    let machine = Machine::new(config.machine.clone(), Box::new(transport));

    let exit_requested = Arc::new(AtomicBool::new(false));
    if let Err(err) = register_sigint(exit_requested.clone()) {
        tracing::warn!(%err, "could not install SIGINT handler, Ctrl-C will not stop the controller cleanly");
    }

    let (tx, rx) = mpsc::channel();
    spawn_console(tx);

    let mut fsm = Fsm::new(machine, program, rx, exit_requested);
    let result = fsm.run();

    match result {
        Ok(()) => {
            tracing::info!(ticks = fsm.tick_count(), t_tot = fsm.t_tot(), "controller stopped");
            std::process::exit(0);
        }
        Err(err) => {
            tracing::error!(%err, "controller exited with a fatal error");
            std::process::exit(1);
        }
    }
}

fn register_sigint(flag: Arc<AtomicBool>) -> Result<(), signal_hook::Error> {
    signal_hook::flag::register(signal_hook::consts::SIGINT, flag).map(|_| ())
}
