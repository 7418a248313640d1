mod cli;
mod controller;
mod error;
mod help;
mod input;
mod logging;
mod status;
mod terminal;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use ecran_pty::PtyLauncher;

use cli::{Cli, Config};
use controller::Controller;
use input::Input;
use terminal::{Terminal, TerminalGuard};

fn main() -> ExitCode {
    let config = Config::from_cli(Cli::parse());

    // Logging comes up before the terminal is touched so that a bad -o
    // path is reported on a sane terminal.
    if let Err(e) = logging::init(&config) {
        eprintln!("ecran: {e}");
        return ExitCode::FAILURE;
    }

    match run(config) {
        Ok(()) => {
            log::info!("exiting");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("fatal: {e:#}");
            eprintln!("ecran: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: Config) -> anyhow::Result<()> {
    let (cols, rows) = terminal::geometry()?;
    log::info!("terminal is {cols}x{rows}");

    let mut guard = TerminalGuard::enter().context("failed to prepare the terminal")?;
    let input = Input::from_stdin().context("failed to start the keyboard reader")?;
    let launcher = PtyLauncher::new(config.initial, config.default);

    let mut controller = Controller::new(launcher, Terminal::stdout(), input, cols, rows);
    let result = controller.start().and_then(|()| controller.run());
    // Sessions die before the terminal is handed back.
    drop(controller);
    guard.restore()?;
    Ok(result?)
}
