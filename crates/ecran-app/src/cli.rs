use std::path::PathBuf;

use clap::Parser;
use ecran_pty::ProgramSpec;
use log::LevelFilter;

/// Multiplex up to ten shell sessions onto one terminal.
///
/// Press Ctrl-A followed by `h` inside ecran for the list of commands.
#[derive(Debug, Parser)]
#[command(name = "ecran", version)]
pub struct Cli {
    /// Write diagnostic output to FILE
    #[arg(short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Verbosity of the diagnostic output (off, error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    pub log_level: LevelFilter,

    /// Program to run in the first session instead of the default shell
    #[arg(
        value_name = "COMMAND",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<String>,
}

/// Startup configuration resolved from the command line and environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub log_file: Option<PathBuf>,
    pub log_level: LevelFilter,
    /// Program for the very first session, if one was named.
    pub initial: Option<ProgramSpec>,
    /// Program for every session created with the `n` command.
    pub default: ProgramSpec,
}

impl Config {
    pub fn from_cli(cli: Cli) -> Self {
        Self::with_default(cli, ProgramSpec::default_shell())
    }

    fn with_default(cli: Cli, default: ProgramSpec) -> Self {
        let mut command = cli.command.into_iter();
        let initial = command
            .next()
            .map(|program| ProgramSpec::new(program, command.collect()));
        Self {
            log_file: cli.output,
            log_level: cli.log_level,
            initial,
            default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config(args: &[&str]) -> Config {
        let cli = Cli::try_parse_from(args).unwrap();
        Config::with_default(cli, ProgramSpec::new("/bin/sh", Vec::new()))
    }

    #[test]
    fn test_no_arguments() {
        assert_eq!(
            config(&["ecran"]),
            Config {
                log_file: None,
                log_level: LevelFilter::Info,
                initial: None,
                default: ProgramSpec::new("/bin/sh", Vec::new()),
            }
        );
    }

    #[test]
    fn test_output_file_and_level() {
        let config = config(&["ecran", "-o", "ecran.log", "--log-level", "debug"]);
        assert_eq!(config.log_file, Some(PathBuf::from("ecran.log")));
        assert_eq!(config.log_level, LevelFilter::Debug);
    }

    #[test]
    fn test_command_keeps_its_own_flags() {
        let config = config(&["ecran", "-o", "x.log", "top", "-d", "1"]);
        assert_eq!(
            config.initial,
            Some(ProgramSpec::new(
                "top",
                vec!["-d".to_string(), "1".to_string()]
            ))
        );
        assert_eq!(config.log_file, Some(PathBuf::from("x.log")));
    }

    #[test]
    fn test_bad_level_is_rejected() {
        assert!(Cli::try_parse_from(["ecran", "--log-level", "loud"]).is_err());
    }
}
