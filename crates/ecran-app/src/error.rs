use std::path::PathBuf;

use ecran_pty::PtyError;

/// Conditions that end the program with a failure status.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("terminal I/O failed: {0}")]
    Terminal(#[from] std::io::Error),
    #[error("could not start session: {0}")]
    Spawn(#[from] PtyError),
    #[error("could not open diagnostic output {}: {source}", path.display())]
    LogFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not install logger: {0}")]
    Logger(#[from] log::SetLoggerError),
    #[error("terminal too small ({cols}x{rows}); at least two rows are needed")]
    TerminalTooSmall { cols: u16, rows: u16 },
}
