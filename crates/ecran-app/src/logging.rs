use std::fs::File;
use std::path::Path;

use log::LevelFilter;
use simplelog::{ConfigBuilder, WriteLogger};

use crate::cli::Config;
use crate::error::AppError;

/// Install the file logger when an output file was requested.
///
/// The terminal belongs to the sessions, so nothing is ever logged to it;
/// without `-o` no logger is installed at all.
pub fn init(config: &Config) -> Result<(), AppError> {
    let Some(path) = &config.log_file else {
        return Ok(());
    };
    let file = open_log_file(path)?;
    let log_config = ConfigBuilder::new()
        .set_thread_level(LevelFilter::Error)
        .set_target_level(LevelFilter::Error)
        .build();
    WriteLogger::init(config.log_level, log_config, file)?;
    log::info!("ecran {} started", env!("CARGO_PKG_VERSION"));
    Ok(())
}

/// Create (or truncate) the diagnostic output file.
fn open_log_file(path: &Path) -> Result<File, AppError> {
    File::create(path).map_err(|source| AppError::LogFile {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_log_file_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ecran.log");
        std::fs::write(&path, "stale").unwrap();

        open_log_file(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_open_log_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("ecran.log");

        let err = open_log_file(&path).unwrap_err();
        assert!(matches!(&err, AppError::LogFile { path: p, .. } if p == &path));
        assert!(err.to_string().contains("ecran.log"));
    }

    #[test]
    fn test_no_output_file_installs_nothing() {
        let config = Config {
            log_file: None,
            log_level: LevelFilter::Debug,
            initial: None,
            default: ecran_pty::ProgramSpec::new("/bin/sh", Vec::new()),
        };
        assert!(init(&config).is_ok());
    }
}
