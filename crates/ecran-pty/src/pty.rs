use std::io::{Read, Write};

use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};

/// Errors from PTY operations.
#[derive(Debug, thiserror::Error)]
pub enum PtyError {
    #[error("PTY spawn failed: {0}")]
    Spawn(String),
    #[error("PTY I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Owns a portable-pty child process, master pair, reader, and writer.
pub struct PtyHandle {
    // Dropping the master closes the PTY, so it must outlive the reader.
    _master: Box<dyn MasterPty + Send>,
    reader: Option<Box<dyn Read + Send>>,
    writer: Box<dyn Write + Send>,
    child: Box<dyn Child + Send + Sync>,
    killed: bool,
}

impl PtyHandle {
    /// Spawn `program` with `args` in a new PTY of the given dimensions.
    ///
    /// The child sees `TERM=dumb`, since virtual screens only understand a
    /// handful of control sequences.
    pub fn spawn(program: &str, args: &[String], cols: u16, rows: u16) -> Result<Self, PtyError> {
        let pty_system = native_pty_system();

        let pair = pty_system
            .openpty(PtySize {
                rows: rows.max(1),
                cols: cols.max(1),
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| PtyError::Spawn(format!("failed to open PTY: {e}")))?;

        let mut cmd = CommandBuilder::new(program);
        cmd.args(args);
        cmd.env("TERM", "dumb");
        if let Ok(cwd) = std::env::current_dir() {
            cmd.cwd(cwd);
        }

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| PtyError::Spawn(format!("failed to spawn {program}: {e}")))?;

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| PtyError::Spawn(format!("failed to clone reader: {e}")))?;

        let writer = pair
            .master
            .take_writer()
            .map_err(|e| PtyError::Spawn(format!("failed to take writer: {e}")))?;

        Ok(Self {
            _master: pair.master,
            reader: Some(reader),
            writer,
            child,
            killed: false,
        })
    }

    /// Write bytes to the PTY master (user input -> child).
    pub fn write(&mut self, data: &[u8]) -> Result<(), PtyError> {
        self.writer.write_all(data)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Hand the PTY reader over to a dedicated I/O thread.
    ///
    /// Reads block, so they must not happen on the control loop. Returns
    /// `None` if the reader was already taken.
    pub fn take_reader(&mut self) -> Option<Box<dyn Read + Send>> {
        self.reader.take()
    }

    /// Check if the child process is still alive.
    pub fn is_alive(&mut self) -> bool {
        self.try_wait().is_none()
    }

    /// Get the child process exit status if it has exited.
    ///
    /// Returns `None` if the process is still running.
    pub fn try_wait(&mut self) -> Option<u32> {
        match self.child.try_wait() {
            Ok(Some(status)) => Some(status.exit_code()),
            _ => None,
        }
    }

    /// Kill the child and reap it. Calling this again is a no-op.
    pub fn kill(&mut self) {
        if self.killed {
            return;
        }
        self.killed = true;
        if self.try_wait().is_some() {
            return;
        }
        if let Err(e) = self.child.kill() {
            log::warn!("failed to kill child: {e}");
        }
        if let Err(e) = self.child.wait() {
            log::warn!("failed to reap child: {e}");
        }
    }
}

/// Returns the user's default shell, falling back to `/bin/bash`.
pub fn default_shell() -> String {
    std::env::var("SHELL")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "/bin/bash".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::{Duration, Instant};

    fn sh() -> PtyHandle {
        PtyHandle::spawn("/bin/sh", &[], 80, 24).unwrap()
    }

    #[test]
    fn test_spawn_pty() {
        let handle = PtyHandle::spawn("/bin/sh", &[], 80, 24);
        assert!(handle.is_ok(), "Failed to spawn PTY: {:?}", handle.err());
        let mut handle = handle.unwrap();
        assert!(handle.is_alive());
        handle.kill();
    }

    #[test]
    fn test_spawn_missing_program_fails() {
        let result = PtyHandle::spawn("/nonexistent/ecran-test-binary", &[], 80, 24);
        assert!(matches!(result, Err(PtyError::Spawn(_))));
    }

    #[test]
    fn test_write_read_echo() {
        let mut handle = sh();
        let mut reader = handle.take_reader().unwrap();
        assert!(handle.take_reader().is_none());

        handle.write(b"echo ECRAN_TEST_OK\n").unwrap();

        let collector = thread::spawn(move || {
            let mut output = Vec::new();
            let mut buf = [0u8; 4096];
            while let Ok(n) = reader.read(&mut buf) {
                if n == 0 {
                    break;
                }
                output.extend_from_slice(&buf[..n]);
                if String::from_utf8_lossy(&output).contains("ECRAN_TEST_OK") {
                    break;
                }
            }
            output
        });

        let output = collector.join().unwrap();
        let text = String::from_utf8_lossy(&output);
        assert!(text.contains("ECRAN_TEST_OK"), "got: {text}");
        handle.kill();
    }

    #[test]
    fn test_child_exit() {
        let mut handle = sh();
        let mut reader = handle.take_reader().unwrap();
        handle.write(b"exit 0\n").unwrap();

        let drain = thread::spawn(move || {
            let mut buf = [0u8; 4096];
            while let Ok(n) = reader.read(&mut buf) {
                if n == 0 {
                    break;
                }
            }
        });
        let _ = drain.join();

        let deadline = Instant::now() + Duration::from_secs(3);
        while Instant::now() < deadline && handle.is_alive() {
            thread::sleep(Duration::from_millis(50));
        }
        assert_eq!(handle.try_wait(), Some(0));
    }

    #[test]
    fn test_kill_is_idempotent() {
        let mut handle = sh();
        handle.kill();
        assert!(!handle.is_alive());
        handle.kill();
        assert!(!handle.is_alive());
    }

    #[test]
    fn test_default_shell_detection() {
        let shell = default_shell();
        assert!(!shell.is_empty(), "Default shell should not be empty");
        assert!(
            shell.starts_with('/'),
            "Default shell should be an absolute path, got: {shell}"
        );
    }
}
