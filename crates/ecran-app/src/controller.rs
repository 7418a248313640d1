//! The multiplexer control loop.
//!
//! Each iteration pumps output from every session into its screen (only the
//! foreground one reaches the terminal), reaps sessions whose child went
//! away, then polls the keyboard once. Keys are forwarded to the foreground
//! session except for the command prefix, which switches input into
//! blocking mode and dispatches on the next key.

use std::thread;
use std::time::Duration;

use ecran_pty::{Launcher, Session, SessionTable, TableFull, MAX_SESSIONS};
use ecran_vt::{SavedCursor, Surface};

use crate::error::AppError;
use crate::help::HelpOverlay;
use crate::input::Input;
use crate::status::{StatusBar, STATUS_LINES};

/// Command prefix key (Ctrl-A).
pub const PREFIX: u8 = 0x01;

/// Dismisses the help screen.
const ESC: u8 = 0x1b;

/// How long the loop sleeps after an iteration without keyboard input.
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// What the loop should do after one iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    /// A key was handled; go again right away.
    Continue,
    /// Nothing to read; wait [`POLL_INTERVAL`] before going again.
    Idle,
    Quit,
}

pub struct Controller<L: Launcher, T: Surface> {
    launcher: L,
    table: SessionTable<L::Session>,
    foreground: Option<usize>,
    saved_cursor: SavedCursor,
    status: StatusBar,
    help: HelpOverlay,
    term: T,
    input: Input,
    cols: u16,
    rows: u16,
}

impl<L: Launcher, T: Surface> Controller<L, T> {
    /// `rows` is the full terminal height; the bottom line goes to the
    /// status bar and sessions get the rest.
    pub fn new(launcher: L, term: T, input: Input, cols: u16, rows: u16) -> Self {
        let screen_rows = rows.saturating_sub(STATUS_LINES).max(1);
        Self {
            launcher,
            table: SessionTable::new(),
            foreground: None,
            saved_cursor: SavedCursor::new(),
            status: StatusBar::new(screen_rows, cols),
            help: HelpOverlay::new(cols, screen_rows),
            term,
            input,
            cols,
            rows: screen_rows,
        }
    }

    #[cfg(test)]
    pub fn foreground(&self) -> Option<usize> {
        self.foreground
    }

    #[cfg(test)]
    pub fn table(&self) -> &SessionTable<L::Session> {
        &self.table
    }

    #[cfg(test)]
    pub fn status(&self) -> &StatusBar {
        &self.status
    }

    #[cfg(test)]
    pub fn terminal(&self) -> &T {
        &self.term
    }

    /// Clear the terminal and open the first session.
    pub fn start(&mut self) -> Result<(), AppError> {
        self.term.clear_all()?;
        self.new_session()
    }

    /// Run until the user quits or a fatal error occurs. Every remaining
    /// session is killed on the way out.
    pub fn run(&mut self) -> Result<(), AppError> {
        let result = loop {
            match self.step() {
                Ok(Flow::Continue) => {}
                Ok(Flow::Idle) => thread::sleep(POLL_INTERVAL),
                Ok(Flow::Quit) => break Ok(()),
                Err(e) => break Err(e),
            }
        };
        self.shutdown();
        result
    }

    /// One loop iteration.
    pub fn step(&mut self) -> Result<Flow, AppError> {
        self.pump_output()?;
        self.reap()?;
        match self.input.read_byte() {
            Some(PREFIX) => self.command(),
            Some(byte) => {
                self.forward(byte)?;
                Ok(Flow::Continue)
            }
            None if self.input.is_closed() => {
                log::info!("keyboard input closed; quitting");
                Ok(Flow::Quit)
            }
            None => Ok(Flow::Idle),
        }
    }

    /// Kill every session in slot order. Safe to call more than once.
    pub fn shutdown(&mut self) {
        for (index, mut session) in self.table.drain_all() {
            log::info!("terminating session {index}");
            session.terminate();
        }
        self.foreground = None;
    }

    fn pump_output(&mut self) -> Result<(), AppError> {
        let occupied: Vec<usize> = self.table.occupied().collect();
        for index in occupied {
            let Some(session) = self.table.get_mut(index) else {
                continue;
            };
            let display: Option<&mut dyn Surface> = if self.foreground == Some(index) {
                Some(&mut self.term)
            } else {
                None
            };
            if let Err(e) = session.process_output(&mut self.saved_cursor, display) {
                log::warn!("session {index}: output processing failed: {e}");
            }
        }

        if let Some(session) = self.foreground.and_then(|fg| self.table.get_mut(fg)) {
            if session.screen().has_dirty_rows() {
                session.screen_mut().sync_to_display(&mut self.term)?;
            }
        }
        Ok(())
    }

    fn reap(&mut self) -> Result<(), AppError> {
        let occupied: Vec<usize> = self.table.occupied().collect();
        for index in occupied {
            let exited = self
                .table
                .get_mut(index)
                .is_some_and(|session| session.has_exited());
            if exited {
                log::info!("session {index} exited");
                self.retire(index)?;
                self.post(&format!("session {index} exited"))?;
            }
        }
        Ok(())
    }

    fn forward(&mut self, byte: u8) -> Result<(), AppError> {
        let Some(session) = self.foreground.and_then(|fg| self.table.get_mut(fg)) else {
            return self.alert();
        };
        if let Err(e) = session.write_input(&[byte]) {
            log::warn!("failed to forward input: {e}");
        }
        Ok(())
    }

    fn command(&mut self) -> Result<Flow, AppError> {
        let _blocking = self.input.blocking();
        let Some(key) = self.input.read_byte() else {
            return Ok(Flow::Quit);
        };
        log::debug!("command key {key:#04x}");
        match key {
            b'q' => return Ok(Flow::Quit),
            b'0'..=b'9' => self.switch_to(usize::from(key - b'0'))?,
            b'n' => self.new_session()?,
            b'k' => self.kill_command()?,
            b'h' => self.show_help()?,
            b's' => log::debug!("split screen is not available"),
            _ => self.alert()?,
        }
        Ok(Flow::Continue)
    }

    fn switch_to(&mut self, index: usize) -> Result<(), AppError> {
        if self.table.get(index).is_none() {
            return self.post(&format!("session {index} not initialized"));
        }
        log::info!("switching to session {index}");
        self.foreground = Some(index);
        self.repaint()
    }

    fn new_session(&mut self) -> Result<(), AppError> {
        if self.table.is_full() {
            return self.refuse_new_session();
        }
        let session = self.launcher.launch(self.cols, self.rows)?;
        let index = match self.table.assign(session) {
            Ok(index) => index,
            Err(TableFull) => return self.refuse_new_session(),
        };
        log::info!("session {index} created");
        self.foreground = Some(index);
        self.repaint()?;
        self.post(&format!("session {index} created"))
    }

    fn refuse_new_session(&mut self) -> Result<(), AppError> {
        log::warn!("all {MAX_SESSIONS} session slots are in use");
        self.alert()?;
        self.post("maximum number of sessions reached")
    }

    fn kill_command(&mut self) -> Result<(), AppError> {
        let index = match self.input.read_byte() {
            Some(key @ b'0'..=b'9') => usize::from(key - b'0'),
            _ => {
                self.alert()?;
                return self.post("kill expects a digit 0-9");
            }
        };
        if self.table.get(index).is_none() {
            self.alert()?;
            return self.post(&format!("no session at slot {index}"));
        }
        log::info!("killing session {index}");
        self.retire(index)?;
        self.post(&format!("session {index} killed"))
    }

    /// Terminate and remove a session, moving the foreground elsewhere if
    /// it was the one removed.
    fn retire(&mut self, index: usize) -> Result<(), AppError> {
        if let Some(mut session) = self.table.remove(index) {
            session.terminate();
        }
        if self.foreground == Some(index) {
            self.foreground = self.table.first_occupied();
            self.repaint()?;
        }
        Ok(())
    }

    fn show_help(&mut self) -> Result<(), AppError> {
        let activity = self.table.activities();
        self.help.show_on(&activity, &mut self.term)?;
        loop {
            match self.input.read_byte() {
                Some(ESC) | None => break,
                Some(_) => {}
            }
        }
        self.repaint()
    }

    /// Paint the foreground screen (or a blank one) and the status bar.
    fn repaint(&mut self) -> Result<(), AppError> {
        match self.foreground.and_then(|fg| self.table.get_mut(fg)) {
            Some(session) => session.screen_mut().show_on(&mut self.term)?,
            None => {
                self.term.clear_all()?;
                self.term.flush()?;
            }
        }
        self.status.redraw(&mut self.term)?;
        self.place_cursor()
    }

    fn post(&mut self, message: &str) -> Result<(), AppError> {
        log::debug!("status: {message}");
        self.status.set(message, &mut self.term)?;
        self.place_cursor()
    }

    fn place_cursor(&mut self) -> Result<(), AppError> {
        if let Some(session) = self.foreground.and_then(|fg| self.table.get(fg)) {
            let cursor = session.screen().cursor();
            self.term.move_cursor(cursor.line, cursor.col)?;
        }
        self.term.flush()?;
        Ok(())
    }

    fn alert(&mut self) -> Result<(), AppError> {
        self.term.bell()?;
        Ok(())
    }
}
