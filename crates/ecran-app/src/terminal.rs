use std::io::{self, Stdout, Write};

use crossterm::cursor::MoveTo;
use crossterm::style::Print;
use crossterm::terminal::{
    self as term, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::{execute, queue};
use ecran_vt::{is_printable, Surface, BLANK};

use crate::error::AppError;

/// Real terminal driven through crossterm.
///
/// Drawing commands are queued and only reach the terminal on
/// [`Surface::flush`].
pub struct Terminal<W: Write = Stdout> {
    out: W,
}

impl Terminal {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Terminal<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> Surface for Terminal<W> {
    fn clear_all(&mut self) -> io::Result<()> {
        queue!(self.out, Clear(ClearType::All))
    }

    fn clear_line(&mut self, row: u16) -> io::Result<()> {
        queue!(self.out, MoveTo(0, row), Clear(ClearType::CurrentLine))
    }

    fn put_text(&mut self, row: u16, col: u16, text: &[u8]) -> io::Result<()> {
        let text: String = text
            .iter()
            .map(|&b| if is_printable(b) { b } else { BLANK })
            .map(char::from)
            .collect();
        queue!(self.out, MoveTo(col, row), Print(text))
    }

    fn move_cursor(&mut self, row: u16, col: u16) -> io::Result<()> {
        queue!(self.out, MoveTo(col, row))
    }

    fn bell(&mut self) -> io::Result<()> {
        queue!(self.out, Print('\x07'))?;
        self.out.flush()
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// Size of the real terminal as `(cols, rows)`.
///
/// One row is reserved for the status bar, so anything shorter than two
/// rows cannot host a session.
pub fn geometry() -> Result<(u16, u16), AppError> {
    let (cols, rows) = term::size()?;
    check_geometry(cols, rows)
}

fn check_geometry(cols: u16, rows: u16) -> Result<(u16, u16), AppError> {
    if rows < 2 || cols == 0 {
        return Err(AppError::TerminalTooSmall { cols, rows });
    }
    Ok((cols, rows))
}

/// Puts the terminal into raw mode on the alternate screen and undoes it
/// again on [`restore`](Self::restore) or drop.
pub struct TerminalGuard {
    active: bool,
}

impl TerminalGuard {
    pub fn enter() -> io::Result<Self> {
        term::enable_raw_mode()?;
        let mut guard = Self { active: true };
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen, Clear(ClearType::All)) {
            let _ = guard.restore();
            return Err(e);
        }
        Ok(guard)
    }

    pub fn restore(&mut self) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        execute!(io::stdout(), LeaveAlternateScreen)?;
        term::disable_raw_mode()
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            log::warn!("failed to restore terminal: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn output(f: impl FnOnce(&mut Terminal<Vec<u8>>) -> io::Result<()>) -> String {
        let mut terminal = Terminal::new(Vec::new());
        f(&mut terminal).unwrap();
        String::from_utf8(terminal.out).unwrap()
    }

    #[test]
    fn test_put_text_positions_then_prints() {
        assert_eq!(output(|t| t.put_text(0, 2, b"hi")), "\x1b[1;3Hhi");
    }

    #[test]
    fn test_put_text_masks_control_bytes() {
        assert_eq!(output(|t| t.put_text(4, 0, b"a\x07b")), "\x1b[5;1Ha b");
    }

    #[test]
    fn test_bell() {
        assert_eq!(output(|t| t.bell()), "\x07");
    }

    #[test]
    fn test_clear_line_moves_to_row_start() {
        assert_eq!(output(|t| t.clear_line(3)), "\x1b[4;1H\x1b[2K");
    }

    #[test]
    fn test_geometry_limits() {
        assert!(matches!(
            check_geometry(80, 1),
            Err(AppError::TerminalTooSmall { cols: 80, rows: 1 })
        ));
        assert!(check_geometry(0, 24).is_err());
        assert_eq!(check_geometry(80, 2).unwrap(), (80, 2));
    }
}
