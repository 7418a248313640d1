use std::io;

use ecran_vt::{is_printable, Surface, BLANK};

/// Rows taken by the status bar at the bottom of the terminal.
pub const STATUS_LINES: u16 = 1;

/// One-line message area below the session screen.
pub struct StatusBar {
    row: u16,
    width: u16,
    message: String,
    longest: usize,
}

impl StatusBar {
    pub fn new(row: u16, width: u16) -> Self {
        Self {
            row,
            width,
            message: String::new(),
            longest: 0,
        }
    }

    /// Replace the message and redraw the bar.
    ///
    /// Text past the terminal width is cut off. The cursor is left wherever
    /// drawing put it; callers restore it.
    pub fn set<S: Surface + ?Sized>(&mut self, message: &str, target: &mut S) -> io::Result<()> {
        self.longest = self.longest.max(message.len());
        self.message = message.to_string();
        self.redraw(target)
    }

    /// Draw the current message again, e.g. after a full-screen clear.
    ///
    /// Blanks are written out to the longest message seen so far (capped at
    /// the width), which erases whatever an earlier message left behind.
    pub fn redraw<S: Surface + ?Sized>(&self, target: &mut S) -> io::Result<()> {
        let width = self.width as usize;
        let mut text: Vec<u8> = self
            .message
            .bytes()
            .map(|b| if is_printable(b) { b } else { b'?' })
            .take(width)
            .collect();
        let span = self.longest.min(width);
        if text.len() < span {
            text.resize(span, BLANK);
        }
        if !text.is_empty() {
            target.put_text(self.row, 0, &text)?;
        }
        target.flush()
    }

    #[cfg(test)]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Length of the longest message shown so far.
    #[cfg(test)]
    pub fn longest(&self) -> usize {
        self.longest
    }
}
