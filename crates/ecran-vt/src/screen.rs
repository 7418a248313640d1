use std::io;

use bitflags::bitflags;

use crate::escape::{self, SavedCursor, ESC};
use crate::row::{is_printable, Row};
use crate::source::ByteSource;
use crate::surface::Surface;

const BEL: u8 = 0x07;

/// Cursor position on a virtual screen, 0-indexed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cursor {
    pub line: u16,
    pub col: u16,
}

impl Cursor {
    pub const fn new(line: u16, col: u16) -> Self {
        Self { line, col }
    }
}

bitflags! {
    /// Side effects of [`VirtualScreen::put`] that concern the physical
    /// terminal. The owner of the screen decides whether to apply them.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Effect: u8 {
        /// Ring the terminal bell.
        const BELL    = 0b0000_0001;
        /// Every row was marked dirty and must be repainted now.
        const REPAINT = 0b0000_0010;
    }
}

/// In-memory character buffer for one session.
///
/// Rows live in a ring: logical row `i` is stored at
/// `(base + i) % height`, so scrolling only advances `base` and blanks the
/// recycled row.
#[derive(Clone, Debug)]
pub struct VirtualScreen {
    rows: Vec<Row>,
    base: usize,
    width: u16,
    cursor: Cursor,
}

impl VirtualScreen {
    /// Create a blank screen with the cursor at the origin and no dirty rows.
    ///
    /// Zero dimensions are bumped to one so the cursor is always addressable.
    pub fn new(width: u16, height: u16) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            rows: (0..height).map(|_| Row::new(width as usize)).collect(),
            base: 0,
            width,
            cursor: Cursor::default(),
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.rows.len() as u16
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Move the cursor, clamping it into the screen.
    pub fn set_cursor(&mut self, cursor: Cursor) {
        self.cursor = Cursor {
            line: cursor.line.min(self.height() - 1),
            col: cursor.col.min(self.width - 1),
        };
    }

    fn slot(&self, line: u16) -> usize {
        (self.base + line as usize) % self.rows.len()
    }

    /// Logical row `line` (0 is the top of the screen).
    ///
    /// # Panics
    /// If `line >= height()`.
    pub fn row(&self, line: u16) -> &Row {
        assert!(line < self.height(), "row {line} out of range");
        &self.rows[self.slot(line)]
    }

    fn row_mut(&mut self, line: u16) -> &mut Row {
        let slot = self.slot(line);
        &mut self.rows[slot]
    }

    /// Raw stored bytes of a row.
    pub fn row_bytes(&self, line: u16) -> &[u8] {
        self.row(line).cells()
    }

    pub fn is_dirty(&self, line: u16) -> bool {
        self.row(line).is_dirty()
    }

    pub fn has_dirty_rows(&self) -> bool {
        self.rows.iter().any(Row::is_dirty)
    }

    pub fn mark_all_dirty(&mut self) {
        self.rows.iter_mut().for_each(Row::mark_dirty);
    }

    /// Blank the whole buffer and home the cursor.
    pub fn clear(&mut self) {
        for row in &mut self.rows {
            row.clear();
            row.mark_dirty();
        }
        self.cursor = Cursor::default();
    }

    /// Blank one row; the cursor does not move.
    pub fn clear_line(&mut self, line: u16) {
        let row = self.row_mut(line);
        row.clear();
        row.mark_dirty();
    }

    /// Replace a row's contents with `text` (truncated to the width).
    pub fn set_line(&mut self, line: u16, text: &[u8]) {
        if line >= self.height() {
            return;
        }
        let row = self.row_mut(line);
        row.fill_from(text);
        row.mark_dirty();
    }

    /// Output one byte to the screen.
    ///
    /// Printable bytes are stored at the cursor, which then advances one
    /// column; at the last column it stays put (no wrap). `\n` moves to the
    /// next line, scrolling when already on the last one, and blanks the
    /// destination row. `\r` returns to column 0. `ESC` hands over to the
    /// control-sequence interpreter, which pulls further bytes from `input`.
    /// Anything else is dropped.
    pub fn put<S: ByteSource + ?Sized>(
        &mut self,
        ch: u8,
        input: &mut S,
        saved: &mut SavedCursor,
    ) -> Effect {
        let start_line = self.cursor.line;
        let mut effect = Effect::empty();

        match ch {
            _ if is_printable(ch) => {
                let Cursor { line, col } = self.cursor;
                self.row_mut(line).set(col as usize, ch);
                if col + 1 < self.width {
                    self.cursor.col += 1;
                }
            }
            b'\n' => self.newline(),
            b'\r' => self.cursor.col = 0,
            BEL => effect |= Effect::BELL,
            ESC => {
                let outcome = escape::interpret(self, input, saved);
                log::debug!("escape sequence: {outcome:?}");
                self.mark_all_dirty();
                effect |= Effect::REPAINT;
            }
            _ => {}
        }

        self.row_mut(start_line).mark_dirty();
        let line = self.cursor.line;
        self.row_mut(line).mark_dirty();
        effect
    }

    fn newline(&mut self) {
        let last = self.height() - 1;
        if self.cursor.line >= last {
            self.scroll_up();
        } else {
            self.cursor.line = (self.cursor.line + 1) % self.height();
        }
        let line = self.cursor.line;
        self.row_mut(line).clear();
    }

    /// Drop the top row and recycle its storage as a blank bottom row.
    /// Every row is dirtied since all of them moved on the display.
    fn scroll_up(&mut self) {
        self.base = (self.base + 1) % self.rows.len();
        let last = self.height() - 1;
        self.row_mut(last).clear();
        self.mark_all_dirty();
    }

    /// Push bytes through [`put`](Self::put) until `source` has none ready.
    /// Sources may cap how much they yield per call.
    ///
    /// With a `display` (the foreground screen) bells ring it and repaint
    /// requests are honored before the next byte is processed. Returns the
    /// number of bytes taken by the outer loop.
    pub fn feed<S: ByteSource + ?Sized>(
        &mut self,
        source: &mut S,
        saved: &mut SavedCursor,
        mut display: Option<&mut dyn Surface>,
    ) -> io::Result<usize> {
        let mut n = 0;
        while let Some(byte) = source.try_next_byte() {
            n += 1;
            let effect = self.put(byte, source, saved);
            if let Some(target) = display.as_deref_mut() {
                if effect.contains(Effect::BELL) {
                    target.bell()?;
                }
                if effect.contains(Effect::REPAINT) {
                    self.sync_to_display(target)?;
                }
            }
        }
        Ok(n)
    }

    /// Redraw only the dirty rows on `target`, then place the cursor.
    pub fn sync_to_display<S: Surface + ?Sized>(&mut self, target: &mut S) -> io::Result<()> {
        for line in 0..self.height() {
            if self.is_dirty(line) {
                self.draw_row(target, line)?;
                self.row_mut(line).mark_clean();
            }
        }
        target.move_cursor(self.cursor.line, self.cursor.col)?;
        target.flush()
    }

    /// Clear `target` and repaint every row regardless of dirty state.
    pub fn show_on<S: Surface + ?Sized>(&mut self, target: &mut S) -> io::Result<()> {
        target.clear_all()?;
        for line in 0..self.height() {
            self.draw_row(target, line)?;
            self.row_mut(line).mark_clean();
        }
        target.move_cursor(self.cursor.line, self.cursor.col)?;
        target.flush()
    }

    fn draw_row<S: Surface + ?Sized>(&self, target: &mut S, line: u16) -> io::Result<()> {
        target.clear_line(line)?;
        let text = self.row(line).visible();
        if !text.is_empty() {
            target.put_text(line, 0, &text)?;
        }
        Ok(())
    }
}
