use std::io;

use crate::row::{is_printable, BLANK};

/// Drawing primitives of a physical (or simulated) terminal.
///
/// Rows and columns are absolute, 0-indexed positions on the surface.
/// Implementations may buffer; nothing is guaranteed visible before
/// [`Surface::flush`].
pub trait Surface {
    /// Erase the whole surface.
    fn clear_all(&mut self) -> io::Result<()>;

    /// Erase one row.
    fn clear_line(&mut self, row: u16) -> io::Result<()>;

    /// Draw `text` starting at `(row, col)`. Text running past the right edge
    /// is dropped.
    fn put_text(&mut self, row: u16, col: u16, text: &[u8]) -> io::Result<()>;

    /// Place the visible cursor.
    fn move_cursor(&mut self, row: u16, col: u16) -> io::Result<()>;

    /// Audible or visual alert.
    fn bell(&mut self) -> io::Result<()>;

    /// Push everything drawn so far to the output.
    fn flush(&mut self) -> io::Result<()>;
}

/// Headless [`Surface`] that draws into an in-memory grid.
#[derive(Clone, Debug)]
pub struct MemorySurface {
    cols: u16,
    grid: Vec<Vec<u8>>,
    cursor: (u16, u16),
    bells: usize,
    flushes: usize,
    full_clears: usize,
}

impl MemorySurface {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            cols,
            grid: vec![vec![BLANK; cols as usize]; rows as usize],
            cursor: (0, 0),
            bells: 0,
            flushes: 0,
            full_clears: 0,
        }
    }

    /// Text of a row with trailing blanks trimmed.
    pub fn line(&self, row: u16) -> String {
        self.grid
            .get(row as usize)
            .map(|cells| String::from_utf8_lossy(cells).trim_end().to_string())
            .unwrap_or_default()
    }

    pub fn cursor(&self) -> (u16, u16) {
        self.cursor
    }

    pub fn bells(&self) -> usize {
        self.bells
    }

    pub fn flushes(&self) -> usize {
        self.flushes
    }

    /// Number of [`Surface::clear_all`] calls seen so far.
    pub fn full_clears(&self) -> usize {
        self.full_clears
    }
}

impl Surface for MemorySurface {
    fn clear_all(&mut self) -> io::Result<()> {
        for row in &mut self.grid {
            row.fill(BLANK);
        }
        self.full_clears += 1;
        Ok(())
    }

    fn clear_line(&mut self, row: u16) -> io::Result<()> {
        if let Some(cells) = self.grid.get_mut(row as usize) {
            cells.fill(BLANK);
        }
        Ok(())
    }

    fn put_text(&mut self, row: u16, col: u16, text: &[u8]) -> io::Result<()> {
        let Some(cells) = self.grid.get_mut(row as usize) else {
            return Ok(());
        };
        for (i, &byte) in text.iter().enumerate() {
            let c = col as usize + i;
            if c >= self.cols as usize {
                break;
            }
            if is_printable(byte) {
                cells[c] = byte;
            }
        }
        Ok(())
    }

    fn move_cursor(&mut self, row: u16, col: u16) -> io::Result<()> {
        self.cursor = (row, col);
        Ok(())
    }

    fn bell(&mut self) -> io::Result<()> {
        self.bells += 1;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes += 1;
        Ok(())
    }
}
