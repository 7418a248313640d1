/// Byte stored in a cell that has never been written or has been erased.
pub const BLANK: u8 = b' ';

/// Returns `true` for bytes that are drawn as-is (`0x20..=0x7e`).
pub const fn is_printable(byte: u8) -> bool {
    matches!(byte, 0x20..=0x7e)
}

/// A single line of a virtual screen.
///
/// The row always holds exactly `width` cells. Non-printable bytes may end up
/// stored in a cell but are never emitted when the row is drawn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Row {
    cells: Vec<u8>,
    dirty: bool,
}

impl Row {
    /// Create a blank, clean row of the given width.
    pub fn new(width: usize) -> Self {
        Self {
            cells: vec![BLANK; width],
            dirty: false,
        }
    }

    /// Raw cell contents, control bytes included.
    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    /// Number of cells.
    pub fn width(&self) -> usize {
        self.cells.len()
    }

    /// Store a byte at `col`. Out-of-range columns are ignored.
    pub fn set(&mut self, col: usize, byte: u8) {
        if let Some(cell) = self.cells.get_mut(col) {
            *cell = byte;
        }
    }

    /// Reset every cell to [`BLANK`].
    pub fn clear(&mut self) {
        self.cells.fill(BLANK);
    }

    /// Replace the row with `text`, truncated to the row width and padded
    /// with blanks.
    pub fn fill_from(&mut self, text: &[u8]) {
        self.clear();
        let n = text.len().min(self.cells.len());
        self.cells[..n].copy_from_slice(&text[..n]);
    }

    /// Whether the row changed since it was last drawn.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Schedule the row for the next redraw.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Record that the display matches the row.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// The visible text of the row: non-printable cells render as blanks and
    /// trailing blanks are trimmed.
    pub fn visible(&self) -> Vec<u8> {
        let mut out: Vec<u8> = self
            .cells
            .iter()
            .map(|&b| if is_printable(b) { b } else { BLANK })
            .collect();
        while out.last() == Some(&BLANK) {
            out.pop();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_row_is_blank_and_clean() {
        let row = Row::new(4);
        assert_eq!(row.cells(), b"    ");
        assert!(!row.is_dirty());
    }

    #[test]
    fn test_set_out_of_range_is_ignored() {
        let mut row = Row::new(2);
        row.set(5, b'x');
        assert_eq!(row.cells(), b"  ");
    }

    #[test]
    fn test_fill_from_truncates() {
        let mut row = Row::new(3);
        row.fill_from(b"abcdef");
        assert_eq!(row.cells(), b"abc");
        row.fill_from(b"z");
        assert_eq!(row.cells(), b"z  ");
    }

    #[test]
    fn test_visible_skips_control_bytes() {
        let mut row = Row::new(6);
        row.set(0, b'a');
        row.set(1, 0x01);
        row.set(2, b'b');
        assert_eq!(row.visible(), b"a b");
    }

    #[test]
    fn test_printable_range() {
        assert!(is_printable(b' '));
        assert!(is_printable(b'~'));
        assert!(!is_printable(0x7f));
        assert!(!is_printable(b'\n'));
        assert!(!is_printable(0xc3));
    }
}
