//! The `ESC` subset understood by virtual screens.
//!
//! | sequence      | effect                                      |
//! |---------------|---------------------------------------------|
//! | `ESC [ s`     | save the cursor into the shared slot        |
//! | `ESC [ u`     | restore a pending save, then forget it      |
//! | `ESC [ 2 J`   | blank the buffer and home the cursor        |
//! | `ESC [ K`     | blank the cursor's row                      |
//! | `ESC [ <n> x` | numeric parameter, parsed then ignored      |
//!
//! Anything else aborts after the bytes already consumed.

use crate::screen::{Cursor, VirtualScreen};
use crate::source::ByteSource;

pub const ESC: u8 = 0x1b;

/// Single pending `ESC [ s` save, shared by every screen.
///
/// A newer save overwrites an older one; a restore consumes it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SavedCursor(Option<Cursor>);

impl SavedCursor {
    pub fn new() -> Self {
        Self(None)
    }

    pub fn save(&mut self, cursor: Cursor) {
        self.0 = Some(cursor);
    }

    pub fn take(&mut self) -> Option<Cursor> {
        self.0.take()
    }

    pub fn is_pending(&self) -> bool {
        self.0.is_some()
    }
}

/// What a single escape sequence turned out to be.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EscapeOutcome {
    /// The byte after `ESC` was not `[`.
    NotCsi,
    SaveCursor,
    /// `restored` is false when no save was pending.
    RestoreCursor { restored: bool },
    ClearScreen,
    ClearLine,
    /// A numeric parameter and the byte that ended it. Not acted upon.
    Parameter { value: u32, delimiter: u8 },
    /// Unknown byte after `ESC [`.
    Malformed(u8),
    /// The source ran dry mid-sequence.
    Truncated,
}

/// Interpret the bytes following an `ESC` already taken from `input`.
///
/// Continuation bytes are pulled with [`ByteSource::next_byte`], which may
/// wait. Only the screen's buffer and cursor are touched; repainting is up to
/// the caller.
pub fn interpret<S: ByteSource + ?Sized>(
    screen: &mut VirtualScreen,
    input: &mut S,
    saved: &mut SavedCursor,
) -> EscapeOutcome {
    match input.next_byte() {
        Some(b'[') => {}
        Some(_) => return EscapeOutcome::NotCsi,
        None => return EscapeOutcome::Truncated,
    }

    let Some(byte) = input.next_byte() else {
        return EscapeOutcome::Truncated;
    };

    match byte {
        b's' => {
            saved.save(screen.cursor());
            EscapeOutcome::SaveCursor
        }
        b'u' => {
            let pending = saved.take();
            if let Some(cursor) = pending {
                screen.set_cursor(cursor);
            }
            EscapeOutcome::RestoreCursor {
                restored: pending.is_some(),
            }
        }
        b'K' => {
            screen.clear_line(screen.cursor().line);
            EscapeOutcome::ClearLine
        }
        b'2' => match input.next_byte() {
            Some(b'J') => {
                screen.clear();
                EscapeOutcome::ClearScreen
            }
            next => parameter(b'2', next, input, screen.width() as usize),
        },
        b'0'..=b'9' => {
            let next = input.next_byte();
            parameter(byte, next, input, screen.width() as usize)
        }
        other => EscapeOutcome::Malformed(other),
    }
}

/// Collect a run of digits starting with `first`, at most `limit` long; the
/// byte after the run is the delimiter.
fn parameter<S: ByteSource + ?Sized>(
    first: u8,
    mut next: Option<u8>,
    input: &mut S,
    limit: usize,
) -> EscapeOutcome {
    let mut digits = vec![first];
    loop {
        match next {
            None => return EscapeOutcome::Truncated,
            Some(d) if d.is_ascii_digit() && digits.len() < limit => {
                digits.push(d);
                next = input.next_byte();
            }
            Some(delimiter) => {
                return EscapeOutcome::Parameter {
                    value: to_number(&digits),
                    delimiter,
                }
            }
        }
    }
}

fn to_number(digits: &[u8]) -> u32 {
    digits.iter().fold(0u32, |acc, d| {
        acc.saturating_mul(10).saturating_add(u32::from(d - b'0'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screen::Effect;
    use crate::source::SliceSource;
    use pretty_assertions::assert_eq;

    /// Interpret `rest` as the bytes following an `ESC`.
    fn escape(screen: &mut VirtualScreen, saved: &mut SavedCursor, rest: &[u8]) -> EscapeOutcome {
        let mut src = SliceSource::new(rest);
        interpret(screen, &mut src, saved)
    }

    fn write(screen: &mut VirtualScreen, saved: &mut SavedCursor, bytes: &[u8]) {
        let mut src = SliceSource::new(bytes);
        while let Some(b) = src.next_byte() {
            screen.put(b, &mut src, saved);
        }
    }

    fn snapshot(screen: &VirtualScreen) -> Vec<Vec<u8>> {
        (0..screen.height()).map(|l| screen.row_bytes(l).to_vec()).collect()
    }

    #[test]
    fn test_save_restore_round_trip() {
        let mut screen = VirtualScreen::new(20, 5);
        let mut saved = SavedCursor::new();
        write(&mut screen, &mut saved, b"abc\n");
        let at_save = screen.cursor();

        assert_eq!(escape(&mut screen, &mut saved, b"[s"), EscapeOutcome::SaveCursor);
        write(&mut screen, &mut saved, b"\n\nxyz\r\n12345");
        assert_ne!(screen.cursor(), at_save);

        assert_eq!(
            escape(&mut screen, &mut saved, b"[u"),
            EscapeOutcome::RestoreCursor { restored: true }
        );
        assert_eq!(screen.cursor(), at_save);
        assert!(!saved.is_pending());
    }

    #[test]
    fn test_restore_without_save_is_noop() {
        let mut screen = VirtualScreen::new(20, 5);
        let mut saved = SavedCursor::new();
        write(&mut screen, &mut saved, b"ab");
        assert_eq!(
            escape(&mut screen, &mut saved, b"[u"),
            EscapeOutcome::RestoreCursor { restored: false }
        );
        assert_eq!(screen.cursor(), Cursor::new(0, 2));
    }

    #[test]
    fn test_newer_save_overwrites_older() {
        let mut screen = VirtualScreen::new(20, 5);
        let mut saved = SavedCursor::new();
        write(&mut screen, &mut saved, b"\x1b[sab\x1b[scd\x1b[u");
        assert_eq!(screen.cursor(), Cursor::new(0, 2));
    }

    #[test]
    fn test_saved_cursor_is_shared_between_screens() {
        let mut first = VirtualScreen::new(20, 5);
        let mut second = VirtualScreen::new(20, 5);
        let mut saved = SavedCursor::new();
        write(&mut first, &mut saved, b"\n\nabc\x1b[s");
        write(&mut second, &mut saved, b"\x1b[u");
        assert_eq!(second.cursor(), Cursor::new(2, 3));
    }

    #[test]
    fn test_restore_is_clamped_to_screen() {
        let mut big = VirtualScreen::new(40, 10);
        let mut small = VirtualScreen::new(5, 2);
        let mut saved = SavedCursor::new();
        big.set_cursor(Cursor::new(9, 30));
        escape(&mut big, &mut saved, b"[s");
        escape(&mut small, &mut saved, b"[u");
        assert_eq!(small.cursor(), Cursor::new(1, 4));
    }

    #[test]
    fn test_clear_screen() {
        let mut screen = VirtualScreen::new(10, 3);
        let mut saved = SavedCursor::new();
        write(&mut screen, &mut saved, b"one\r\ntwo");
        assert_eq!(escape(&mut screen, &mut saved, b"[2J"), EscapeOutcome::ClearScreen);
        assert_eq!(screen.cursor(), Cursor::new(0, 0));
        assert!(snapshot(&screen).iter().all(|row| row == b"          "));
    }

    #[test]
    fn test_clear_line_keeps_cursor() {
        let mut screen = VirtualScreen::new(10, 3);
        let mut saved = SavedCursor::new();
        write(&mut screen, &mut saved, b"one\r\ntwo");
        assert_eq!(escape(&mut screen, &mut saved, b"[K"), EscapeOutcome::ClearLine);
        assert_eq!(screen.cursor(), Cursor::new(1, 3));
        assert_eq!(screen.row_bytes(0), b"one       ");
        assert_eq!(screen.row_bytes(1), b"          ");
    }

    #[test]
    fn test_numeric_parameter_is_parsed_and_ignored() {
        let mut screen = VirtualScreen::new(10, 3);
        let mut saved = SavedCursor::new();
        write(&mut screen, &mut saved, b"ab");
        let before = snapshot(&screen);

        assert_eq!(
            escape(&mut screen, &mut saved, b"[12H"),
            EscapeOutcome::Parameter { value: 12, delimiter: b'H' }
        );
        assert_eq!(snapshot(&screen), before);
        assert_eq!(screen.cursor(), Cursor::new(0, 2));
    }

    #[test]
    fn test_two_without_j_is_a_parameter() {
        let mut screen = VirtualScreen::new(10, 3);
        let mut saved = SavedCursor::new();
        assert_eq!(
            escape(&mut screen, &mut saved, b"[25m"),
            EscapeOutcome::Parameter { value: 25, delimiter: b'm' }
        );
        assert_eq!(
            escape(&mut screen, &mut saved, b"[2;"),
            EscapeOutcome::Parameter { value: 2, delimiter: b';' }
        );
    }

    #[test]
    fn test_parameter_digits_bounded_by_width() {
        let mut screen = VirtualScreen::new(3, 2);
        let mut saved = SavedCursor::new();
        let mut src = SliceSource::new(b"[12345");
        assert_eq!(
            interpret(&mut screen, &mut src, &mut saved),
            EscapeOutcome::Parameter { value: 123, delimiter: b'4' }
        );
        assert_eq!(src.remaining(), b"5");
    }

    #[test]
    fn test_huge_parameter_saturates() {
        let mut screen = VirtualScreen::new(80, 2);
        let mut saved = SavedCursor::new();
        assert_eq!(
            escape(&mut screen, &mut saved, b"[99999999999999m"),
            EscapeOutcome::Parameter { value: u32::MAX, delimiter: b'm' }
        );
    }

    #[test]
    fn test_not_csi_consumes_one_byte() {
        let mut screen = VirtualScreen::new(10, 3);
        let mut saved = SavedCursor::new();
        let mut src = SliceSource::new(b"(B");
        assert_eq!(interpret(&mut screen, &mut src, &mut saved), EscapeOutcome::NotCsi);
        assert_eq!(src.remaining(), b"B");
    }

    #[test]
    fn test_malformed_and_truncated() {
        let mut screen = VirtualScreen::new(10, 3);
        let mut saved = SavedCursor::new();
        write(&mut screen, &mut saved, b"ab");
        let before = snapshot(&screen);

        assert_eq!(escape(&mut screen, &mut saved, b"[Z"), EscapeOutcome::Malformed(b'Z'));
        assert_eq!(escape(&mut screen, &mut saved, b""), EscapeOutcome::Truncated);
        assert_eq!(escape(&mut screen, &mut saved, b"["), EscapeOutcome::Truncated);
        assert_eq!(escape(&mut screen, &mut saved, b"[2"), EscapeOutcome::Truncated);
        assert_eq!(escape(&mut screen, &mut saved, b"[42"), EscapeOutcome::Truncated);
        assert_eq!(snapshot(&screen), before);
        assert_eq!(screen.cursor(), Cursor::new(0, 2));
    }

    #[test]
    fn test_escape_dirties_every_row_and_requests_repaint() {
        let mut screen = VirtualScreen::new(10, 3);
        let mut saved = SavedCursor::new();
        let mut src = SliceSource::new(b"[Z");
        let effect = screen.put(ESC, &mut src, &mut saved);
        assert_eq!(effect, Effect::REPAINT);
        assert!((0..3).all(|l| screen.is_dirty(l)));
    }

    #[test]
    fn test_escape_inside_output_stream() {
        let mut screen = VirtualScreen::new(10, 3);
        let mut saved = SavedCursor::new();
        write(&mut screen, &mut saved, b"junk\x1b[2Jok");
        assert_eq!(screen.row_bytes(0), b"ok        ");
        assert_eq!(screen.cursor(), Cursor::new(0, 2));
    }
}
