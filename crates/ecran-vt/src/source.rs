//! Byte sources feeding virtual screens.
//!
//! Escape sequences are interpreted by pulling continuation bytes straight
//! from the same source that delivered the `ESC`, so a source distinguishes
//! between "give me what is already here" and "wait for the next byte".

/// A stream of bytes destined for a virtual screen.
pub trait ByteSource {
    /// Next byte, waiting for it if the source supports waiting.
    ///
    /// `None` means the stream ended or the wait gave up.
    fn next_byte(&mut self) -> Option<u8>;

    /// Next byte only if one is available right now.
    fn try_next_byte(&mut self) -> Option<u8> {
        self.next_byte()
    }
}

/// A [`ByteSource`] over an in-memory buffer.
#[derive(Debug)]
pub struct SliceSource<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> SliceSource<'a> {
    /// Read `bytes` from the start.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Bytes not consumed yet.
    pub fn remaining(&self) -> &'a [u8] {
        &self.bytes[self.pos..]
    }
}

impl ByteSource for SliceSource<'_> {
    fn next_byte(&mut self) -> Option<u8> {
        let byte = self.bytes.get(self.pos).copied()?;
        self.pos += 1;
        Some(byte)
    }
}
