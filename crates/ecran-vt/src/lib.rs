//! ecran-vt: Virtual screens for the ecran multiplexer.
//!
//! Each session buffers its output into a [`VirtualScreen`] independently of
//! what the physical terminal currently shows. The foreground screen is then
//! mirrored onto a [`Surface`], either incrementally (only dirty rows) or in
//! full when the foreground changes.
//!
//! Only a very small control-sequence subset is interpreted: newline, carriage
//! return, bell, and a handful of `ESC [` commands (see [`escape`]).

pub mod escape;
pub mod row;
pub mod screen;
pub mod source;
pub mod surface;

pub use escape::{EscapeOutcome, SavedCursor};
pub use row::{is_printable, Row, BLANK};
pub use screen::{Cursor, Effect, VirtualScreen};
pub use source::{ByteSource, SliceSource};
pub use surface::{MemorySurface, Surface};
