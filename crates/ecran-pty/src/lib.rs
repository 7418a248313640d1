//! ecran-pty: PTY management and session lifecycle for ecran.
//!
//! This crate sits between the child processes (shells running in
//! pseudo-terminals) and their virtual screens. It reads child output, feeds
//! it into each session's [`VirtualScreen`](ecran_vt::VirtualScreen), and
//! writes user input back to the child.
//!
//! # Architecture
//!
//! - [`PtyHandle`]: Low-level PTY process management (spawn, read, write, kill).
//! - [`TerminalSession`]: Pairs a `PtyHandle` with a virtual screen and an
//!   exit flag raised by its reader thread.
//! - [`Session`] / [`Launcher`]: The lifecycle API the multiplexer drives.
//! - [`SessionTable`]: Ten fixed slots holding the live sessions.

pub mod pty;
pub mod session;
pub mod table;

pub use pty::{default_shell, PtyError, PtyHandle};
pub use session::{Launcher, ProgramSpec, PtyLauncher, Session, SessionId, TerminalSession};
pub use table::{SessionTable, TableFull, MAX_SESSIONS};
