use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use ecran_vt::{ByteSource, SavedCursor, Surface, VirtualScreen};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

use crate::pty::{default_shell, PtyError, PtyHandle};

/// Unique identifier for a terminal session.
pub type SessionId = u64;

/// How long an escape sequence split across PTY reads may wait for its tail.
pub const ESCAPE_TIMEOUT: Duration = Duration::from_millis(50);

/// Most output bytes one [`Session::process_output`] call applies.
///
/// A child that never stops writing must not keep the control loop from
/// reading the keyboard; the rest waits for the next call.
pub const OUTPUT_BUDGET: usize = 64 * 1024;

/// Chunks the reader thread may queue before it stops reading the PTY.
pub const OUTPUT_QUEUE_CHUNKS: usize = 64;

/// Bytes requested per PTY read.
const CHUNK_SIZE: usize = 4096;

/// The session lifecycle operations the multiplexer relies on.
pub trait Session {
    fn screen(&self) -> &VirtualScreen;

    fn screen_mut(&mut self) -> &mut VirtualScreen;

    /// Forward user input to the child.
    fn write_input(&mut self, data: &[u8]) -> Result<(), PtyError>;

    /// Apply output received so far to the screen, at most
    /// [`OUTPUT_BUDGET`] bytes per call.
    ///
    /// `display` is given only for the foreground session; bells and
    /// escape-triggered repaints go to it immediately. Returns the number of
    /// bytes processed.
    fn process_output(
        &mut self,
        saved: &mut SavedCursor,
        display: Option<&mut dyn Surface>,
    ) -> Result<usize, PtyError>;

    /// Whether the child is gone. Cheap enough to poll every loop iteration.
    fn has_exited(&mut self) -> bool;

    /// Kill the child. Calling this on a dead session is a no-op.
    fn terminate(&mut self);
}

/// Creates sessions on demand.
pub trait Launcher {
    type Session: Session;

    fn launch(&mut self, cols: u16, rows: u16) -> Result<Self::Session, PtyError>;
}

/// A program and its arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgramSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl ProgramSpec {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// The user's login shell without arguments.
    pub fn default_shell() -> Self {
        Self::new(default_shell(), Vec::new())
    }
}

/// [`Launcher`] spawning real PTY sessions.
///
/// The first session may run a dedicated program; every later one runs the
/// default program.
#[derive(Debug)]
pub struct PtyLauncher {
    initial: Option<ProgramSpec>,
    default: ProgramSpec,
    next_id: SessionId,
}

impl PtyLauncher {
    pub fn new(initial: Option<ProgramSpec>, default: ProgramSpec) -> Self {
        Self {
            initial,
            default,
            next_id: 1,
        }
    }
}

impl Launcher for PtyLauncher {
    type Session = TerminalSession;

    fn launch(&mut self, cols: u16, rows: u16) -> Result<TerminalSession, PtyError> {
        let spec = self.initial.take().unwrap_or_else(|| self.default.clone());
        let id = self.next_id;
        self.next_id += 1;
        TerminalSession::spawn(id, &spec, cols, rows)
    }
}

/// A terminal session pairing a PTY process with its virtual screen.
///
/// A dedicated I/O thread blocks on the PTY reader and ships output chunks
/// over a channel; when the child goes away the thread raises the session's
/// exit flag. The control loop only ever does non-blocking work here.
pub struct TerminalSession {
    id: SessionId,
    screen: VirtualScreen,
    pty: PtyHandle,
    output: OutputQueue,
    exited: Arc<AtomicBool>,
    terminated: bool,
}

impl TerminalSession {
    /// Spawn `spec` in a PTY and start its I/O thread.
    ///
    /// The screen and the PTY share the given dimensions.
    pub fn spawn(
        id: SessionId,
        spec: &ProgramSpec,
        cols: u16,
        rows: u16,
    ) -> Result<Self, PtyError> {
        let mut pty = PtyHandle::spawn(&spec.program, &spec.args, cols, rows)?;
        let reader = pty
            .take_reader()
            .ok_or_else(|| PtyError::Spawn("PTY reader already taken".to_string()))?;

        let (output_tx, output_rx) = mpsc::channel(OUTPUT_QUEUE_CHUNKS);
        let exited = Arc::new(AtomicBool::new(false));
        if let Err(e) = start_io_thread(id, reader, output_tx, Arc::clone(&exited)) {
            pty.kill();
            return Err(e);
        }

        log::info!("session {id} started: {} {:?}", spec.program, spec.args);

        Ok(Self {
            id,
            screen: VirtualScreen::new(cols, rows),
            pty,
            output: OutputQueue::new(output_rx),
            exited,
            terminated: false,
        })
    }

    /// Returns the session's unique identifier.
    pub fn id(&self) -> SessionId {
        self.id
    }
}

impl Session for TerminalSession {
    fn screen(&self) -> &VirtualScreen {
        &self.screen
    }

    fn screen_mut(&mut self) -> &mut VirtualScreen {
        &mut self.screen
    }

    fn write_input(&mut self, data: &[u8]) -> Result<(), PtyError> {
        self.pty.write(data)
    }

    fn process_output(
        &mut self,
        saved: &mut SavedCursor,
        display: Option<&mut dyn Surface>,
    ) -> Result<usize, PtyError> {
        let mut pending =
            PendingOutput::new(&mut self.output, ESCAPE_TIMEOUT, OUTPUT_BUDGET);
        Ok(self.screen.feed(&mut pending, saved, display)?)
    }

    fn has_exited(&mut self) -> bool {
        self.terminated || self.exited.load(Ordering::Acquire) || !self.pty.is_alive()
    }

    fn terminate(&mut self) {
        if self.terminated {
            return;
        }
        self.terminated = true;
        self.pty.kill();
        log::info!("session {} terminated", self.id);
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        self.terminate();
    }
}

/// Start the PTY read loop for a session on a dedicated OS thread.
fn start_io_thread(
    id: SessionId,
    reader: Box<dyn Read + Send>,
    output_tx: mpsc::Sender<Vec<u8>>,
    exited: Arc<AtomicBool>,
) -> Result<(), PtyError> {
    thread::Builder::new()
        .name(format!("pty-io-{id}"))
        .spawn(move || io_loop(id, reader, output_tx, exited))
        .map(|_| ())
        .map_err(|e| PtyError::Spawn(format!("failed to spawn I/O thread: {e}")))
}

fn io_loop(
    id: SessionId,
    mut reader: Box<dyn Read + Send>,
    output_tx: mpsc::Sender<Vec<u8>>,
    exited: Arc<AtomicBool>,
) {
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            // EIO once the child side closes.
            Err(_) => break,
        };
        // Blocks while the queue is full, which in turn stalls the child.
        if output_tx.blocking_send(buf[..n].to_vec()).is_err() {
            break;
        }
    }
    // Only the flag is touched here; the control loop does the cleanup.
    exited.store(true, Ordering::Release);
    log::debug!("pty-io-{id}: reader finished");
}

/// Receiving end of a session's output, plus the part of a chunk that a
/// budgeted [`PendingOutput`] left unread.
struct OutputQueue {
    rx: mpsc::Receiver<Vec<u8>>,
    chunk: Vec<u8>,
    pos: usize,
}

impl OutputQueue {
    fn new(rx: mpsc::Receiver<Vec<u8>>) -> Self {
        Self {
            rx,
            chunk: Vec::new(),
            pos: 0,
        }
    }

    fn take_buffered(&mut self) -> Result<u8, TryRecvError> {
        loop {
            if let Some(&byte) = self.chunk.get(self.pos) {
                self.pos += 1;
                return Ok(byte);
            }
            self.chunk = self.rx.try_recv()?;
            self.pos = 0;
        }
    }
}

/// Output chunks already received, viewed as one byte stream.
///
/// Non-waiting reads stop once `budget` bytes were handed out. Waiting
/// reads (escape continuations) ignore the budget and poll the channel
/// until `wait` elapses, so a sequence split across reads still completes.
struct PendingOutput<'a> {
    queue: &'a mut OutputQueue,
    wait: Duration,
    budget: usize,
    taken: usize,
}

impl<'a> PendingOutput<'a> {
    fn new(queue: &'a mut OutputQueue, wait: Duration, budget: usize) -> Self {
        Self {
            queue,
            wait,
            budget,
            taken: 0,
        }
    }

    fn take_buffered(&mut self) -> Result<u8, TryRecvError> {
        let byte = self.queue.take_buffered()?;
        self.taken += 1;
        Ok(byte)
    }
}

impl ByteSource for PendingOutput<'_> {
    fn next_byte(&mut self) -> Option<u8> {
        let deadline = Instant::now() + self.wait;
        loop {
            match self.take_buffered() {
                Ok(byte) => return Some(byte),
                Err(TryRecvError::Disconnected) => return None,
                Err(TryRecvError::Empty) if Instant::now() >= deadline => return None,
                Err(TryRecvError::Empty) => thread::sleep(Duration::from_millis(1)),
            }
        }
    }

    fn try_next_byte(&mut self) -> Option<u8> {
        if self.taken >= self.budget {
            return None;
        }
        self.take_buffered().ok()
    }
}
