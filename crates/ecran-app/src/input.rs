use std::cell::Cell;
use std::io::{self, Read};
use std::rc::Rc;
use std::thread;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

/// How [`Input::read_byte`] behaves when no key is queued.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputMode {
    /// Return `None` immediately.
    NonBlocking,
    /// Wait for the next key.
    Blocking,
}

/// Keyboard input queue fed by a background reader thread.
///
/// The control loop polls it without waiting; command dispatch switches it
/// into blocking mode for the duration of a [`BlockingScope`].
pub struct Input {
    rx: mpsc::UnboundedReceiver<u8>,
    mode: Rc<Cell<InputMode>>,
    closed: bool,
}

impl Input {
    pub fn new(rx: mpsc::UnboundedReceiver<u8>) -> Self {
        Self {
            rx,
            mode: Rc::new(Cell::new(InputMode::NonBlocking)),
            closed: false,
        }
    }

    /// Start the `stdin-input` thread and return the queue it feeds.
    pub fn from_stdin() -> io::Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        thread::Builder::new()
            .name("stdin-input".to_string())
            .spawn(move || read_stdin(tx))?;
        Ok(Self::new(rx))
    }

    #[cfg(test)]
    pub fn mode(&self) -> InputMode {
        self.mode.get()
    }

    /// Whether the keyboard is gone for good.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Next key, honouring the current mode.
    ///
    /// Also returns `None` once the reader has stopped, after which
    /// [`is_closed`](Self::is_closed) reports `true`.
    pub fn read_byte(&mut self) -> Option<u8> {
        match self.mode.get() {
            InputMode::NonBlocking => match self.rx.try_recv() {
                Ok(byte) => Some(byte),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => {
                    self.closed = true;
                    None
                }
            },
            InputMode::Blocking => {
                let byte = self.rx.blocking_recv();
                if byte.is_none() {
                    self.closed = true;
                }
                byte
            }
        }
    }

    /// Switch to blocking reads until the returned guard is dropped.
    pub fn blocking(&self) -> BlockingScope {
        let previous = self.mode.replace(InputMode::Blocking);
        BlockingScope {
            mode: Rc::clone(&self.mode),
            previous,
        }
    }
}

/// Restores the previous [`InputMode`] on drop, on every exit path.
#[must_use = "input returns to its previous mode as soon as the scope is dropped"]
pub struct BlockingScope {
    mode: Rc<Cell<InputMode>>,
    previous: InputMode,
}

impl Drop for BlockingScope {
    fn drop(&mut self) {
        self.mode.set(self.previous);
    }
}

fn read_stdin(tx: mpsc::UnboundedSender<u8>) {
    let mut stdin = io::stdin().lock();
    let mut buf = [0u8; 256];
    loop {
        match stdin.read(&mut buf) {
            Ok(0) => {
                log::info!("stdin closed");
                break;
            }
            Ok(n) => {
                for &byte in &buf[..n] {
                    if tx.send(byte).is_err() {
                        return;
                    }
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                log::error!("stdin read error: {e}");
                break;
            }
        }
    }
}
