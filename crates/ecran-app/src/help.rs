use std::io;

use ecran_pty::MAX_SESSIONS;
use ecran_vt::{Surface, VirtualScreen};

const CONTROLS: &[&str] = &[
    "ecran: terminal multiplexer (press ESC to go back)",
    "",
    "Command key: Ctrl-A, followed by",
    "  n        start a new session",
    "  0-9      switch to that session",
    "  k 0-9    kill that session",
    "  h        show this help",
    "  s        split screen (not available)",
    "  q        kill every session and quit",
];

/// Full-screen help listing the commands and the state of every slot.
pub struct HelpOverlay {
    screen: VirtualScreen,
}

impl HelpOverlay {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            screen: VirtualScreen::new(width, height),
        }
    }

    /// Lay out the help text for the given slot activity.
    ///
    /// Lines that do not fit the screen height are dropped.
    pub fn render(&mut self, activity: &[bool; MAX_SESSIONS]) {
        self.screen.clear();
        let separator = "-".repeat(self.screen.width() as usize);
        let sessions = activity.iter().enumerate().map(|(i, active)| {
            let state = if *active { "Active" } else { "Inactive" };
            format!("Session {i}: {state}")
        });
        let lines = CONTROLS
            .iter()
            .map(|s| s.to_string())
            .chain([separator])
            .chain(sessions);
        for (line, text) in (0..self.screen.height()).zip(lines) {
            self.screen.set_line(line, text.as_bytes());
        }
    }

    /// Render and paint the whole overlay on `target`.
    pub fn show_on<S: Surface + ?Sized>(
        &mut self,
        activity: &[bool; MAX_SESSIONS],
        target: &mut S,
    ) -> io::Result<()> {
        self.render(activity);
        self.screen.show_on(target)
    }

    #[cfg(test)]
    pub fn screen(&self) -> &VirtualScreen {
        &self.screen
    }
}
