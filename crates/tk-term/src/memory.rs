// SPDX-License-Identifier: MIT
//
// In-memory terminal for tests and headless hosts.
//
// Input is a script of byte chunks and pauses; output is captured in a
// byte vector. Mode switches are recorded as plain flags and also written
// to the output, so tests can assert on either.

use std::collections::VecDeque;
use std::io;
use std::sync::mpsc::Receiver;
use std::thread;

use crate::ansi;
use crate::io::TerminalIo;
use crate::reader::{InputReader, ScriptStep};
use crate::terminal::Size;

/// A scripted, capturing [`TerminalIo`].
///
/// # Example
///
/// ```
/// use tk_term::{MemoryTerminal, Size, TerminalIo};
///
/// let mut term = MemoryTerminal::new(Size { cols: 10, rows: 2 });
/// term.push_input("q");
/// assert_eq!(term.read_raw(true)?, b"q");
/// assert!(term.read_raw(true)?.is_empty()); // script exhausted
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryTerminal {
    size: Size,
    input: VecDeque<ScriptStep>,
    output: Vec<u8>,
    raw_mode: bool,
    alternate_screen: bool,
    cursor_visible: bool,
    mouse_reporting: bool,
    title: Option<String>,
    interrupted: bool,
}

impl MemoryTerminal {
    #[must_use]
    pub fn new(size: Size) -> Self {
        Self {
            size,
            cursor_visible: true,
            ..Self::default()
        }
    }

    // ── Scripting ───────────────────────────────────────────────────

    /// Queue one read of `input`.
    pub fn push_input(&mut self, input: impl AsRef<[u8]>) {
        self.input
            .push_back(ScriptStep::Bytes(input.as_ref().to_vec()));
    }

    /// Queue a step (bytes or a pause).
    pub fn push_step(&mut self, step: ScriptStep) {
        self.input.push_back(step);
    }

    /// Change the reported size, as if the window had been resized.
    pub const fn resize(&mut self, size: Size) {
        self.size = size;
    }

    /// Pretend an interrupt signal arrived.
    pub const fn set_interrupted(&mut self, interrupted: bool) {
        self.interrupted = interrupted;
    }

    // ── Inspection ──────────────────────────────────────────────────

    /// Everything written so far.
    #[must_use]
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Everything written so far, decoded lossily.
    #[must_use]
    pub fn output_str(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }

    /// Return and clear the captured output.
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }

    #[must_use]
    pub const fn is_raw_mode(&self) -> bool {
        self.raw_mode
    }

    #[must_use]
    pub const fn is_alternate_screen(&self) -> bool {
        self.alternate_screen
    }

    #[must_use]
    pub const fn is_cursor_visible(&self) -> bool {
        self.cursor_visible
    }

    #[must_use]
    pub const fn is_mouse_reporting(&self) -> bool {
        self.mouse_reporting
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }
}

impl TerminalIo for MemoryTerminal {
    fn size(&self) -> Size {
        self.size
    }

    fn read_raw(&mut self, blocking: bool) -> io::Result<Vec<u8>> {
        while let Some(step) = self.input.pop_front() {
            match step {
                ScriptStep::Bytes(bytes) => return Ok(bytes),
                ScriptStep::Pause(pause) if blocking => thread::sleep(pause),
                ScriptStep::Pause(pause) => {
                    // Nothing is pending yet; keep the pause for the next read.
                    self.input.push_front(ScriptStep::Pause(pause));
                    return Ok(Vec::new());
                }
            }
        }
        Ok(Vec::new())
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.output.extend_from_slice(bytes);
        Ok(())
    }

    fn set_raw_mode(&mut self, enabled: bool) -> io::Result<()> {
        self.raw_mode = enabled;
        Ok(())
    }

    fn spawn_reader(&mut self) -> io::Result<(InputReader, Receiver<Vec<u8>>)> {
        let script: Vec<ScriptStep> = self.input.drain(..).collect();
        InputReader::scripted(script)
    }

    fn interrupted(&self) -> bool {
        self.interrupted
    }

    fn set_alternate_screen(&mut self, enabled: bool) -> io::Result<()> {
        self.alternate_screen = enabled;
        if enabled {
            ansi::enter_alt_screen(&mut self.output)?;
            ansi::clear_screen(&mut self.output)
        } else {
            ansi::exit_alt_screen(&mut self.output)
        }
    }

    fn set_cursor_visible(&mut self, visible: bool) -> io::Result<()> {
        self.cursor_visible = visible;
        if visible {
            ansi::cursor_show(&mut self.output)
        } else {
            ansi::cursor_hide(&mut self.output)
        }
    }

    fn set_mouse_reporting(&mut self, enabled: bool) -> io::Result<()> {
        self.mouse_reporting = enabled;
        if enabled {
            ansi::enable_mouse(&mut self.output)
        } else {
            ansi::disable_mouse(&mut self.output)
        }
    }

    fn set_title(&mut self, title: &str) -> io::Result<()> {
        self.title = Some(title.to_string());
        ansi::set_title(&mut self.output, title)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
