// SPDX-License-Identifier: MIT
//
// Screen session: the piece that wires everything together.
//
// A `Screen` owns a terminal adapter for the length of a session. Opening
// it switches the terminal into the configured modes (raw input, alternate
// screen, hidden cursor, mouse reporting); closing or dropping it switches
// them back in reverse order.
//
// Drawing is two-phase. `put_str` and `put_pixels` only record cells in the
// current frame; `flush` diffs that frame against what the terminal shows
// and writes the difference in one go. If the terminal was resized since
// the previous flush, the whole new area is assumed dirty and redrawn.
//
// Input arrives through `events`, an iterator of parsed events in one of
// two modes:
//
//   blocking  one read per event on the calling thread
//   timeout   a background reader feeds a channel; when nothing arrives
//             within the timeout the iterator yields `Event::Timeout`
//
// Either way an interrupt (Ctrl+C or SIGINT) or the end of input yields a
// final `Event::ScreenClosed`.

use std::collections::VecDeque;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use bitflags::bitflags;
use tracing::{debug, error, warn};

use tk_style::FormatStr;

use crate::error::{Result, TermError};
use crate::event::{Event, MouseState, Position, Utf8Decoder, parse_event, split_reads};
use crate::io::TerminalIo;
use crate::reader::InputReader;
use crate::render::{PixelBuffer, RenderStats, Renderer, blank_frame};
use crate::terminal::Size;

/// Number of recent flushes averaged by [`Screen::avg_flush_time`].
const FLUSH_HISTORY: usize = 50;

/// The byte Ctrl+C produces in raw mode.
const CTRL_C: &str = "\x03";

// ─── Config ──────────────────────────────────────────────────────────────────

bitflags! {
    /// Terminal modes a session switches on while open.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modes: u8 {
        /// Unbuffered input with no echo.
        const RAW         = 1 << 0;
        const ALT_SCREEN  = 1 << 1;
        const HIDE_CURSOR = 1 << 2;
        /// SGR mouse reporting (clicks, drags, motion, wheel).
        const MOUSE       = 1 << 3;
    }
}

impl Default for Modes {
    fn default() -> Self {
        Self::all()
    }
}

/// Session configuration.
#[derive(Debug, Clone)]
pub struct ScreenConfig {
    /// Window title while the session is open.
    pub title: String,
    pub modes: Modes,
    /// Show the mean flush time in the window title after every flush.
    pub debug: bool,
    /// Treat a Ctrl+C keypress as an interrupt that closes the event stream.
    pub interrupt_on_ctrl_c: bool,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            title: "termkit".into(),
            modes: Modes::default(),
            debug: false,
            interrupt_on_ctrl_c: true,
        }
    }
}

// ─── Screen ──────────────────────────────────────────────────────────────────

/// An open terminal session with a diffed frame buffer.
///
/// # Example
///
/// ```
/// use tk_term::event::Position;
/// use tk_term::{Event, MemoryTerminal, Screen, ScreenConfig, Size};
///
/// let mut term = MemoryTerminal::new(Size { cols: 20, rows: 4 });
/// term.push_input("q");
///
/// let mut screen = Screen::open(term, ScreenConfig::default())?;
/// let mut events = screen.events(None);
/// while let Some(event) = events.next() {
///     if let Event::KeyPressed { ch: 'q', .. } = event {
///         break;
///     }
///     events.screen().put_str(Position::new(0, 0), "press q");
///     events.screen().flush()?;
/// }
/// drop(events);
/// screen.close()?;
/// # Ok::<(), tk_term::TermError>(())
/// ```
pub struct Screen<T: TerminalIo> {
    io: T,
    config: ScreenConfig,
    /// Cells written since the last flush.
    current: PixelBuffer,
    /// Cells the terminal shows.
    last: PixelBuffer,
    size: Size,
    full_redraw: bool,
    renderer: Renderer,
    mouse: MouseState,
    flush_times: VecDeque<Duration>,
    active: bool,
}

impl<T: TerminalIo> Screen<T> {
    /// Open a session on `io`, switching on the configured modes.
    ///
    /// If a mode switch fails, the ones already made are undone before the
    /// error is returned.
    ///
    /// # Errors
    ///
    /// Returns the adapter's I/O error.
    pub fn open(io: T, config: ScreenConfig) -> Result<Self> {
        let size = io.size();
        let mut screen = Self {
            io,
            config,
            current: PixelBuffer::new(),
            last: PixelBuffer::new(),
            size,
            full_redraw: false,
            renderer: Renderer::new(),
            mouse: MouseState::new(),
            flush_times: VecDeque::with_capacity(FLUSH_HISTORY),
            active: true,
        };

        // On error `screen` drops here and Drop restores what was switched.
        screen.enter()?;
        debug!(
            title = %screen.config.title,
            cols = size.cols,
            rows = size.rows,
            "screen opened"
        );
        Ok(screen)
    }

    fn enter(&mut self) -> Result<()> {
        let modes = self.config.modes;
        self.io.set_title(&self.config.title)?;
        if modes.contains(Modes::RAW) {
            self.io.set_raw_mode(true)?;
        }
        if modes.contains(Modes::ALT_SCREEN) {
            self.io.set_alternate_screen(true)?;
        }
        if modes.contains(Modes::HIDE_CURSOR) {
            self.io.set_cursor_visible(false)?;
        }
        if modes.contains(Modes::MOUSE) {
            self.io.set_mouse_reporting(true)?;
        }
        self.mouse.reset();
        Ok(())
    }

    /// Close the session, restoring the terminal.
    ///
    /// Every restore step is attempted even if an earlier one fails.
    /// Idempotent.
    ///
    /// # Errors
    ///
    /// [`TermError::TerminalStateRestore`] carrying the first failure.
    pub fn close(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;

        let modes = self.config.modes;
        let mut first_error = None;
        let mut attempt = |step: &str, result: std::io::Result<()>| {
            if let Err(e) = result {
                error!(step, error = %e, "terminal restore step failed");
                first_error.get_or_insert(e);
            }
        };

        if modes.contains(Modes::MOUSE) {
            attempt("mouse", self.io.set_mouse_reporting(false));
        }
        if modes.contains(Modes::HIDE_CURSOR) {
            attempt("cursor", self.io.set_cursor_visible(true));
        }
        if modes.contains(Modes::ALT_SCREEN) {
            attempt("alternate screen", self.io.set_alternate_screen(false));
        }
        if modes.contains(Modes::RAW) {
            attempt("raw mode", self.io.set_raw_mode(false));
        }
        attempt("title", self.io.set_title(""));

        debug!("screen closed");
        first_error.map_or(Ok(()), |e| Err(TermError::TerminalStateRestore(e)))
    }

    /// Whether the session is still open.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    // ── Drawing ─────────────────────────────────────────────────────

    /// Record `text` starting at `pos`, one visible cell per column.
    ///
    /// Escapes in `text` stay attached to the cells they style.
    pub fn put_str(&mut self, pos: Position, text: impl Into<FormatStr>) {
        let text = text.into();
        for (i, cell) in text.cells().enumerate() {
            let dx = i32::try_from(i).unwrap_or(i32::MAX);
            self.current.insert(pos.offset(dx, 0), cell);
        }
    }

    /// Merge cells into the current frame. Later writes win.
    pub fn put_pixels<I>(&mut self, pixels: I)
    where
        I: IntoIterator<Item = (Position, String)>,
    {
        self.current.extend(pixels);
    }

    /// Drop everything recorded since the last flush.
    pub fn discard(&mut self) {
        self.current.clear();
    }

    /// Blank every cell currently shown, right away.
    ///
    /// The recorded frame is left alone; it appears on the next flush.
    ///
    /// # Errors
    ///
    /// Returns the adapter's write error.
    pub fn clear(&mut self) -> Result<()> {
        self.renderer.render_blanks(&self.last, self.size);
        self.renderer.flush_to(&mut self.io)?;
        self.last.clear();
        self.update_debug_title()?;
        Ok(())
    }

    /// Write the recorded frame, then start a new empty one.
    ///
    /// # Errors
    ///
    /// Returns the adapter's write error.
    pub fn flush(&mut self) -> Result<RenderStats> {
        let started = Instant::now();

        let size = self.io.size();
        if size != self.size {
            debug!(
                cols = size.cols,
                rows = size.rows,
                "terminal resized, redrawing everything"
            );
            self.size = size;
            self.last = blank_frame(size);
            self.full_redraw = true;
        }

        let stats = self
            .renderer
            .render(&self.current, &self.last, self.size, self.full_redraw);
        self.renderer.flush_to(&mut self.io)?;

        self.last = std::mem::take(&mut self.current);
        self.full_redraw = false;

        if self.flush_times.len() == FLUSH_HISTORY {
            self.flush_times.pop_front();
        }
        self.flush_times.push_back(started.elapsed());
        self.update_debug_title()?;

        Ok(stats)
    }

    fn update_debug_title(&mut self) -> Result<()> {
        if self.config.debug {
            if let Some(avg) = self.avg_flush_time() {
                let title = format!(
                    "{} - draw-time: {:.5}sec",
                    self.config.title,
                    avg.as_secs_f64()
                );
                self.io.set_title(&title)?;
            }
        }
        Ok(())
    }

    // ── Queries ─────────────────────────────────────────────────────

    /// Mean duration of the most recent flushes, `None` before the first.
    #[must_use]
    pub fn avg_flush_time(&self) -> Option<Duration> {
        let count = u32::try_from(self.flush_times.len()).ok().filter(|n| *n > 0)?;
        Some(self.flush_times.iter().sum::<Duration>() / count)
    }

    /// Whether an interrupt signal arrived. The event stream checks this on
    /// every step; loops that draw without reading events can poll it.
    #[must_use]
    pub fn interrupted(&self) -> bool {
        self.io.interrupted()
    }

    /// Last mouse position reported, [`Position::UNKNOWN`] before any.
    #[must_use]
    pub const fn mouse_position(&self) -> Position {
        self.mouse.position()
    }

    /// Current terminal size, queried from the adapter.
    #[must_use]
    pub fn size(&self) -> Size {
        self.io.size()
    }

    #[must_use]
    pub const fn config(&self) -> &ScreenConfig {
        &self.config
    }

    /// The adapter, for inspection.
    #[must_use]
    pub const fn io(&self) -> &T {
        &self.io
    }

    pub const fn io_mut(&mut self) -> &mut T {
        &mut self.io
    }

    // ── Input ───────────────────────────────────────────────────────

    /// Stream of input events.
    ///
    /// With `timeout`, a background reader runs for as long as the
    /// iterator lives and [`Event::Timeout`] is yielded whenever no input
    /// arrives in time. The stream ends after [`Event::ScreenClosed`].
    pub fn events(&mut self, timeout: Option<Duration>) -> Events<'_, T> {
        Events {
            screen: self,
            timeout,
            channel: None,
            decoder: Utf8Decoder::new(),
            pending: VecDeque::new(),
            closed: false,
        }
    }
}

impl<T: TerminalIo> Drop for Screen<T> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            error!(error = %e, "terminal restore on drop failed");
        }
    }
}

// ─── Events ──────────────────────────────────────────────────────────────────

/// Iterator returned by [`Screen::events`].
///
/// It borrows the screen mutably; draw through [`screen`](Self::screen)
/// while iterating.
pub struct Events<'a, T: TerminalIo> {
    screen: &'a mut Screen<T>,
    timeout: Option<Duration>,
    /// Background reader for timeout mode, started on first use.
    channel: Option<(InputReader, Receiver<Vec<u8>>)>,
    /// Holds back a char split across two reads.
    decoder: Utf8Decoder,
    /// Units of the last read not yet turned into events.
    pending: VecDeque<String>,
    closed: bool,
}

/// What a single wait for input produced.
enum Input {
    Chunk(Vec<u8>),
    TimedOut,
    Ended,
}

impl<T: TerminalIo> Events<'_, T> {
    /// The screen, for drawing between events.
    pub const fn screen(&mut self) -> &mut Screen<T> {
        self.screen
    }

    fn wait(&mut self) -> Input {
        let Some(timeout) = self.timeout else {
            return match self.screen.io.read_raw(true) {
                Ok(bytes) if bytes.is_empty() => Input::Ended,
                Ok(bytes) => Input::Chunk(bytes),
                Err(e) => {
                    warn!(error = %e, "terminal read failed");
                    Input::Ended
                }
            };
        };

        if self.channel.is_none() {
            match self.screen.io.spawn_reader() {
                Ok(channel) => self.channel = Some(channel),
                Err(e) => {
                    error!(error = %e, "failed to start input reader");
                    return Input::Ended;
                }
            }
        }
        let Some((_, rx)) = &self.channel else {
            return Input::Ended;
        };

        match rx.recv_timeout(timeout) {
            Ok(bytes) => Input::Chunk(bytes),
            Err(RecvTimeoutError::Timeout) => Input::TimedOut,
            Err(RecvTimeoutError::Disconnected) => Input::Ended,
        }
    }

    fn close(&mut self) -> Event {
        self.closed = true;
        self.pending.clear();
        self.channel = None;
        Event::ScreenClosed
    }
}

impl<T: TerminalIo> Iterator for Events<'_, T> {
    type Item = Event;

    fn next(&mut self) -> Option<Event> {
        if self.closed {
            return None;
        }

        loop {
            if self.screen.io.interrupted() {
                debug!("interrupt signal received");
                return Some(self.close());
            }

            if let Some(unit) = self.pending.pop_front() {
                if unit == CTRL_C && self.screen.config.interrupt_on_ctrl_c {
                    debug!("ctrl-c received");
                    return Some(self.close());
                }
                return Some(parse_event(&unit, &mut self.screen.mouse));
            }

            match self.wait() {
                Input::Chunk(bytes) => {
                    let chunk = self.decoder.decode(&bytes);
                    self.pending
                        .extend(split_reads(&chunk).into_iter().map(str::to_string));
                }
                Input::TimedOut => return Some(Event::Timeout),
                Input::Ended => {
                    debug!("input ended");
                    return Some(self.close());
                }
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ModifierKey;
    use crate::memory::MemoryTerminal;
    use crate::reader::ScriptStep;
    use pretty_assertions::assert_eq;
    use std::io;
    use std::sync::mpsc::Receiver;
    use tk_style::Color;

    fn open(cols: u16, rows: u16) -> Screen<MemoryTerminal> {
        open_with(MemoryTerminal::new(Size { cols, rows }), ScreenConfig::default())
    }

    fn open_with(term: MemoryTerminal, config: ScreenConfig) -> Screen<MemoryTerminal> {
        let mut screen = Screen::open(term, config).unwrap();
        screen.io_mut().take_output();
        screen
    }

    fn output(screen: &mut Screen<MemoryTerminal>) -> String {
        String::from_utf8(screen.io_mut().take_output()).unwrap()
    }

    fn collect(screen: &mut Screen<MemoryTerminal>, timeout: Option<Duration>) -> Vec<Event> {
        screen.events(timeout).collect()
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    #[test]
    fn open_switches_modes_on() {
        let screen = Screen::open(
            MemoryTerminal::new(Size { cols: 10, rows: 2 }),
            ScreenConfig {
                title: "demo".into(),
                ..ScreenConfig::default()
            },
        )
        .unwrap();
        let term = screen.io();
        assert!(term.is_raw_mode());
        assert!(term.is_alternate_screen());
        assert!(!term.is_cursor_visible());
        assert!(term.is_mouse_reporting());
        assert_eq!(term.title(), Some("demo"));
    }

    #[test]
    fn close_restores_everything() {
        let mut screen = open(10, 2);
        screen.close().unwrap();
        let term = screen.io();
        assert!(!term.is_raw_mode());
        assert!(!term.is_alternate_screen());
        assert!(term.is_cursor_visible());
        assert!(!term.is_mouse_reporting());
        assert_eq!(term.title(), Some(""));
        assert!(!screen.is_active());
    }

    #[test]
    fn close_runs_in_reverse_order() {
        let mut screen = open(10, 2);
        screen.close().unwrap();
        assert_eq!(
            output(&mut screen),
            "\x1b[?1015l\x1b[?1006l\x1b[?1003l\x1b[?1002l\x1b[?25h\x1b[?1049l\x1b]2;\x07"
        );
    }

    #[test]
    fn close_is_idempotent() {
        let mut screen = open(10, 2);
        screen.close().unwrap();
        output(&mut screen);
        screen.close().unwrap();
        assert_eq!(output(&mut screen), "");
    }

    #[test]
    fn modes_subset_is_honored() {
        let config = ScreenConfig {
            modes: Modes::RAW | Modes::HIDE_CURSOR,
            ..ScreenConfig::default()
        };
        let screen = open_with(MemoryTerminal::new(Size { cols: 5, rows: 5 }), config);
        assert!(screen.io().is_raw_mode());
        assert!(!screen.io().is_alternate_screen());
        assert!(!screen.io().is_mouse_reporting());
    }

    #[test]
    fn mouse_position_starts_unknown() {
        let screen = open(10, 2);
        assert_eq!(screen.mouse_position(), Position::UNKNOWN);
    }

    // ── Restore failures ────────────────────────────────────────────────

    /// Memory terminal whose raw-mode restore fails.
    struct StuckTerminal(MemoryTerminal);

    impl TerminalIo for StuckTerminal {
        fn size(&self) -> Size {
            self.0.size()
        }
        fn read_raw(&mut self, blocking: bool) -> io::Result<Vec<u8>> {
            self.0.read_raw(blocking)
        }
        fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
            self.0.write(bytes)
        }
        fn set_raw_mode(&mut self, enabled: bool) -> io::Result<()> {
            if enabled {
                self.0.set_raw_mode(true)
            } else {
                Err(io::Error::other("tcsetattr failed"))
            }
        }
        fn spawn_reader(&mut self) -> io::Result<(InputReader, Receiver<Vec<u8>>)> {
            self.0.spawn_reader()
        }
        fn set_mouse_reporting(&mut self, enabled: bool) -> io::Result<()> {
            self.0.set_mouse_reporting(enabled)
        }
        fn set_title(&mut self, title: &str) -> io::Result<()> {
            self.0.set_title(title)
        }
    }

    #[test]
    fn failed_restore_step_is_reported_and_others_still_run() {
        let term = StuckTerminal(MemoryTerminal::new(Size { cols: 4, rows: 4 }));
        let mut screen = Screen::open(term, ScreenConfig::default()).unwrap();

        let err = screen.close().unwrap_err();
        assert!(matches!(err, TermError::TerminalStateRestore(_)));
        assert!(!screen.io().0.is_mouse_reporting());
        assert_eq!(screen.io().0.title(), Some(""));
    }

    // ── Drawing ─────────────────────────────────────────────────────────

    #[test]
    fn put_str_then_flush() {
        let mut screen = open(10, 3);
        screen.put_str(Position::new(1, 0), "hi");
        let stats = screen.flush().unwrap();
        assert_eq!(output(&mut screen), "\x1b[1;2Hhi");
        assert_eq!(stats.cells_rendered, 2);
    }

    #[test]
    fn unrepeated_cells_are_blanked_next_flush() {
        let mut screen = open(10, 3);
        screen.put_str(Position::new(1, 0), "hi");
        screen.flush().unwrap();
        output(&mut screen);

        screen.flush().unwrap();
        assert_eq!(output(&mut screen), "\x1b[1;2H  ");
    }

    #[test]
    fn repeated_frame_writes_nothing() {
        let mut screen = open(10, 3);
        screen.put_str(Position::new(0, 1), "same");
        screen.flush().unwrap();
        output(&mut screen);

        screen.put_str(Position::new(0, 1), "same");
        let stats = screen.flush().unwrap();
        assert_eq!(output(&mut screen), "");
        assert_eq!(stats.cells_skipped, 4);
    }

    #[test]
    fn styled_text_keeps_style_per_cell() {
        let mut screen = open(10, 3);
        let red = Color::rgb(255, 0, 0);
        screen.put_str(Position::new(0, 0), FormatStr::styled("ab", Some(&red), None));
        screen.flush().unwrap();
        assert_eq!(output(&mut screen), "\x1b[1;1H\x1b[38;5;196mab\x1b[0m");
    }

    #[test]
    fn put_pixels_last_write_wins() {
        let mut screen = open(10, 3);
        screen.put_str(Position::new(0, 0), "a");
        screen.put_pixels([
            (Position::new(0, 0), "b".to_string()),
            (Position::new(2, 2), "c".to_string()),
        ]);
        screen.flush().unwrap();
        assert_eq!(output(&mut screen), "\x1b[1;1Hb\x1b[3;3Hc");
    }

    #[test]
    fn off_screen_writes_are_dropped() {
        let mut screen = open(3, 1);
        screen.put_str(Position::new(-1, 0), "abcde");
        screen.flush().unwrap();
        assert_eq!(output(&mut screen), "\x1b[1;1Hbcd");
    }

    #[test]
    fn discard_drops_recorded_cells() {
        let mut screen = open(3, 1);
        screen.put_str(Position::new(0, 0), "x");
        screen.discard();
        screen.flush().unwrap();
        assert_eq!(output(&mut screen), "");
    }

    #[test]
    fn clear_blanks_shown_cells_immediately() {
        let mut screen = open(10, 3);
        screen.put_str(Position::new(1, 0), "hi");
        screen.flush().unwrap();
        output(&mut screen);

        screen.put_str(Position::new(5, 2), "x");
        screen.clear().unwrap();
        assert_eq!(output(&mut screen), "\x1b[1;2H  ");

        // The recorded frame survives the clear.
        screen.flush().unwrap();
        assert_eq!(output(&mut screen), "\x1b[3;6Hx");
    }

    #[test]
    fn resize_forces_full_redraw() {
        let mut screen = open(3, 1);
        screen.put_str(Position::new(0, 0), "a");
        screen.flush().unwrap();
        output(&mut screen);

        screen.io_mut().resize(Size { cols: 4, rows: 1 });
        screen.put_str(Position::new(0, 0), "a");
        let stats = screen.flush().unwrap();
        assert_eq!(output(&mut screen), "\x1b[1;1Ha   ");
        assert_eq!(stats.cells_rendered, 4);
        assert_eq!(screen.size(), Size { cols: 4, rows: 1 });
    }

    #[test]
    fn flush_times_are_tracked() {
        let mut screen = open(3, 1);
        assert_eq!(screen.avg_flush_time(), None);
        screen.flush().unwrap();
        assert!(screen.avg_flush_time().is_some());
    }

    #[test]
    fn flush_history_is_bounded() {
        let mut screen = open(3, 1);
        for _ in 0..FLUSH_HISTORY + 10 {
            screen.flush().unwrap();
        }
        assert_eq!(screen.flush_times.len(), FLUSH_HISTORY);
    }

    #[test]
    fn debug_title_shows_draw_time() {
        let config = ScreenConfig {
            title: "demo".into(),
            debug: true,
            ..ScreenConfig::default()
        };
        let mut screen = open_with(MemoryTerminal::new(Size { cols: 3, rows: 1 }), config);
        screen.flush().unwrap();
        let title = screen.io().title().unwrap();
        assert!(title.starts_with("demo - draw-time: 0."), "{title}");
        assert!(title.ends_with("sec"));
    }

    // ── Events: blocking ────────────────────────────────────────────────

    #[test]
    fn blocking_events_end_with_screen_closed() {
        let mut term = MemoryTerminal::new(Size { cols: 10, rows: 2 });
        term.push_input("a");
        term.push_input("\x1b[A");
        let mut screen = open_with(term, ScreenConfig::default());

        assert_eq!(
            collect(&mut screen, None),
            vec![
                Event::KeyPressed {
                    ch: 'a',
                    raw: "a".into()
                },
                Event::ModifierKey {
                    key: ModifierKey::Up,
                    raw: "\x1b[A".into()
                },
                Event::ScreenClosed,
            ]
        );
    }

    #[test]
    fn typed_burst_is_split_per_char() {
        let mut term = MemoryTerminal::new(Size { cols: 10, rows: 2 });
        term.push_input("ok");
        let mut screen = open_with(term, ScreenConfig::default());
        let events = collect(&mut screen, None);
        assert!(matches!(events[0], Event::KeyPressed { ch: 'o', .. }));
        assert!(matches!(events[1], Event::KeyPressed { ch: 'k', .. }));
        assert_eq!(events[2], Event::ScreenClosed);
    }

    #[test]
    fn ctrl_c_closes_the_stream() {
        let mut term = MemoryTerminal::new(Size { cols: 10, rows: 2 });
        term.push_input("\x03");
        term.push_input("never seen");
        let mut screen = open_with(term, ScreenConfig::default());
        assert_eq!(collect(&mut screen, None), vec![Event::ScreenClosed]);
    }

    #[test]
    fn ctrl_c_is_a_key_when_not_interrupting() {
        let mut term = MemoryTerminal::new(Size { cols: 10, rows: 2 });
        term.push_input("\x03");
        let config = ScreenConfig {
            interrupt_on_ctrl_c: false,
            ..ScreenConfig::default()
        };
        let mut screen = open_with(term, config);
        let events = collect(&mut screen, None);
        assert!(matches!(
            events[0],
            Event::ModifierKey {
                key: ModifierKey::CtrlC,
                ..
            }
        ));
    }

    #[test]
    fn interrupt_signal_closes_the_stream() {
        let mut term = MemoryTerminal::new(Size { cols: 10, rows: 2 });
        term.push_input("a");
        term.set_interrupted(true);
        let mut screen = open_with(term, ScreenConfig::default());
        assert_eq!(collect(&mut screen, None), vec![Event::ScreenClosed]);
    }

    #[test]
    fn mouse_events_update_position() {
        let mut term = MemoryTerminal::new(Size { cols: 10, rows: 2 });
        term.push_input("\x1b[<0;3;2M");
        term.push_input("\x1b[<32;5;2M");
        let mut screen = open_with(term, ScreenConfig::default());

        let events = collect(&mut screen, None);
        assert!(matches!(
            events[1],
            Event::MouseDrag {
                x: 4,
                y: 1,
                from_x: 2,
                from_y: 1,
                ..
            }
        ));
        assert_eq!(screen.mouse_position(), Position::new(4, 1));
    }

    #[test]
    fn drawing_while_iterating() {
        let mut term = MemoryTerminal::new(Size { cols: 10, rows: 2 });
        term.push_input("x");
        let mut screen = open_with(term, ScreenConfig::default());

        let mut events = screen.events(None);
        while let Some(event) = events.next() {
            if let Event::KeyPressed { ch, .. } = event {
                events.screen().put_str(Position::new(0, 0), ch.to_string());
                events.screen().flush().unwrap();
            }
        }
        drop(events);
        assert_eq!(output(&mut screen), "\x1b[1;1Hx");
    }

    #[test]
    fn char_split_across_reads_is_one_key() {
        let mut term = MemoryTerminal::new(Size { cols: 10, rows: 2 });
        term.push_input([0xF0u8, 0x9F]);
        term.push_input([0x98u8, 0x80]);
        let mut screen = open_with(term, ScreenConfig::default());
        assert_eq!(
            collect(&mut screen, None),
            vec![
                Event::KeyPressed {
                    ch: '\u{1F600}',
                    raw: "\u{1F600}".into()
                },
                Event::ScreenClosed,
            ]
        );
    }

    #[test]
    fn interrupt_is_visible_without_reading_events() {
        let mut screen = open(10, 2);
        assert!(!screen.interrupted());
        screen.io_mut().set_interrupted(true);
        assert!(screen.interrupted());
    }

    // ── Events: timeout ─────────────────────────────────────────────────

    #[test]
    fn timeout_mode_yields_timeouts_until_input() {
        let mut term = MemoryTerminal::new(Size { cols: 10, rows: 2 });
        term.push_step(ScriptStep::Pause(Duration::from_millis(300)));
        term.push_input("x");
        let mut screen = open_with(term, ScreenConfig::default());

        let events = collect(&mut screen, Some(Duration::from_millis(20)));
        assert_eq!(events.first(), Some(&Event::Timeout));
        let rest: Vec<_> = events
            .into_iter()
            .filter(|e| *e != Event::Timeout)
            .collect();
        assert_eq!(
            rest,
            vec![
                Event::KeyPressed {
                    ch: 'x',
                    raw: "x".into()
                },
                Event::ScreenClosed,
            ]
        );
    }

    #[test]
    fn split_char_through_background_reader() {
        let mut term = MemoryTerminal::new(Size { cols: 10, rows: 2 });
        term.push_step(ScriptStep::Bytes(vec![b'a', 0xF0, 0x9F]));
        term.push_step(ScriptStep::Pause(Duration::from_millis(50)));
        term.push_step(ScriptStep::Bytes(vec![0x98, 0x80]));
        let mut screen = open_with(term, ScreenConfig::default());

        let keys: Vec<_> = collect(&mut screen, Some(Duration::from_millis(10)))
            .into_iter()
            .filter_map(|e| match e {
                Event::KeyPressed { ch, .. } => Some(ch),
                _ => None,
            })
            .collect();
        assert_eq!(keys, vec!['a', '\u{1F600}']);
    }

    #[test]
    fn stream_is_fused_after_close() {
        let mut screen = open(10, 2);
        // Empty script: the reader hangs up long before the timeout.
        let mut events = screen.events(Some(Duration::from_secs(5)));
        assert_eq!(events.next(), Some(Event::ScreenClosed));
        assert_eq!(events.next(), None);
        assert_eq!(events.next(), None);
    }
}
