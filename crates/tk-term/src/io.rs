// SPDX-License-Identifier: MIT
//
// The terminal adapter seam.
//
// `Screen` never touches a tty directly. It talks to a `TerminalIo`, which
// owns the byte-level side: reading input, writing output, and toggling
// terminal modes. The escape-sequence mode switches have default
// implementations on top of `write`, so an adapter only has to provide the
// parts that differ (raw mode, size, input).

use std::io;
use std::sync::mpsc::Receiver;

use crate::ansi;
use crate::event::{Position, parse_cursor_report};
use crate::reader::InputReader;
use crate::terminal::Size;

/// Byte-level access to a terminal.
pub trait TerminalIo {
    /// Current size in cells.
    fn size(&self) -> Size;

    /// Read one chunk of raw input.
    ///
    /// A blocking read waits for input; a non-blocking read returns an empty
    /// chunk when nothing is pending. An empty chunk from a blocking read
    /// means the input has ended.
    ///
    /// # Errors
    ///
    /// Returns the underlying read error.
    fn read_raw(&mut self, blocking: bool) -> io::Result<Vec<u8>>;

    /// Write `bytes` and flush them to the terminal.
    ///
    /// # Errors
    ///
    /// Returns the underlying write error.
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Enter (`true`) or leave (`false`) raw input mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal attributes cannot be changed.
    fn set_raw_mode(&mut self, enabled: bool) -> io::Result<()>;

    /// Start a background reader for timeout-driven event streams.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader thread cannot be spawned.
    fn spawn_reader(&mut self) -> io::Result<(InputReader, Receiver<Vec<u8>>)>;

    /// Whether an interrupt signal arrived since the session started.
    fn interrupted(&self) -> bool {
        false
    }

    /// Move the cursor. Negative coordinates clamp to zero.
    ///
    /// # Errors
    ///
    /// Returns the underlying write error.
    fn move_cursor(&mut self, pos: Position) -> io::Result<()> {
        let clamp = |v: i32| u16::try_from(v.max(0)).unwrap_or(u16::MAX);
        let mut buf = Vec::with_capacity(16);
        ansi::cursor_to(&mut buf, clamp(pos.x), clamp(pos.y))?;
        self.write(&buf)
    }

    /// Move the cursor `n` cells up.
    ///
    /// # Errors
    ///
    /// Returns the underlying write error.
    fn move_cursor_up(&mut self, n: u16) -> io::Result<()> {
        write_seq(self, |buf| ansi::cursor_up(buf, n))
    }

    /// # Errors
    ///
    /// Returns the underlying write error.
    fn move_cursor_down(&mut self, n: u16) -> io::Result<()> {
        write_seq(self, |buf| ansi::cursor_down(buf, n))
    }

    /// # Errors
    ///
    /// Returns the underlying write error.
    fn move_cursor_right(&mut self, n: u16) -> io::Result<()> {
        write_seq(self, |buf| ansi::cursor_right(buf, n))
    }

    /// # Errors
    ///
    /// Returns the underlying write error.
    fn move_cursor_left(&mut self, n: u16) -> io::Result<()> {
        write_seq(self, |buf| ansi::cursor_left(buf, n))
    }

    /// Remember the cursor position for [`restore_cursor_pos`](Self::restore_cursor_pos).
    ///
    /// # Errors
    ///
    /// Returns the underlying write error.
    fn save_cursor_pos(&mut self) -> io::Result<()> {
        write_seq(self, |buf| ansi::save_cursor(buf))
    }

    /// # Errors
    ///
    /// Returns the underlying write error.
    fn restore_cursor_pos(&mut self) -> io::Result<()> {
        write_seq(self, |buf| ansi::restore_cursor(buf))
    }

    /// # Errors
    ///
    /// Returns the underlying write error.
    fn erase_end_of_line(&mut self) -> io::Result<()> {
        write_seq(self, |buf| ansi::erase_to_eol(buf))
    }

    /// Ask the terminal window to resize. Not every terminal honors this;
    /// check [`size`](Self::size) afterwards.
    ///
    /// # Errors
    ///
    /// Returns the underlying write error.
    fn set_size(&mut self, size: Size) -> io::Result<()> {
        write_seq(self, |buf| ansi::resize_window(buf, size.cols, size.rows))
    }

    /// Query the cursor position (zero-indexed).
    ///
    /// Sends a position request and blocks reading input until the reply
    /// arrives. Anything read before the reply is discarded, so don't call
    /// this while an event stream is reading.
    ///
    /// # Errors
    ///
    /// [`io::ErrorKind::UnexpectedEof`] if input ends before a reply, or the
    /// underlying read/write error.
    fn cursor_position(&mut self) -> io::Result<Position> {
        write_seq(self, |buf| ansi::request_cursor_position(buf))?;
        let mut received = Vec::new();
        loop {
            let chunk = self.read_raw(true)?;
            if chunk.is_empty() {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "input ended before the cursor position report",
                ));
            }
            received.extend_from_slice(&chunk);
            if let Some(pos) = parse_cursor_report(&received) {
                return Ok(pos);
            }
        }
    }

    /// Switch to (`true`) or away from (`false`) the alternate screen.
    ///
    /// # Errors
    ///
    /// Returns the underlying write error.
    fn set_alternate_screen(&mut self, enabled: bool) -> io::Result<()> {
        let mut buf = Vec::with_capacity(16);
        if enabled {
            ansi::enter_alt_screen(&mut buf)?;
            ansi::clear_screen(&mut buf)?;
        } else {
            ansi::exit_alt_screen(&mut buf)?;
        }
        self.write(&buf)
    }

    /// # Errors
    ///
    /// Returns the underlying write error.
    fn set_cursor_visible(&mut self, visible: bool) -> io::Result<()> {
        let mut buf = Vec::with_capacity(8);
        if visible {
            ansi::cursor_show(&mut buf)?;
        } else {
            ansi::cursor_hide(&mut buf)?;
        }
        self.write(&buf)
    }

    /// Turn SGR mouse reporting on or off.
    ///
    /// # Errors
    ///
    /// Returns the underlying write error.
    fn set_mouse_reporting(&mut self, enabled: bool) -> io::Result<()> {
        let mut buf = Vec::with_capacity(32);
        if enabled {
            ansi::enable_mouse(&mut buf)?;
        } else {
            ansi::disable_mouse(&mut buf)?;
        }
        self.write(&buf)
    }

    /// # Errors
    ///
    /// Returns the underlying write error.
    fn set_title(&mut self, title: &str) -> io::Result<()> {
        let mut buf = Vec::with_capacity(title.len() + 8);
        ansi::set_title(&mut buf, title)?;
        self.write(&buf)
    }
}

/// Build a sequence in a scratch buffer and write it in one go. Empty
/// sequences are not written.
fn write_seq<T, F>(io: &mut T, build: F) -> io::Result<()>
where
    T: TerminalIo + ?Sized,
    F: FnOnce(&mut Vec<u8>) -> io::Result<()>,
{
    let mut buf = Vec::with_capacity(16);
    build(&mut buf)?;
    if buf.is_empty() {
        return Ok(());
    }
    io.write(&buf)
}
