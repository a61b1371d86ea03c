// SPDX-License-Identifier: MIT
//
// ANSI escape sequence generation.
//
// Pure functions that write escape sequences to any `impl Write`. No state,
// no decisions about when to emit. The renderer and the terminal adapters
// decide that; this module only knows the bytes.
//
// Cursor positions are 0-indexed in our API and converted to 1-indexed for
// the terminal (CUP is 1-based).

use std::io::{self, Write};

// ─── Cursor ──────────────────────────────────────────────────────────────────

/// Move the cursor to `(x, y)` using the CUP (Cursor Position) sequence.
#[inline]
pub fn cursor_to(w: &mut impl Write, x: u16, y: u16) -> io::Result<()> {
    write!(w, "\x1b[{};{}H", u32::from(y) + 1, u32::from(x) + 1)
}

/// Hide the cursor (DECTCEM reset).
#[inline]
pub fn cursor_hide(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25l")
}

/// Show the cursor (DECTCEM set).
#[inline]
pub fn cursor_show(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25h")
}

/// Move the cursor `n` cells up (CUU). Nothing is written for `n == 0`,
/// since terminals treat a zero count as one.
#[inline]
pub fn cursor_up(w: &mut impl Write, n: u16) -> io::Result<()> {
    relative_move(w, n, 'A')
}

/// Move the cursor `n` cells down (CUD).
#[inline]
pub fn cursor_down(w: &mut impl Write, n: u16) -> io::Result<()> {
    relative_move(w, n, 'B')
}

/// Move the cursor `n` cells right (CUF).
#[inline]
pub fn cursor_right(w: &mut impl Write, n: u16) -> io::Result<()> {
    relative_move(w, n, 'C')
}

/// Move the cursor `n` cells left (CUB).
#[inline]
pub fn cursor_left(w: &mut impl Write, n: u16) -> io::Result<()> {
    relative_move(w, n, 'D')
}

fn relative_move(w: &mut impl Write, n: u16, dir: char) -> io::Result<()> {
    if n == 0 {
        return Ok(());
    }
    write!(w, "\x1b[{n}{dir}")
}

/// Save the cursor position (SCOSC).
#[inline]
pub fn save_cursor(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[s")
}

/// Restore the position saved by [`save_cursor`] (SCORC).
#[inline]
pub fn restore_cursor(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[u")
}

/// Ask the terminal to report the cursor position (DSR 6). The reply
/// arrives on input as `ESC [ row ; col R`.
#[inline]
pub fn request_cursor_position(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[6n")
}

// ─── Screen ──────────────────────────────────────────────────────────────────

/// Clear the entire screen (ED 2).
#[inline]
pub fn clear_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[2J")
}

/// Erase from the cursor to the end of the line (EL 0).
#[inline]
pub fn erase_to_eol(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[K")
}

/// Ask the terminal window to resize to `cols × rows` cells (XTWINOPS 8).
///
/// Many terminals ignore this.
#[inline]
pub fn resize_window(w: &mut impl Write, cols: u16, rows: u16) -> io::Result<()> {
    write!(w, "\x1b[8;{rows};{cols}t")
}

/// Reset all SGR attributes to terminal defaults (SGR 0).
#[inline]
pub fn reset(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[0m")
}

// ─── Alternate Screen ───────────────────────────────────────────────────────

/// Enter the alternate screen buffer (DEC Private Mode 1049).
#[inline]
pub fn enter_alt_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1049h")
}

/// Exit the alternate screen buffer and restore original content.
#[inline]
pub fn exit_alt_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1049l")
}

// ─── Mouse Protocol ─────────────────────────────────────────────────────────

/// Enable mouse reporting: drag (1002), any motion (1003), SGR encoding
/// (1006) and urxvt encoding (1015) as a fallback for older terminals.
///
/// Every report the parser understands comes in the SGR form
/// `ESC [ < btn ; col ; row (M|m)`.
pub fn enable_mouse(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1002h\x1b[?1003h\x1b[?1006h\x1b[?1015h")
}

/// Disable mouse reporting, in reverse order of [`enable_mouse`].
pub fn disable_mouse(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1015l\x1b[?1006l\x1b[?1003l\x1b[?1002l")
}

// ─── Window Title ───────────────────────────────────────────────────────────

/// Set the window title (OSC 2, BEL-terminated).
///
/// Control characters in `title` are dropped so the sequence cannot be
/// terminated early.
pub fn set_title(w: &mut impl Write, title: &str) -> io::Result<()> {
    w.write_all(b"\x1b]2;")?;
    for ch in title.chars().filter(|c| !c.is_control()) {
        let mut buf = [0u8; 4];
        w.write_all(ch.encode_utf8(&mut buf).as_bytes())?;
    }
    w.write_all(b"\x07")
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Helper: run an ANSI function and return its output as a string.
    fn emit<F>(f: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> io::Result<()>,
    {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    // ── Cursor ──────────────────────────────────────────────────────────

    #[test]
    fn cursor_to_origin() {
        assert_eq!(emit(|w| cursor_to(w, 0, 0)), "\x1b[1;1H");
    }

    #[test]
    fn cursor_to_position() {
        assert_eq!(emit(|w| cursor_to(w, 10, 20)), "\x1b[21;11H");
    }

    #[test]
    fn cursor_to_does_not_overflow() {
        assert_eq!(emit(|w| cursor_to(w, u16::MAX, u16::MAX)), "\x1b[65536;65536H");
    }

    #[test]
    fn cursor_visibility() {
        assert_eq!(emit(|w| cursor_hide(w)), "\x1b[?25l");
        assert_eq!(emit(|w| cursor_show(w)), "\x1b[?25h");
    }

    #[test]
    fn relative_moves() {
        assert_eq!(emit(|w| cursor_up(w, 3)), "\x1b[3A");
        assert_eq!(emit(|w| cursor_down(w, 1)), "\x1b[1B");
        assert_eq!(emit(|w| cursor_right(w, 12)), "\x1b[12C");
        assert_eq!(emit(|w| cursor_left(w, 2)), "\x1b[2D");
    }

    #[test]
    fn zero_step_move_writes_nothing() {
        assert_eq!(emit(|w| cursor_left(w, 0)), "");
    }

    #[test]
    fn save_restore_and_report() {
        assert_eq!(emit(|w| save_cursor(w)), "\x1b[s");
        assert_eq!(emit(|w| restore_cursor(w)), "\x1b[u");
        assert_eq!(emit(|w| request_cursor_position(w)), "\x1b[6n");
    }

    // ── Screen ──────────────────────────────────────────────────────────

    #[test]
    fn erase_and_resize_sequences() {
        assert_eq!(emit(|w| erase_to_eol(w)), "\x1b[K");
        assert_eq!(emit(|w| resize_window(w, 100, 30)), "\x1b[8;30;100t");
    }

    #[test]
    fn clear_screen_sequence() {
        assert_eq!(emit(|w| clear_screen(w)), "\x1b[2J");
    }

    #[test]
    fn reset_sequence() {
        assert_eq!(emit(|w| reset(w)), "\x1b[0m");
    }

    #[test]
    fn alt_screen_sequences() {
        assert_eq!(emit(|w| enter_alt_screen(w)), "\x1b[?1049h");
        assert_eq!(emit(|w| exit_alt_screen(w)), "\x1b[?1049l");
    }

    // ── Mouse ───────────────────────────────────────────────────────────

    #[test]
    fn enable_mouse_sequence() {
        assert_eq!(
            emit(|w| enable_mouse(w)),
            "\x1b[?1002h\x1b[?1003h\x1b[?1006h\x1b[?1015h"
        );
    }

    #[test]
    fn disable_mouse_reverses_enable() {
        assert_eq!(
            emit(|w| disable_mouse(w)),
            "\x1b[?1015l\x1b[?1006l\x1b[?1003l\x1b[?1002l"
        );
    }

    // ── Title ───────────────────────────────────────────────────────────

    #[test]
    fn title_sequence() {
        assert_eq!(emit(|w| set_title(w, "demo")), "\x1b]2;demo\x07");
    }

    #[test]
    fn title_drops_control_chars() {
        assert_eq!(emit(|w| set_title(w, "a\x07b\x1bc")), "\x1b]2;abc\x07");
    }

    #[test]
    fn title_keeps_unicode() {
        assert_eq!(emit(|w| set_title(w, "café ✓")), "\x1b]2;café ✓\x07");
    }

    // ── Composition ─────────────────────────────────────────────────────

    #[test]
    fn sequences_compose() {
        let s = emit(|w| {
            enter_alt_screen(w)?;
            cursor_hide(w)?;
            cursor_to(w, 4, 2)
        });
        assert_eq!(s, "\x1b[?1049h\x1b[?25l\x1b[3;5H");
    }
}
