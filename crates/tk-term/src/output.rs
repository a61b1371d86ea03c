// SPDX-License-Identifier: MIT
//
// Output buffering and stateful cell writing.
//
//   OutputBuffer: accumulates every byte of a frame in memory so the
//   terminal receives it in one write.
//
//   CellWriter: remembers where the cursor is and which SGR style is live
//   on the terminal. A cell that continues the previous one on the same row
//   gets no cursor move; a cell with the same style prefix as the previous
//   one gets no escapes at all. A style change always resets first, so a
//   styled cell never bleeds into an unstyled neighbour.
//
// Cells are strings: an optional run of SGR escapes followed by the visible
// text, normally one char (what `FormatStr::cells` produces).

use std::io::{self, Write};

use tk_style::format::{split_style, visible_len};

use crate::ansi;

// ─── OutputBuffer ────────────────────────────────────────────────────────────

/// A byte buffer that accumulates terminal output for a single write.
pub struct OutputBuffer {
    buf: Vec<u8>,
}

const DEFAULT_CAPACITY: usize = 16_384;

impl OutputBuffer {
    /// Create an empty buffer with default capacity (16 KB).
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(DEFAULT_CAPACITY),
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The accumulated bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    #[inline]
    pub fn push_str(&mut self, s: &str) {
        self.buf.extend_from_slice(s.as_bytes());
    }

    /// Clear the buffer for reuse (keeps allocated capacity).
    #[inline]
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Write accumulated output to `w` and clear the buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `w` fails.
    pub fn flush_to(&mut self, w: &mut impl Write) -> io::Result<()> {
        if !self.buf.is_empty() {
            w.write_all(&self.buf)?;
            w.flush()?;
            self.buf.clear();
        }
        Ok(())
    }
}

impl Write for OutputBuffer {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ─── CellWriter ──────────────────────────────────────────────────────────────

/// What the terminal's SGR state is known to be.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SgrState {
    /// Nothing set since the last reset.
    Default,
    /// Exactly this escape prefix is active.
    Styled(String),
    /// A cell carried escapes after its text; a reset is owed.
    Unknown,
}

/// Stateful cell writer that skips redundant cursor moves and escapes.
#[allow(clippy::struct_field_names)]
pub struct CellWriter {
    last_x: i32,
    last_y: i32,
    sgr: SgrState,
}

impl CellWriter {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_x: -1,
            last_y: -1,
            sgr: SgrState::Default,
        }
    }

    /// Forget all tracked state. Call at the start of every frame.
    #[allow(clippy::missing_const_for_fn)]
    pub fn reset_state(&mut self) {
        *self = Self::new();
    }

    /// Write one cell at `(x, y)`, emitting only the escapes it needs.
    pub fn render_cell(&mut self, out: &mut OutputBuffer, x: u16, y: u16, cell: &str) {
        let xi = i32::from(x);
        let yi = i32::from(y);

        if yi != self.last_y || xi != self.last_x + 1 {
            ansi::cursor_to(out, x, y).ok();
        }

        let (prefix, text) = split_style(cell);
        self.apply_style(out, prefix);
        out.push_str(text);

        if text.contains('\x1b') {
            self.sgr = SgrState::Unknown;
        }

        // The terminal cursor now sits after the cell's visible text.
        let advance = i32::try_from(visible_len(text)).unwrap_or(i32::MAX);
        self.last_x = xi.saturating_add(advance) - 1;
        self.last_y = yi;
    }

    /// Reset the terminal style if anything is still active.
    pub fn finish(&mut self, out: &mut OutputBuffer) {
        if self.sgr != SgrState::Default {
            ansi::reset(out).ok();
            self.sgr = SgrState::Default;
        }
    }

    fn apply_style(&mut self, out: &mut OutputBuffer, prefix: &str) {
        match &self.sgr {
            SgrState::Default if prefix.is_empty() => return,
            SgrState::Styled(active) if active == prefix => return,
            SgrState::Default => {}
            SgrState::Styled(_) | SgrState::Unknown => {
                ansi::reset(out).ok();
            }
        }

        if prefix.is_empty() {
            self.sgr = SgrState::Default;
        } else {
            out.push_str(prefix);
            self.sgr = SgrState::Styled(prefix.to_string());
        }
    }
}

impl Default for CellWriter {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const RED: &str = "\x1b[38;5;196m";
    const BLUE: &str = "\x1b[38;5;21m";

    // ── OutputBuffer ────────────────────────────────────────────────────

    #[test]
    fn output_buffer_new_is_empty() {
        let buf = OutputBuffer::new();
        assert!(buf.is_empty());
        assert_eq!(buf.len(), 0);
    }

    #[test]
    fn output_buffer_write_trait() {
        let mut buf = OutputBuffer::new();
        write!(buf, "hello {}", 42).unwrap();
        assert_eq!(buf.as_bytes(), b"hello 42");
    }

    #[test]
    fn output_buffer_flush_to_clears() {
        let mut buf = OutputBuffer::new();
        buf.push_str("frame data");

        let mut dest = Vec::new();
        buf.flush_to(&mut dest).unwrap();

        assert_eq!(dest, b"frame data");
        assert!(buf.is_empty());
    }

    #[test]
    fn output_buffer_flush_to_empty_is_noop() {
        let mut buf = OutputBuffer::new();
        let mut dest = Vec::new();
        buf.flush_to(&mut dest).unwrap();
        assert!(dest.is_empty());
    }

    // ── CellWriter helpers ────────────────────────────────────────────

    fn render_seq(cells: &[(u16, u16, &str)]) -> String {
        let mut out = OutputBuffer::new();
        let mut writer = CellWriter::new();
        for &(x, y, cell) in cells {
            writer.render_cell(&mut out, x, y, cell);
        }
        writer.finish(&mut out);
        String::from_utf8(out.as_bytes().to_vec()).unwrap()
    }

    // ── CellWriter cursor ─────────────────────────────────────────────

    #[test]
    fn first_cell_moves_cursor() {
        assert_eq!(render_seq(&[(5, 3, "A")]), "\x1b[4;6HA");
    }

    #[test]
    fn sequential_cells_skip_cursor_move() {
        let out = render_seq(&[(0, 0, "A"), (1, 0, "B"), (2, 0, "C")]);
        assert_eq!(out, "\x1b[1;1HABC");
    }

    #[test]
    fn gap_moves_cursor() {
        let out = render_seq(&[(0, 0, "A"), (5, 0, "B")]);
        assert_eq!(out, "\x1b[1;1HA\x1b[1;6HB");
    }

    #[test]
    fn new_row_moves_cursor() {
        let out = render_seq(&[(9, 0, "A"), (0, 1, "B")]);
        assert_eq!(out, "\x1b[1;10HA\x1b[2;1HB");
    }

    #[test]
    fn multi_char_cell_advances_cursor() {
        let out = render_seq(&[(0, 0, "ab"), (2, 0, "c")]);
        assert_eq!(out, "\x1b[1;1Habc");
    }

    #[test]
    fn empty_cell_does_not_advance() {
        let out = render_seq(&[(0, 0, ""), (1, 0, "x")]);
        assert_eq!(out, "\x1b[1;1H\x1b[1;2Hx");
    }

    // ── CellWriter style ──────────────────────────────────────────────

    #[test]
    fn same_style_emitted_once() {
        let a = format!("{RED}A");
        let b = format!("{RED}B");
        let out = render_seq(&[(0, 0, &a), (1, 0, &b)]);
        assert_eq!(out, format!("\x1b[1;1H{RED}AB\x1b[0m"));
    }

    #[test]
    fn style_change_resets_first() {
        let a = format!("{RED}A");
        let b = format!("{BLUE}B");
        let out = render_seq(&[(0, 0, &a), (1, 0, &b)]);
        assert_eq!(out, format!("\x1b[1;1H{RED}A\x1b[0m{BLUE}B\x1b[0m"));
    }

    #[test]
    fn styled_then_plain_resets() {
        let a = format!("{RED}A");
        let out = render_seq(&[(0, 0, &a), (1, 0, "B")]);
        assert_eq!(out, format!("\x1b[1;1H{RED}A\x1b[0mB"));
    }

    #[test]
    fn plain_cells_never_reset() {
        let out = render_seq(&[(0, 0, "A"), (1, 0, "B")]);
        assert!(!out.contains("\x1b[0m"));
    }

    #[test]
    fn trailing_escape_forces_reset() {
        let a = format!("{RED}A\x1b[0m");
        let out = render_seq(&[(0, 0, &a), (1, 0, "B")]);
        assert_eq!(out, format!("\x1b[1;1H{RED}A\x1b[0m\x1b[0mB"));
    }

    #[test]
    fn reset_state_forgets_cursor() {
        let mut out = OutputBuffer::new();
        let mut writer = CellWriter::new();
        writer.render_cell(&mut out, 0, 0, "A");
        writer.reset_state();
        out.clear();
        writer.render_cell(&mut out, 1, 0, "B");
        assert_eq!(out.as_bytes(), b"\x1b[1;2HB");
    }
}
