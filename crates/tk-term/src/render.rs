// SPDX-License-Identifier: MIT
//
// Differential renderer.
//
// A frame is a sparse map from position to cell text. Instead of redrawing
// the whole screen, each flush writes the union of two sets:
//
//   - every position drawn last frame, blanked (so stale cells disappear)
//   - every position written this frame, on top
//
// Cells whose text already matches what the terminal shows are skipped,
// unless a full redraw is pending (after a resize the terminal content is
// unknown). The survivors go through `CellWriter` in row-major order, so
// horizontal runs need a single cursor move and consecutive cells with the
// same style share one escape prefix. Everything lands in one
// `OutputBuffer` and reaches the terminal in one write.

use std::collections::{BTreeMap, HashMap};
use std::io;

use crate::event::Position;
use crate::io::TerminalIo;
use crate::output::{CellWriter, OutputBuffer};
use crate::terminal::Size;

/// A sparse frame: one string of cell text per position.
pub type PixelBuffer = HashMap<Position, String>;

const BLANK: &str = " ";

// ─── RenderStats ─────────────────────────────────────────────────────────────

/// Statistics from a render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderStats {
    /// Cells written to the terminal.
    pub cells_rendered: usize,
    /// Cells that already showed the right content.
    pub cells_skipped: usize,
    /// Bytes of terminal output generated.
    pub bytes_written: usize,
}

impl RenderStats {
    #[inline]
    #[must_use]
    pub const fn total_cells(&self) -> usize {
        self.cells_rendered + self.cells_skipped
    }
}

// ─── Renderer ────────────────────────────────────────────────────────────────

/// Differential renderer with a reusable output buffer.
pub struct Renderer {
    output: OutputBuffer,
    writer: CellWriter,
}

impl Renderer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            output: OutputBuffer::new(),
            writer: CellWriter::new(),
        }
    }

    /// Diff `current` against `last` and generate the output for `size`.
    ///
    /// Positions outside `size` are dropped. With `full_redraw`, cells are
    /// written even when `last` says the terminal already shows them.
    pub fn render(
        &mut self,
        current: &PixelBuffer,
        last: &PixelBuffer,
        size: Size,
        full_redraw: bool,
    ) -> RenderStats {
        self.output.clear();
        self.writer.reset_state();

        let mut frame: BTreeMap<(u16, u16), &str> = BTreeMap::new();
        for pos in last.keys() {
            if let Some(key) = row_major(*pos, size) {
                frame.insert(key, BLANK);
            }
        }
        for (pos, text) in current {
            if let Some(key) = row_major(*pos, size) {
                frame.insert(key, text);
            }
        }

        let mut stats = RenderStats::default();
        for ((y, x), text) in frame {
            let pos = Position::new(i32::from(x), i32::from(y));
            if !full_redraw && last.get(&pos).is_some_and(|shown| shown == text) {
                stats.cells_skipped += 1;
                continue;
            }
            self.writer.render_cell(&mut self.output, x, y, text);
            stats.cells_rendered += 1;
        }
        self.writer.finish(&mut self.output);

        stats.bytes_written = self.output.len();
        stats
    }

    /// Generate output that blanks every position in `shown`.
    pub fn render_blanks(&mut self, shown: &PixelBuffer, size: Size) -> RenderStats {
        let blanks: PixelBuffer = shown
            .keys()
            .map(|pos| (*pos, BLANK.to_string()))
            .collect();
        self.render(&blanks, &PixelBuffer::new(), size, true)
    }

    /// The bytes generated by the last render.
    #[must_use]
    pub fn output_bytes(&self) -> &[u8] {
        self.output.as_bytes()
    }

    /// Send the generated bytes to `io` and clear the buffer.
    ///
    /// # Errors
    ///
    /// Returns the adapter's write error.
    pub fn flush_to(&mut self, io: &mut impl TerminalIo) -> io::Result<()> {
        if !self.output.is_empty() {
            io.write(self.output.as_bytes())?;
            self.output.clear();
        }
        Ok(())
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

/// `(row, col)` key for an on-screen position, `None` when off screen.
fn row_major(pos: Position, size: Size) -> Option<(u16, u16)> {
    if !size.contains(pos) {
        return None;
    }
    Some((u16::try_from(pos.y).ok()?, u16::try_from(pos.x).ok()?))
}

/// A blank cell at every position of `size`.
#[must_use]
pub fn blank_frame(size: Size) -> PixelBuffer {
    let mut frame = PixelBuffer::with_capacity(usize::try_from(size.area()).unwrap_or(0));
    for y in 0..i32::from(size.rows) {
        for x in 0..i32::from(size.cols) {
            frame.insert(Position::new(x, y), BLANK.to_string());
        }
    }
    frame
}

/// Move every cell of `pixels` by `(dx, dy)`.
#[must_use]
pub fn shift_pixels(pixels: &PixelBuffer, dx: i32, dy: i32) -> PixelBuffer {
    pixels
        .iter()
        .map(|(pos, text)| (pos.offset(dx, dy), text.clone()))
        .collect()
}

// ─── Tests ───────────────────────────────────────────────────────────────────
