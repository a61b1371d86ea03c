// SPDX-License-Identifier: MIT
//
// tk-style: colors and escape-aware text for termkit.
//
// Pure data, no terminal access. `Color` accepts CSS3 names, hex, rgb(),
// hsl() and cmyk() notations and derives every other representation up
// front, including the nearest xterm-256 index and the matching SGR
// escapes. `FormatStr` measures, splits, pads and wraps text that already
// contains those escapes, counting only what ends up on screen.

pub mod color;
pub mod convert;
pub mod error;
pub mod format;
pub mod names;

pub use color::{Color, RESET, color_scale};
pub use error::{Result, StyleError};
pub use format::{Align, FormatStr};
