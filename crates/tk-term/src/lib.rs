// SPDX-License-Identifier: MIT
//
// tk-term: terminal plumbing for termkit.
//
// Everything between the application and the tty: raw mode and the
// alternate screen, a background stdin reader, the parser that turns raw
// keyboard and SGR mouse sequences into typed events, and a screen buffer
// that diffs each frame against the previous one so only changed cells are
// written.
//
// The terminal itself sits behind the `TerminalIo` trait. `Terminal` drives
// a real tty through termios and ioctl; `MemoryTerminal` replays scripted
// input and captures output, which is how the screen and renderer are
// tested without a tty.

pub mod ansi;
pub mod error;
pub mod event;
pub mod io;
pub mod memory;
pub mod output;
pub mod reader;
pub mod render;
pub mod screen;
pub mod terminal;

pub use error::{Result, TermError};
pub use event::{Event, ModifierKey, MouseState, Position, Utf8Decoder};
pub use io::TerminalIo;
pub use memory::MemoryTerminal;
pub use screen::{Modes, Screen, ScreenConfig};
pub use terminal::{Size, Terminal};
