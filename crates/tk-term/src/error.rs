// SPDX-License-Identifier: MIT
//
// Terminal session errors.
//
// Only adapter I/O can fail. Malformed input never reaches this type; it
// becomes `Event::Unknown` instead.

use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TermError {
    /// Reading from or writing to the terminal failed.
    #[error("terminal I/O error: {0}")]
    Io(#[from] io::Error),

    /// Another session already holds the real terminal.
    #[error("a terminal session is already active in this process")]
    SessionActive,

    /// Putting the terminal back (cooked mode, main screen, cursor) failed.
    #[error("failed to restore terminal state: {0}")]
    TerminalStateRestore(#[source] io::Error),
}

pub type Result<T> = std::result::Result<T, TermError>;
