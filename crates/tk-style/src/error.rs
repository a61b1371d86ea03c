// SPDX-License-Identifier: MIT
//
// Errors raised by color parsing and escape-aware string layout.
//
// All of these are caller mistakes (a bad color literal, a fill string that
// is not one cell wide). None of them are retried internally.

use thiserror::Error;

/// Errors from the color engine and the [`FormatStr`](crate::format::FormatStr) layout helpers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StyleError {
    /// The input matched none of the accepted color notations.
    #[error("unable to convert color for value: {0:?}")]
    InvalidColorFormat(String),

    /// Content is wider than the width a strict layout call was given.
    #[error("content is {len} cells wide but the width is {width}")]
    InvalidWidth { len: usize, width: usize },

    /// A fill string whose visible length is not exactly one cell.
    #[error("fill must be exactly one visible cell, got {0:?}")]
    InvalidFillChar(String),

    /// An alignment name other than `left`, `right` or `center`.
    #[error("invalid alignment {0:?}, expected left, right or center")]
    InvalidAlign(String),
}

pub type Result<T> = std::result::Result<T, StyleError>;
