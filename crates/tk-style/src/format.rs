// SPDX-License-Identifier: MIT
//
// Escape-aware strings.
//
// `FormatStr` wraps text that may carry SGR escape sequences
// (`ESC [ params m`). Escapes occupy zero cells, so every width
// computation here runs on the visible projection of the string, never on
// its byte length.
//
// Binding rule: a run of escapes belongs to the visible character that
// follows it. Escapes at the very end of the string belong to the last
// character. A lone ESC that does not start a complete SGR sequence is an
// ordinary visible character.
//
// Two per-character views exist:
//
//   chars(): raw slices, each one character plus its own escape run.
//             Concatenating them reproduces the input exactly.
//   cells(): owned strings carrying the full active style (every escape
//             since the last reset), so each cell can be drawn on its own.

use std::fmt;
use std::ops::Add;
use std::str::FromStr;

use crate::color::{Color, RESET};
use crate::error::{Result, StyleError};

// ─── Escape Scanning ─────────────────────────────────────────────────────────

/// Byte length of the SGR sequence at the start of `s`, if one starts there.
fn sgr_len(s: &str) -> Option<usize> {
    let b = s.as_bytes();
    if b.len() < 3 || b[0] != 0x1b || b[1] != b'[' {
        return None;
    }
    let params = b[2..]
        .iter()
        .take_while(|c| c.is_ascii_digit() || **c == b';')
        .count();
    (b.get(2 + params) == Some(&b'm')).then_some(3 + params)
}

/// Skip a run of SGR sequences starting at byte `pos`; returns where it ends.
fn skip_escapes(raw: &str, mut pos: usize) -> usize {
    while let Some(n) = sgr_len(&raw[pos..]) {
        pos += n;
    }
    pos
}

/// Whether an SGR sequence begins with a full reset (`ESC[m`, `ESC[0m`, `ESC[0;...m`).
fn starts_with_reset(seq: &str) -> bool {
    let params = &seq[2..seq.len() - 1];
    params.is_empty() || params == "0" || params.starts_with("0;")
}

/// Number of visible cells in `s`.
#[must_use]
pub fn visible_len(s: &str) -> usize {
    Glyphs::new(s).count()
}

/// Split `s` into its leading run of SGR escapes and the rest.
#[must_use]
pub fn split_style(s: &str) -> (&str, &str) {
    s.split_at(skip_escapes(s, 0))
}

/// One visible character and the byte span of its leading escape run.
#[derive(Debug, Clone, Copy)]
struct Glyph {
    /// Start of the escape run preceding the character.
    start: usize,
    /// Start of the character itself.
    ch_start: usize,
    /// End of the character.
    end: usize,
    ch: char,
}

#[derive(Debug, Clone)]
struct Glyphs<'a> {
    raw: &'a str,
    pos: usize,
}

impl<'a> Glyphs<'a> {
    const fn new(raw: &'a str) -> Self {
        Self { raw, pos: 0 }
    }
}

impl Iterator for Glyphs<'_> {
    type Item = Glyph;

    fn next(&mut self) -> Option<Glyph> {
        let start = self.pos;
        let ch_start = skip_escapes(self.raw, start);
        let ch = self.raw[ch_start..].chars().next()?;
        let end = ch_start + ch.len_utf8();
        self.pos = end;
        Some(Glyph {
            start,
            ch_start,
            end,
            ch,
        })
    }
}

// ─── Align ───────────────────────────────────────────────────────────────────

/// Where content sits inside a justified field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Right,
    /// Centered; an odd leftover cell goes on the right.
    Center,
}

impl FromStr for Align {
    type Err = StyleError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "center" => Ok(Self::Center),
            _ => Err(StyleError::InvalidAlign(s.to_string())),
        }
    }
}

// ─── FormatStr ───────────────────────────────────────────────────────────────

/// An immutable string whose length ignores embedded SGR escapes.
///
/// # Examples
///
/// ```
/// use tk_style::format::{Align, FormatStr};
///
/// let s = FormatStr::from("\x1b[31mAB\x1b[0m");
/// assert_eq!(s.len(), 2);
///
/// let padded = FormatStr::from("ab").justify(5, Align::Left, " ")?;
/// assert_eq!(padded, "ab   ");
/// # Ok::<(), tk_style::StyleError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FormatStr {
    raw: String,
}

impl FormatStr {
    /// Wrap raw text (escapes included) without any processing.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// Color `text` and append a reset.
    ///
    /// With neither color given the text is returned as is.
    #[must_use]
    pub fn styled(text: &str, fg: Option<&Color>, bg: Option<&Color>) -> Self {
        if fg.is_none() && bg.is_none() {
            return Self::new(text);
        }
        let mut raw = String::with_capacity(text.len() + 32);
        if let Some(fg) = fg {
            raw.push_str(fg.fg());
        }
        if let Some(bg) = bg {
            raw.push_str(bg.bg());
        }
        raw.push_str(text);
        raw.push_str(RESET);
        Self { raw }
    }

    /// The raw text, escapes included.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Consume into the raw text.
    #[inline]
    #[must_use]
    pub fn into_string(self) -> String {
        self.raw
    }

    /// Number of visible cells. Whitespace counts; escapes do not.
    #[must_use]
    pub fn len(&self) -> usize {
        visible_len(&self.raw)
    }

    /// Whether there are no visible cells (the string may still hold escapes).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        Glyphs::new(&self.raw).next().is_none()
    }

    /// The text with every escape sequence removed.
    #[must_use]
    pub fn without_escapes(&self) -> String {
        Glyphs::new(&self.raw).map(|g| g.ch).collect()
    }

    /// Substring test on the visible text of both sides.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        let needle = FormatStr::new(needle).without_escapes();
        self.without_escapes().contains(&needle)
    }

    /// Raw concatenation. No separator is inserted.
    #[must_use]
    pub fn concat(&self, other: &Self) -> Self {
        let mut raw = String::with_capacity(self.raw.len() + other.raw.len());
        raw.push_str(&self.raw);
        raw.push_str(&other.raw);
        Self { raw }
    }

    // ─── Iteration ───────────────────────────────────────────────────────

    /// Each visible character with its preceding escape run.
    pub fn chars(&self) -> Chars<'_> {
        Chars {
            glyphs: Glyphs::new(&self.raw),
        }
    }

    /// Each visible character prefixed with the full active style.
    pub fn cells(&self) -> Cells<'_> {
        Cells {
            glyphs: Glyphs::new(&self.raw),
            style: String::new(),
        }
    }

    /// Whitespace-separated tokens; each `\n` is its own `"\n"` token.
    ///
    /// Escapes inside or touching a word travel with it. The iterator is
    /// `Clone`, and every call starts from the beginning.
    pub fn words(&self) -> Words<'_> {
        Words {
            raw: &self.raw,
            pos: 0,
        }
    }

    // ─── Layout ──────────────────────────────────────────────────────────

    /// Pad to at least `width` cells with `fill`.
    ///
    /// Content wider than `width` is returned unchanged; nothing is cut.
    ///
    /// # Errors
    ///
    /// Returns [`StyleError::InvalidFillChar`] unless `fill` is exactly one
    /// visible cell wide.
    pub fn justify(&self, width: usize, align: Align, fill: &str) -> Result<Self> {
        if visible_len(fill) != 1 {
            return Err(StyleError::InvalidFillChar(fill.to_string()));
        }

        let pad = width.saturating_sub(self.len());
        let (left, right) = match align {
            Align::Left => (0, pad),
            Align::Right => (pad, 0),
            Align::Center => (pad / 2, pad - pad / 2),
        };

        let mut raw = String::with_capacity(self.raw.len() + pad * fill.len());
        raw.push_str(&fill.repeat(left));
        raw.push_str(&self.raw);
        raw.push_str(&fill.repeat(right));
        Ok(Self { raw })
    }

    /// Like [`justify`](Self::justify) but refuses content wider than `width`.
    ///
    /// # Errors
    ///
    /// [`StyleError::InvalidWidth`] when the content does not fit, or
    /// [`StyleError::InvalidFillChar`] for a bad fill.
    pub fn justify_exact(&self, width: usize, align: Align, fill: &str) -> Result<Self> {
        let len = self.len();
        if len > width {
            return Err(StyleError::InvalidWidth { len, width });
        }
        self.justify(width, align, fill)
    }

    /// Greedily pack words into lines of at most `width` cells.
    ///
    /// Words are joined by single spaces. A word wider than `width` gets a
    /// line of its own and is not split. `\n` ends the current line, so
    /// blank lines survive. Empty input gives one empty line.
    #[must_use]
    pub fn wrap(&self, width: usize) -> Vec<Self> {
        let mut lines = Vec::new();
        let mut line = String::new();
        let mut line_len = 0;

        for token in self.words() {
            if token == "\n" {
                lines.push(Self::new(std::mem::take(&mut line)));
                line_len = 0;
                continue;
            }

            let token_len = visible_len(token);
            if token_len == 0 {
                // Escape-only token: keep it attached, it takes no room.
                line.push_str(token);
                continue;
            }

            if line_len > 0 && line_len + 1 + token_len > width {
                lines.push(Self::new(std::mem::take(&mut line)));
                line_len = 0;
            }
            if line_len > 0 {
                line.push(' ');
                line_len += 1;
            }
            line.push_str(token);
            line_len += token_len;
        }

        if !line.is_empty() || lines.is_empty() {
            lines.push(Self::new(line));
        }
        lines
    }
}

// ─── Iterators ───────────────────────────────────────────────────────────────

/// Iterator returned by [`FormatStr::chars`].
#[derive(Debug, Clone)]
pub struct Chars<'a> {
    glyphs: Glyphs<'a>,
}

impl<'a> Iterator for Chars<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let glyph = self.glyphs.next()?;
        let raw = self.glyphs.raw;
        let mut end = glyph.end;

        // Escapes after the final character bind to it.
        let tail = skip_escapes(raw, end);
        if tail > end && tail == raw.len() {
            end = tail;
            self.glyphs.pos = tail;
        }
        Some(&raw[glyph.start..end])
    }
}

/// Iterator returned by [`FormatStr::cells`].
#[derive(Debug, Clone)]
pub struct Cells<'a> {
    glyphs: Glyphs<'a>,
    style: String,
}

impl Iterator for Cells<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let glyph = self.glyphs.next()?;
        let raw = self.glyphs.raw;

        let mut pos = glyph.start;
        while pos < glyph.ch_start {
            let Some(n) = sgr_len(&raw[pos..]) else { break };
            let seq = &raw[pos..pos + n];
            if starts_with_reset(seq) {
                self.style.clear();
                if seq.len() > "\x1b[0m".len() {
                    self.style.push_str(seq);
                }
            } else {
                self.style.push_str(seq);
            }
            pos += n;
        }

        let mut cell = String::with_capacity(self.style.len() + glyph.ch.len_utf8());
        cell.push_str(&self.style);
        cell.push(glyph.ch);
        Some(cell)
    }
}

/// Iterator returned by [`FormatStr::words`].
#[derive(Debug, Clone)]
pub struct Words<'a> {
    raw: &'a str,
    pos: usize,
}

impl<'a> Iterator for Words<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let rest = &self.raw[self.pos..];
        let skipped = rest
            .char_indices()
            .find(|&(_, c)| c == '\n' || !c.is_whitespace())
            .map_or(rest.len(), |(i, _)| i);
        self.pos += skipped;

        let rest = &self.raw[self.pos..];
        if rest.is_empty() {
            return None;
        }
        if rest.starts_with('\n') {
            self.pos += 1;
            return Some(&rest[..1]);
        }

        let len = rest
            .char_indices()
            .find(|&(_, c)| c.is_whitespace())
            .map_or(rest.len(), |(i, _)| i);
        self.pos += len;
        Some(&rest[..len])
    }
}

// ─── Conversions ─────────────────────────────────────────────────────────────

impl From<&str> for FormatStr {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for FormatStr {
    fn from(raw: String) -> Self {
        Self { raw }
    }
}

impl From<&String> for FormatStr {
    fn from(s: &String) -> Self {
        Self::new(s.as_str())
    }
}

impl AsRef<str> for FormatStr {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for FormatStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq<str> for FormatStr {
    fn eq(&self, other: &str) -> bool {
        self.raw == other
    }
}

impl PartialEq<&str> for FormatStr {
    fn eq(&self, other: &&str) -> bool {
        self.raw == *other
    }
}

impl Add<&FormatStr> for FormatStr {
    type Output = Self;

    fn add(mut self, rhs: &FormatStr) -> Self {
        self.raw.push_str(&rhs.raw);
        self
    }
}

impl Add<&str> for FormatStr {
    type Output = Self;

    fn add(mut self, rhs: &str) -> Self {
        self.raw.push_str(rhs);
        self
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
