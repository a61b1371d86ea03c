// SPDX-License-Identifier: MIT
//
// Input event parser.
//
// Turns one raw terminal read into one typed `Event`. A read is whatever a
// single `read()` returned: a keypress, an escape sequence, or a burst of
// mouse reports the terminal coalesced. Recognition is ordered and the first
// match wins:
//
//   1. SGR mouse reports  ESC [ < btn ; col ; row (M|m)
//   2. exact matches in the modifier-key table
//   3. a single char with no ESC
//   4. anything else becomes `Event::Unknown`, never an error
//
// Mouse reports match at the start of the read and ignore what follows, so
// a coalesced burst of scroll reports still parses; its ESC count becomes
// the scroll amount.
//
// The last mouse position lives in an explicit `MouseState` owned by the
// caller (the screen session), so drag events can report where they
// started.

use tracing::trace;

// ─── Position ───────────────────────────────────────────────────────────────

/// A zero-indexed cell coordinate. Negative values are never rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    /// Marks a mouse position that has not been reported yet.
    pub const UNKNOWN: Self = Self { x: -1, y: -1 };

    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Shift by `(dx, dy)`, saturating at the `i32` bounds.
    #[inline]
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }
}

impl From<(i32, i32)> for Position {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

// ─── Modifier Keys ──────────────────────────────────────────────────────────

/// Named keys recognised by exact byte sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModifierKey {
    Enter,
    Esc,
    Tab,
    ReverseTab,
    Backspace,
    Delete,
    Insert,
    Up,
    Down,
    Right,
    Left,
    Home,
    End,
    PageUp,
    PageDown,
    OptionLeft,
    OptionRight,
    CtrlA,
    CtrlB,
    CtrlC,
    CtrlD,
    CtrlE,
    CtrlF,
    CtrlG,
    CtrlH,
    CtrlK,
    CtrlL,
    CtrlN,
    CtrlP,
    CtrlR,
    CtrlT,
    CtrlU,
    CtrlV,
    CtrlW,
    CtrlX,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
}

/// Exact input sequences for every [`ModifierKey`].
///
/// Some keys have more than one encoding (Enter arrives as `\n` or `\r`
/// depending on the terminal's input mode).
#[rustfmt::skip]
pub const MODIFIER_KEYS: &[(&str, ModifierKey)] = &[
    ("\n", ModifierKey::Enter),         ("\r", ModifierKey::Enter),
    ("\x1b", ModifierKey::Esc),         ("\t", ModifierKey::Tab),
    ("\x1b[Z", ModifierKey::ReverseTab),
    ("\x7f", ModifierKey::Backspace),   ("\x1b[3~", ModifierKey::Delete),
    ("\x1b[2~", ModifierKey::Insert),
    ("\x1b[A", ModifierKey::Up),        ("\x1b[B", ModifierKey::Down),
    ("\x1b[C", ModifierKey::Right),     ("\x1b[D", ModifierKey::Left),
    ("\x1b[H", ModifierKey::Home),      ("\x1b[1~", ModifierKey::Home),
    ("\x1b[F", ModifierKey::End),       ("\x1b[4~", ModifierKey::End),
    ("\x1b[5~", ModifierKey::PageUp),   ("\x1b[6~", ModifierKey::PageDown),
    ("\x1bb", ModifierKey::OptionLeft), ("\x1bf", ModifierKey::OptionRight),
    ("\x01", ModifierKey::CtrlA),       ("\x02", ModifierKey::CtrlB),
    ("\x03", ModifierKey::CtrlC),       ("\x04", ModifierKey::CtrlD),
    ("\x05", ModifierKey::CtrlE),       ("\x06", ModifierKey::CtrlF),
    ("\x07", ModifierKey::CtrlG),       ("\x08", ModifierKey::CtrlH),
    ("\x0b", ModifierKey::CtrlK),       ("\x0c", ModifierKey::CtrlL),
    ("\x0e", ModifierKey::CtrlN),       ("\x10", ModifierKey::CtrlP),
    ("\x12", ModifierKey::CtrlR),       ("\x14", ModifierKey::CtrlT),
    ("\x15", ModifierKey::CtrlU),       ("\x16", ModifierKey::CtrlV),
    ("\x17", ModifierKey::CtrlW),       ("\x18", ModifierKey::CtrlX),
    ("\x1bOP", ModifierKey::F1),        ("\x1bOQ", ModifierKey::F2),
    ("\x1bOR", ModifierKey::F3),        ("\x1bOS", ModifierKey::F4),
    ("\x1b[15~", ModifierKey::F5),      ("\x1b[17~", ModifierKey::F6),
    ("\x1b[18~", ModifierKey::F7),      ("\x1b[19~", ModifierKey::F8),
    ("\x1b[20~", ModifierKey::F9),      ("\x1b[21~", ModifierKey::F10),
    ("\x1b[23~", ModifierKey::F11),     ("\x1b[24~", ModifierKey::F12),
];

impl ModifierKey {
    /// Look up an exact input sequence.
    #[must_use]
    pub fn from_sequence(raw: &str) -> Option<Self> {
        MODIFIER_KEYS
            .iter()
            .find(|(seq, _)| *seq == raw)
            .map(|(_, key)| *key)
    }
}

// ─── Events ─────────────────────────────────────────────────────────────────

/// A parsed terminal input event.
///
/// Every variant produced from input keeps the raw read it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A single printable (or otherwise unnamed) character.
    KeyPressed { ch: char, raw: String },
    ModifierKey { key: ModifierKey, raw: String },
    MouseMove { x: i32, y: i32, raw: String },
    /// Left button press or release.
    MouseClick { x: i32, y: i32, raw: String },
    MouseRightClick { x: i32, y: i32, raw: String },
    /// Left-button drag; `from` is the previously reported mouse position.
    MouseDrag {
        x: i32,
        y: i32,
        from_x: i32,
        from_y: i32,
        raw: String,
    },
    MouseRightDrag {
        x: i32,
        y: i32,
        from_x: i32,
        from_y: i32,
        raw: String,
    },
    /// `times` is the number of coalesced scroll reports in the read.
    ScrollUp {
        x: i32,
        y: i32,
        times: usize,
        raw: String,
    },
    ScrollDown {
        x: i32,
        y: i32,
        times: usize,
        raw: String,
    },
    /// No input arrived within the requested timeout.
    Timeout,
    /// The session was interrupted or its input ended.
    ScreenClosed,
    Unknown { raw: String },
}

impl Event {
    /// The raw input this event was parsed from.
    #[must_use]
    pub fn raw(&self) -> Option<&str> {
        match self {
            Self::KeyPressed { raw, .. }
            | Self::ModifierKey { raw, .. }
            | Self::MouseMove { raw, .. }
            | Self::MouseClick { raw, .. }
            | Self::MouseRightClick { raw, .. }
            | Self::MouseDrag { raw, .. }
            | Self::MouseRightDrag { raw, .. }
            | Self::ScrollUp { raw, .. }
            | Self::ScrollDown { raw, .. }
            | Self::Unknown { raw } => Some(raw),
            Self::Timeout | Self::ScreenClosed => None,
        }
    }

    /// Cell position for mouse events.
    #[must_use]
    pub const fn position(&self) -> Option<Position> {
        match self {
            Self::MouseMove { x, y, .. }
            | Self::MouseClick { x, y, .. }
            | Self::MouseRightClick { x, y, .. }
            | Self::MouseDrag { x, y, .. }
            | Self::MouseRightDrag { x, y, .. }
            | Self::ScrollUp { x, y, .. }
            | Self::ScrollDown { x, y, .. } => Some(Position { x: *x, y: *y }),
            _ => None,
        }
    }
}

// ─── Mouse State ────────────────────────────────────────────────────────────

/// The last mouse position seen by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseState {
    position: Position,
}

impl MouseState {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            position: Position::UNKNOWN,
        }
    }

    #[inline]
    #[must_use]
    pub const fn position(&self) -> Position {
        self.position
    }

    /// Forget the last position. Called at every session start.
    pub const fn reset(&mut self) {
        self.position = Position::UNKNOWN;
    }

    /// Store `pos` and return the previous position.
    const fn update(&mut self, pos: Position) -> Position {
        let from = self.position;
        self.position = pos;
        from
    }
}

impl Default for MouseState {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Parser ─────────────────────────────────────────────────────────────────

/// Parse one raw read into an event, updating `mouse` for mouse reports.
pub fn parse_event(raw: &str, mouse: &mut MouseState) -> Event {
    if let Some(event) = parse_mouse(raw, mouse) {
        return event;
    }

    if let Some(key) = ModifierKey::from_sequence(raw) {
        return Event::ModifierKey {
            key,
            raw: raw.to_string(),
        };
    }

    let mut chars = raw.chars();
    if let (Some(ch), None) = (chars.next(), chars.next()) {
        if ch != '\x1b' {
            return Event::KeyPressed {
                ch,
                raw: raw.to_string(),
            };
        }
    }

    trace!(raw = ?raw, "unrecognised input");
    Event::Unknown {
        raw: raw.to_string(),
    }
}

/// Parse raw bytes, replacing invalid UTF-8 with U+FFFD.
///
/// `bytes` must be a complete read. For a stream of reads, where a
/// multi-byte char may arrive in two pieces, decode through [`Utf8Decoder`].
pub fn parse_bytes(bytes: &[u8], mouse: &mut MouseState) -> Event {
    parse_event(&String::from_utf8_lossy(bytes), mouse)
}

/// Split a read into the units `parse_event` expects.
///
/// Plain typed text that arrived in one chunk becomes one unit per char.
/// Anything containing ESC stays whole: splitting would tear sequences.
#[must_use]
pub fn split_reads(chunk: &str) -> Vec<&str> {
    if chunk.contains('\x1b') {
        return vec![chunk];
    }
    chunk
        .char_indices()
        .map(|(i, ch)| &chunk[i..i + ch.len_utf8()])
        .collect()
}

/// A decoded SGR mouse report: button code, 1-indexed column and row, and
/// whether it was a press/motion (`M`) or a release (`m`).
struct SgrMouse {
    code: u16,
    col: u16,
    row: u16,
    release: bool,
}

fn parse_mouse(raw: &str, mouse: &mut MouseState) -> Option<Event> {
    let report = parse_sgr_mouse(raw.as_bytes())?;
    let pos = Position::new(
        i32::from(report.col) - 1,
        i32::from(report.row) - 1,
    );
    let (x, y) = (pos.x, pos.y);
    let raw_owned = || raw.to_string();

    let event = match (report.code, report.release) {
        (35, false) => Event::MouseMove { x, y, raw: raw_owned() },
        (0, _) => Event::MouseClick { x, y, raw: raw_owned() },
        (2, false) => Event::MouseRightClick { x, y, raw: raw_owned() },
        (32, false) => {
            let from = mouse.position();
            Event::MouseDrag {
                x,
                y,
                from_x: from.x,
                from_y: from.y,
                raw: raw_owned(),
            }
        }
        (34, false) => {
            let from = mouse.position();
            Event::MouseRightDrag {
                x,
                y,
                from_x: from.x,
                from_y: from.y,
                raw: raw_owned(),
            }
        }
        (65, false) => Event::ScrollUp {
            x,
            y,
            times: raw.matches('\x1b').count(),
            raw: raw_owned(),
        },
        (64, false) => Event::ScrollDown {
            x,
            y,
            times: raw.matches('\x1b').count(),
            raw: raw_owned(),
        },
        _ => return None,
    };

    mouse.update(pos);
    Some(event)
}

/// Decode `ESC [ < code ; col ; row (M|m)` at the start of `buf`.
fn parse_sgr_mouse(buf: &[u8]) -> Option<SgrMouse> {
    let rest = buf.strip_prefix(b"\x1b[<")?;
    let (code, rest) = parse_number(rest)?;
    let rest = rest.strip_prefix(b";")?;
    let (col, rest) = parse_number(rest)?;
    let rest = rest.strip_prefix(b";")?;
    let (row, rest) = parse_number(rest)?;
    let release = match rest.first()? {
        b'M' => false,
        b'm' => true,
        _ => return None,
    };
    Some(SgrMouse {
        code,
        col,
        row,
        release,
    })
}

/// Find a cursor position report `ESC [ row ; col R` anywhere in `buf`.
///
/// Returns the zero-indexed position. Bytes around the report (input typed
/// while the reply was in flight) are ignored.
#[must_use]
pub fn parse_cursor_report(buf: &[u8]) -> Option<Position> {
    (0..buf.len())
        .filter(|&i| buf[i..].starts_with(b"\x1b["))
        .find_map(|i| {
            let (row, rest) = parse_number(&buf[i + 2..])?;
            let rest = rest.strip_prefix(b";")?;
            let (col, rest) = parse_number(rest)?;
            (rest.first() == Some(&b'R'))
                .then_some(Position::new(i32::from(col) - 1, i32::from(row) - 1))
        })
}

/// Parse a u16 from the start of a byte slice; `None` if there are no digits.
/// Returns `(value, remaining_bytes)`.
fn parse_number(buf: &[u8]) -> Option<(u16, &[u8])> {
    let digits = buf.iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let val = buf[..digits].iter().fold(0u16, |acc, b| {
        acc.saturating_mul(10).saturating_add(u16::from(b - b'0'))
    });
    Some((val, &buf[digits..]))
}

// ─── Stream Decoding ────────────────────────────────────────────────────────

/// Decodes a stream of raw reads into text.
///
/// A read can end in the middle of a multi-byte char; those trailing bytes
/// are held back and completed by the next read. Bytes that can never form
/// a valid char become U+FFFD.
#[derive(Debug, Clone, Default)]
pub struct Utf8Decoder {
    /// Start of an incomplete char (at most three bytes).
    tail: Vec<u8>,
}

impl Utf8Decoder {
    #[must_use]
    pub const fn new() -> Self {
        Self { tail: Vec::new() }
    }

    /// Decode `chunk`, prefixed by whatever the previous chunk held back.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.tail.extend_from_slice(chunk);
        let mut out = String::with_capacity(self.tail.len());
        let mut start = 0;
        let mut consumed = self.tail.len();

        loop {
            match std::str::from_utf8(&self.tail[start..]) {
                Ok(text) => {
                    out.push_str(text);
                    break;
                }
                Err(e) => {
                    let valid_end = start + e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.tail[start..valid_end]));
                    match e.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            start = valid_end + bad;
                        }
                        // Incomplete char at the end: wait for more bytes.
                        None => {
                            consumed = valid_end;
                            break;
                        }
                    }
                }
            }
        }

        self.tail.drain(..consumed);
        out
    }

    /// Whether bytes of an unfinished char are held back.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.tail.is_empty()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
