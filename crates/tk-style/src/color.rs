// SPDX-License-Identifier: MIT
//
// Color engine: parsing, xterm-256 quantization, and shade walking.
//
// A `Color` is built once from an RGB triple and caches every derived form
// at construction: HSL, CMYK, hex, CSS3 name, xterm-256 index, and the
// foreground/background SGR escapes. Nothing mutates afterwards. Every
// transform (lighten, mix, scale) does its arithmetic on the numeric
// components and builds a new `Color`.
//
// Accepted notations for `Color::parse` (case-insensitive, surrounding
// whitespace ignored):
//
//   rgb(255, 0, 0)    hsl(120°, 100%, 50%)    cmyk(0%, 100%, 100%, 0%)
//   #ff0000  #f00     red
//
// Terminal output is always the 256-color palette (`ESC[38;5;Nm` /
// `ESC[48;5;Nm`), which is why shade walking compares xterm indices: many
// RGB values collapse onto one palette entry, and the next visible shade
// is the first one that lands on a different entry.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::convert::{self, Cmyk, Hsl};
use crate::error::{Result, StyleError};
use crate::names;

/// SGR reset: returns the terminal to its default colors.
pub const RESET: &str = "\x1b[0m";

/// Name reported for colors without a CSS3 keyword.
pub const UNDEFINED_NAME: &str = "not defined";

/// Lightness change per step when walking shades.
const LIGHTNESS_STEP: f64 = 0.1;

/// Upper bound on lightness steps for one `lighten`/`darken` call.
///
/// Each step moves lightness by at least 0.09 after rounding, so a walk
/// reaches white or black in 12 steps at most.
const MAX_SHADE_STEPS: usize = 32;

/// Upper bound on shades collected by [`Color::shades`] in each direction.
const MAX_SHADES: usize = 64;

// ─── Patterns ────────────────────────────────────────────────────────────────

static RGB_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^rgb\s?\((\d{1,3}),\s?(\d{1,3}),\s?(\d{1,3})\)$").expect("rgb pattern is valid")
});

static HSL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^hsl\s?\((\d{1,3})°?,\s?(\d{1,3})%?,\s?(\d{1,3})%?\)$")
        .expect("hsl pattern is valid")
});

static HEX_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#([0-9a-f]{6}|[0-9a-f]{3})$").expect("hex pattern is valid")
});

static CMYK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^cmyk\s?\((\d{1,3})%?,\s?(\d{1,3})%?,\s?(\d{1,3})%?,\s?(\d{1,3})%?\)$")
        .expect("cmyk pattern is valid")
});

// ─── Color ───────────────────────────────────────────────────────────────────

/// An immutable terminal color.
///
/// RGB is canonical; everything else is derived and cached when the value
/// is built. Two colors are equal when their RGB triples are equal.
///
/// # Examples
///
/// ```
/// use tk_style::color::{Color, RESET};
///
/// let red = Color::parse("red")?;
/// assert_eq!(red, Color::parse("#ff0000")?);
/// assert_eq!(red.xterm(), 196);
///
/// let line = format!("{}alert{RESET}", red.fg());
/// assert!(line.starts_with("\x1b[38;5;196m"));
/// # Ok::<(), tk_style::StyleError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Color {
    rgb: (u8, u8, u8),
    hsl: Hsl,
    cmyk: Cmyk,
    hex: String,
    name: Option<&'static str>,
    xterm: u8,
    fg: String,
    bg: String,
}

impl Color {
    // ─── Constructors ────────────────────────────────────────────────────

    /// Build a color from 8-bit channels.
    #[must_use]
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        let xterm = convert::rgb_to_xterm256(r, g, b);
        Self {
            rgb: (r, g, b),
            hsl: convert::rgb_to_hsl(r, g, b),
            cmyk: convert::rgb_to_cmyk(r, g, b),
            hex: format!("#{r:02x}{g:02x}{b:02x}"),
            name: names::rgb_to_name(r, g, b),
            xterm,
            fg: format!("\x1b[38;5;{xterm}m"),
            bg: format!("\x1b[48;5;{xterm}m"),
        }
    }

    /// Build a color from hue (degrees) and saturation/lightness (percent).
    #[must_use]
    pub fn hsl(hue: f64, saturation: f64, lightness: f64) -> Self {
        Self::from_hsl(Hsl {
            h: hue,
            s: saturation / 100.0,
            l: lightness / 100.0,
        })
    }

    /// Build a color from HSL components (`s` and `l` in `[0, 1]`).
    #[must_use]
    pub fn from_hsl(hsl: Hsl) -> Self {
        let (r, g, b) = convert::hsl_to_rgb(hsl);
        Self::rgb(r, g, b)
    }

    /// Build a color from CMYK percentages.
    #[must_use]
    pub fn cmyk(cyan: f64, magenta: f64, yellow: f64, key: f64) -> Self {
        let (r, g, b) = convert::cmyk_to_rgb(Cmyk {
            c: cyan,
            m: magenta,
            y: yellow,
            k: key,
        });
        Self::rgb(r, g, b)
    }

    /// Build a color from `#rrggbb` or `#rgb` (the `#` is optional).
    ///
    /// # Errors
    ///
    /// Returns [`StyleError::InvalidColorFormat`] for anything else.
    pub fn hex(s: &str) -> Result<Self> {
        let digits = s.trim().trim_start_matches('#');
        parse_hex(digits)
            .map(|(r, g, b)| Self::rgb(r, g, b))
            .ok_or_else(|| StyleError::InvalidColorFormat(s.to_string()))
    }

    /// Parse any of the supported color notations.
    ///
    /// Tried in order: `rgb(...)`, `hsl(...)`, `#hex`, `cmyk(...)`, then a
    /// CSS3 color name. Input is trimmed and lowercased first.
    ///
    /// # Errors
    ///
    /// Returns [`StyleError::InvalidColorFormat`] if no notation matches or
    /// a component is out of range (channels above 255, percentages above
    /// 100).
    pub fn parse(input: &str) -> Result<Self> {
        let value = input.trim().to_lowercase();
        let invalid = || StyleError::InvalidColorFormat(input.to_string());

        if let Some(caps) = RGB_PATTERN.captures(&value) {
            let [r, g, b] = numbers::<3>(&caps).ok_or_else(invalid)?;
            let channel = |v: u16| u8::try_from(v).map_err(|_| invalid());
            return Ok(Self::rgb(channel(r)?, channel(g)?, channel(b)?));
        }

        if let Some(caps) = HSL_PATTERN.captures(&value) {
            let [h, s, l] = numbers::<3>(&caps).ok_or_else(invalid)?;
            if s > 100 || l > 100 {
                return Err(invalid());
            }
            return Ok(Self::hsl(f64::from(h), f64::from(s), f64::from(l)));
        }

        if let Some(caps) = HEX_PATTERN.captures(&value) {
            let (r, g, b) = parse_hex(&caps[1]).ok_or_else(invalid)?;
            return Ok(Self::rgb(r, g, b));
        }

        if let Some(caps) = CMYK_PATTERN.captures(&value) {
            let [c, m, y, k] = numbers::<4>(&caps).ok_or_else(invalid)?;
            if [c, m, y, k].iter().any(|&v| v > 100) {
                return Err(invalid());
            }
            return Ok(Self::cmyk(f64::from(c), f64::from(m), f64::from(y), f64::from(k)));
        }

        names::name_to_rgb(&value)
            .map(|(r, g, b)| Self::rgb(r, g, b))
            .ok_or_else(invalid)
    }

    // ─── Derived Forms ───────────────────────────────────────────────────

    /// The canonical RGB triple.
    #[inline]
    #[must_use]
    pub const fn to_rgb(&self) -> (u8, u8, u8) {
        self.rgb
    }

    /// HSL form: hue in whole degrees, saturation/lightness in `[0, 1]`.
    #[inline]
    #[must_use]
    pub const fn to_hsl(&self) -> Hsl {
        self.hsl
    }

    /// CMYK form, each component a percentage.
    #[inline]
    #[must_use]
    pub const fn to_cmyk(&self) -> Cmyk {
        self.cmyk
    }

    /// Lowercase `#rrggbb`.
    #[inline]
    #[must_use]
    pub fn as_hex(&self) -> &str {
        &self.hex
    }

    /// CSS3 keyword, or `"not defined"` when the RGB value has none.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.unwrap_or(UNDEFINED_NAME)
    }

    /// CSS3 keyword, if the RGB value has one.
    #[inline]
    #[must_use]
    pub const fn css_name(&self) -> Option<&'static str> {
        self.name
    }

    /// xterm-256 palette index.
    #[inline]
    #[must_use]
    pub const fn xterm(&self) -> u8 {
        self.xterm
    }

    /// Foreground escape, `ESC[38;5;{n}m`.
    #[inline]
    #[must_use]
    pub fn fg(&self) -> &str {
        &self.fg
    }

    /// Background escape, `ESC[48;5;{n}m`.
    #[inline]
    #[must_use]
    pub fn bg(&self) -> &str {
        &self.bg
    }

    // ─── Shades ──────────────────────────────────────────────────────────

    /// Move lightness by `delta` (clamped to `[0, 1]`).
    ///
    /// Hue is kept in whole degrees and saturation/lightness in whole
    /// percent, so repeated shifts do not accumulate fractional drift.
    #[must_use]
    pub fn shifted(&self, delta: f64) -> Self {
        let Hsl { h, s, l } = self.hsl;
        Self::from_hsl(Hsl {
            h: h.round_ties_even(),
            s: (s * 100.0).round_ties_even() / 100.0,
            l: ((l + delta).clamp(0.0, 1.0) * 100.0).round_ties_even() / 100.0,
        })
    }

    /// The next lighter shade that renders differently in the xterm palette.
    ///
    /// Returns white unchanged.
    #[must_use]
    pub fn lighten(&self) -> Self {
        self.walk(LIGHTNESS_STEP, "white")
    }

    /// The next darker shade that renders differently in the xterm palette.
    ///
    /// Returns black unchanged.
    #[must_use]
    pub fn darken(&self) -> Self {
        self.walk(-LIGHTNESS_STEP, "black")
    }

    fn walk(&self, delta: f64, boundary: &str) -> Self {
        let mut shade = self.clone();
        for _ in 0..MAX_SHADE_STEPS {
            if shade.name() == boundary {
                break;
            }
            shade = shade.shifted(delta);
            if shade.xterm != self.xterm {
                break;
            }
        }
        shade
    }

    /// Every distinct palette shade of this color, darkest first.
    ///
    /// Starts at black, passes through `self`, and ends at white.
    #[must_use]
    pub fn shades(&self) -> Vec<Self> {
        let collect = |step: fn(&Self) -> Self| {
            let mut out = Vec::new();
            let mut current = self.clone();
            for _ in 0..MAX_SHADES {
                let next = step(&current);
                if next == current {
                    break;
                }
                out.push(next.clone());
                current = next;
            }
            out
        };

        let mut shades = collect(Self::darken);
        shades.reverse();
        shades.push(self.clone());
        shades.extend(collect(Self::lighten));
        shades
    }

    // ─── Mixing ──────────────────────────────────────────────────────────

    /// Per-channel average of two colors.
    #[must_use]
    pub fn mix(&self, other: &Self) -> Self {
        self.combine(other, |a, b| (a + b) / 2.0)
    }

    /// Per-channel half difference, clamped at zero.
    #[must_use]
    pub fn difference(&self, other: &Self) -> Self {
        self.combine(other, |a, b| (a - b) / 2.0)
    }

    fn combine(&self, other: &Self, f: impl Fn(f64, f64) -> f64) -> Self {
        let (r1, g1, b1) = self.rgb;
        let (r2, g2, b2) = other.rgb;
        let channel = |a: u8, b: u8| convert::to_channel(f(f64::from(a), f64::from(b)));
        Self::rgb(channel(r1, r2), channel(g1, g2), channel(b1, b2))
    }
}

impl PartialEq for Color {
    fn eq(&self, other: &Self) -> bool {
        self.rgb == other.rgb
    }
}

impl Eq for Color {}

impl FromStr for Color {
    type Err = StyleError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex)
    }
}

// ─── Scales ──────────────────────────────────────────────────────────────────

/// Interpolate between two colors by where `value` falls in `domain`.
///
/// Values outside the domain clamp to its ends. Each RGB channel is
/// interpolated linearly and rounded to the nearest byte, halves to even,
/// so a white-to-black midpoint is 128 rather than the 127 truncation
/// would give.
///
/// ```
/// use tk_style::color::{color_scale, Color};
///
/// let (white, black) = (Color::rgb(255, 255, 255), Color::rgb(0, 0, 0));
/// assert_eq!(color_scale(-1.0, (0.0, 1.0), (&white, &black)), white);
/// assert_eq!(color_scale(0.5, (0.0, 1.0), (&white, &black)).name(), "gray");
/// ```
#[must_use]
pub fn color_scale(value: f64, domain: (f64, f64), range: (&Color, &Color)) -> Color {
    let t = convert::normalize(value, domain);
    let (r1, g1, b1) = range.0.rgb;
    let (r2, g2, b2) = range.1.rgb;
    let lerp = |a: u8, b: u8| convert::to_channel((1.0 - t).mul_add(f64::from(a), t * f64::from(b)));
    Color::rgb(lerp(r1, r2), lerp(g1, g2), lerp(b1, b2))
}

// ─── Parsing Helpers ─────────────────────────────────────────────────────────

fn numbers<const N: usize>(caps: &Captures<'_>) -> Option<[u16; N]> {
    let mut out = [0u16; N];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = caps.get(i + 1)?.as_str().parse().ok()?;
    }
    Some(out)
}

fn parse_hex(s: &str) -> Option<(u8, u8, u8)> {
    let bytes = s.as_bytes();
    match bytes.len() {
        3 => {
            let r = parse_hex_digit(bytes[0])?;
            let g = parse_hex_digit(bytes[1])?;
            let b = parse_hex_digit(bytes[2])?;
            Some((r << 4 | r, g << 4 | g, b << 4 | b))
        }
        6 => Some((
            parse_hex_byte(&bytes[0..2])?,
            parse_hex_byte(&bytes[2..4])?,
            parse_hex_byte(&bytes[4..6])?,
        )),
        _ => None,
    }
}

#[inline]
const fn parse_hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

#[inline]
fn parse_hex_byte(bytes: &[u8]) -> Option<u8> {
    let hi = parse_hex_digit(bytes[0])?;
    let lo = parse_hex_digit(bytes[1])?;
    Some(hi << 4 | lo)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
