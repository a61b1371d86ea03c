// SPDX-License-Identifier: MIT
//
// Numeric color-space conversions.
//
// RGB (one byte per channel) is the canonical form. Everything in this
// module is a pure function over plain values so `Color` can derive its
// cached fields in one place.
//
// Single-character variable names (r, g, b, h, s, l, c, m, y, k) are the
// usual notation for these formulas.
//
// Rounding: halves round to even everywhere (`f64::round_ties_even`), so
// channel values and the two-decimal HSL/CMYK components agree with the
// published xterm and colorsys reference numbers.

#![allow(clippy::many_single_char_names)]

// ─── Component Types ────────────────────────────────────────────────────────

/// A color in HSL space.
///
/// Hue is in whole degrees `[0, 360)`. Saturation and lightness are in
/// `[0, 1]`, rounded to two decimals when produced by [`rgb_to_hsl`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    pub h: f64,
    pub s: f64,
    pub l: f64,
}

/// A color in CMYK space, every component a percentage in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cmyk {
    pub c: f64,
    pub m: f64,
    pub y: f64,
    pub k: f64,
}

// ─── Helpers ────────────────────────────────────────────────────────────────

/// Round to `places` decimals, ties to even.
#[inline]
pub(crate) fn round_to(v: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (v * scale).round_ties_even() / scale
}

/// Clamp and round a `0.0..=255.0` value to a channel byte.
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn to_channel(v: f64) -> u8 {
    // Clamp first so the cast cannot wrap.
    v.round_ties_even().clamp(0.0, 255.0) as u8
}

#[inline]
fn unit(c: u8) -> f64 {
    f64::from(c) / 255.0
}

// ─── xterm-256 ──────────────────────────────────────────────────────────────

/// Quantize an RGB triple to the xterm 256-color palette.
///
/// Pure grays use the 24-step ramp (232–255), clamping the darkest to 16
/// and the brightest to 231. Everything else lands in the 6×6×6 cube
/// (16–231). The result is always in `16..=255`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn rgb_to_xterm256(r: u8, g: u8, b: u8) -> u8 {
    if r == g && g == b {
        let sum = u16::from(r) * 3;
        if sum < 24 {
            return 16;
        }
        if sum > 744 {
            return 231;
        }
        // r is in 8..=248 here, so the step is in 0..=23.
        let step = ((f64::from(r) - 8.0) / 247.0 * 24.0).round_ties_even();
        return 232 + step as u8;
    }

    let level = |c: u8| (unit(c) * 5.0).round_ties_even() as u8;
    16 + 36 * level(r) + 6 * level(g) + level(b)
}

// ─── HSL ────────────────────────────────────────────────────────────────────

/// Convert RGB to HSL (hue in whole degrees, s/l rounded to two decimals).
#[must_use]
#[allow(clippy::float_cmp)] // Comparing a channel against the max it came from.
pub fn rgb_to_hsl(r: u8, g: u8, b: u8) -> Hsl {
    let (r, g, b) = (unit(r), unit(g), unit(b));
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;
    let range = max - min;

    if range < f64::EPSILON {
        return Hsl { h: 0.0, s: 0.0, l: round_to(l, 2) };
    }

    let s = if l <= 0.5 {
        range / (max + min)
    } else {
        range / (2.0 - max - min)
    };

    let rc = (max - r) / range;
    let gc = (max - g) / range;
    let bc = (max - b) / range;
    let h = if r == max {
        bc - gc
    } else if g == max {
        2.0 + rc - bc
    } else {
        4.0 + gc - rc
    };
    let h = (h / 6.0).rem_euclid(1.0);

    Hsl {
        h: (h * 360.0).round_ties_even().rem_euclid(360.0),
        s: round_to(s, 2),
        l: round_to(l, 2),
    }
}

/// Convert HSL back to RGB, rounding each channel to the nearest byte.
///
/// Channels are rounded, not truncated: a channel that computes to 127.6
/// is 128 here where a truncating conversion gives 127.
///
/// Saturation and lightness are clamped to `[0, 1]`; hue wraps.
#[must_use]
pub fn hsl_to_rgb(hsl: Hsl) -> (u8, u8, u8) {
    let h = (hsl.h / 360.0).rem_euclid(1.0);
    let s = hsl.s.clamp(0.0, 1.0);
    let l = hsl.l.clamp(0.0, 1.0);

    if s == 0.0 {
        let v = to_channel(l * 255.0);
        return (v, v, v);
    }

    let m2 = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let m1 = 2.0 * l - m2;

    (
        to_channel(hue_to_channel(m1, m2, h + 1.0 / 3.0) * 255.0),
        to_channel(hue_to_channel(m1, m2, h) * 255.0),
        to_channel(hue_to_channel(m1, m2, h - 1.0 / 3.0) * 255.0),
    )
}

fn hue_to_channel(m1: f64, m2: f64, hue: f64) -> f64 {
    let hue = hue.rem_euclid(1.0);
    if hue < 1.0 / 6.0 {
        (m2 - m1).mul_add(hue * 6.0, m1)
    } else if hue < 0.5 {
        m2
    } else if hue < 2.0 / 3.0 {
        (m2 - m1).mul_add((2.0 / 3.0 - hue) * 6.0, m1)
    } else {
        m1
    }
}

// ─── CMYK ───────────────────────────────────────────────────────────────────

/// Convert RGB to CMYK percentages rounded to two decimals.
///
/// Pure black is `(0, 0, 0, 100)`.
#[must_use]
pub fn rgb_to_cmyk(r: u8, g: u8, b: u8) -> Cmyk {
    if (r, g, b) == (0, 0, 0) {
        return Cmyk { c: 0.0, m: 0.0, y: 0.0, k: 100.0 };
    }

    let c = 1.0 - unit(r);
    let m = 1.0 - unit(g);
    let y = 1.0 - unit(b);
    let k = c.min(m).min(y);
    let scale = |v: f64| round_to((v - k) / (1.0 - k) * 100.0, 2);

    Cmyk {
        c: scale(c),
        m: scale(m),
        y: scale(y),
        k: round_to(k * 100.0, 2),
    }
}

/// Convert CMYK percentages to RGB.
#[must_use]
pub fn cmyk_to_rgb(cmyk: Cmyk) -> (u8, u8, u8) {
    let k = 1.0 - cmyk.k.clamp(0.0, 100.0) / 100.0;
    let channel = |v: f64| to_channel(255.0 * (1.0 - v.clamp(0.0, 100.0) / 100.0) * k);
    (channel(cmyk.c), channel(cmyk.m), channel(cmyk.y))
}

// ─── Normalization ──────────────────────────────────────────────────────────

/// Map `value` into `[0, 1]` over `domain`, clamping values outside it.
///
/// The domain may be given in either order. A zero-width domain maps
/// everything to `0.0`.
#[must_use]
pub fn normalize(value: f64, domain: (f64, f64)) -> f64 {
    let lo = domain.0.min(domain.1);
    let hi = domain.0.max(domain.1);
    let width = hi - lo;
    if width <= 0.0 || !width.is_finite() {
        return 0.0;
    }
    ((value - lo) / width).clamp(0.0, 1.0)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() <= epsilon
    }

    // ── xterm-256 ───────────────────────────────────────────────────────

    #[test]
    fn xterm_primaries() {
        assert_eq!(rgb_to_xterm256(255, 0, 0), 196);
        assert_eq!(rgb_to_xterm256(0, 255, 0), 46);
        assert_eq!(rgb_to_xterm256(0, 0, 255), 21);
    }

    #[test]
    fn xterm_cube_corner() {
        assert_eq!(rgb_to_xterm256(255, 255, 0), 226);
        assert_eq!(rgb_to_xterm256(1, 0, 0), 16);
    }

    #[test]
    fn xterm_gray_extremes() {
        assert_eq!(rgb_to_xterm256(0, 0, 0), 16);
        assert_eq!(rgb_to_xterm256(7, 7, 7), 16);
        assert_eq!(rgb_to_xterm256(255, 255, 255), 231);
        assert_eq!(rgb_to_xterm256(249, 249, 249), 231);
    }

    #[test]
    fn xterm_gray_ramp() {
        assert_eq!(rgb_to_xterm256(8, 8, 8), 232);
        assert_eq!(rgb_to_xterm256(128, 128, 128), 244);
        assert_eq!(rgb_to_xterm256(248, 248, 248), 255);
    }

    #[test]
    fn xterm_range_over_sampled_space() {
        for r in (0..=255u8).step_by(5) {
            for g in (0..=255u8).step_by(15) {
                for b in (0..=255u8).step_by(17) {
                    let idx = rgb_to_xterm256(r, g, b);
                    assert!(idx >= 16, "({r}, {g}, {b}) -> {idx}");
                    assert_eq!(idx, rgb_to_xterm256(r, g, b));
                }
            }
        }
    }

    #[test]
    fn xterm_non_gray_stays_in_cube() {
        for r in (0..=255u8).step_by(3) {
            let idx = rgb_to_xterm256(r, 255 - r, 0);
            assert!((16..=231).contains(&idx));
        }
    }

    // ── HSL ─────────────────────────────────────────────────────────────

    #[test]
    fn hsl_of_primaries() {
        assert_eq!(rgb_to_hsl(255, 0, 0), Hsl { h: 0.0, s: 1.0, l: 0.5 });
        assert_eq!(rgb_to_hsl(0, 255, 0), Hsl { h: 120.0, s: 1.0, l: 0.5 });
        assert_eq!(rgb_to_hsl(0, 0, 255), Hsl { h: 240.0, s: 1.0, l: 0.5 });
    }

    #[test]
    fn hsl_of_grays_is_achromatic() {
        assert_eq!(rgb_to_hsl(0, 0, 0), Hsl { h: 0.0, s: 0.0, l: 0.0 });
        assert_eq!(rgb_to_hsl(255, 255, 255), Hsl { h: 0.0, s: 0.0, l: 1.0 });
        assert_eq!(rgb_to_hsl(128, 128, 128).s, 0.0);
    }

    #[test]
    fn hsl_rounds_to_two_decimals() {
        // rgb(64, 128, 192): l = 0.50196..., s = 0.5039...
        let hsl = rgb_to_hsl(64, 128, 192);
        assert_eq!(hsl.h, 210.0);
        assert!(approx_eq(hsl.s, 0.5, 1e-9));
        assert!(approx_eq(hsl.l, 0.5, 1e-9));
    }

    #[test]
    fn hsl_to_rgb_primaries() {
        assert_eq!(hsl_to_rgb(Hsl { h: 0.0, s: 1.0, l: 0.5 }), (255, 0, 0));
        assert_eq!(hsl_to_rgb(Hsl { h: 120.0, s: 1.0, l: 0.5 }), (0, 255, 0));
        assert_eq!(hsl_to_rgb(Hsl { h: 240.0, s: 1.0, l: 0.5 }), (0, 0, 255));
    }

    #[test]
    fn hsl_to_rgb_lightness_extremes() {
        assert_eq!(hsl_to_rgb(Hsl { h: 200.0, s: 0.7, l: 1.0 }), (255, 255, 255));
        assert_eq!(hsl_to_rgb(Hsl { h: 200.0, s: 0.7, l: 0.0 }), (0, 0, 0));
    }

    #[test]
    fn hsl_to_rgb_rounds_channels() {
        // 0.5 × 255 = 127.5: rounds (to even) up, truncation would give 127.
        assert_eq!(hsl_to_rgb(Hsl { h: 0.0, s: 0.0, l: 0.5 }), (128, 128, 128));
        // 0.3 × 255 = 76.5 rounds to even: 76.
        assert_eq!(hsl_to_rgb(Hsl { h: 0.0, s: 0.0, l: 0.3 }), (76, 76, 76));
    }

    #[test]
    fn hsl_to_rgb_hue_wraps() {
        assert_eq!(
            hsl_to_rgb(Hsl { h: 360.0, s: 1.0, l: 0.5 }),
            hsl_to_rgb(Hsl { h: 0.0, s: 1.0, l: 0.5 })
        );
    }

    #[test]
    fn hsl_roundtrip_grid() {
        for h in (0..360).step_by(15) {
            for s in [0.6, 0.8, 1.0] {
                for l in [0.4, 0.5, 0.6] {
                    let hsl = Hsl { h: f64::from(h), s, l };
                    let (r, g, b) = hsl_to_rgb(hsl);
                    let back = rgb_to_hsl(r, g, b);
                    let dh = (back.h - hsl.h).abs();
                    let dh = dh.min(360.0 - dh);
                    assert!(dh <= 1.0, "hue drift for {hsl:?}: {back:?}");
                    assert!(approx_eq(back.s, s, 0.011), "sat drift for {hsl:?}: {back:?}");
                    assert!(approx_eq(back.l, l, 0.011), "light drift for {hsl:?}: {back:?}");
                }
            }
        }
    }

    // ── CMYK ────────────────────────────────────────────────────────────

    #[test]
    fn cmyk_of_black() {
        assert_eq!(rgb_to_cmyk(0, 0, 0), Cmyk { c: 0.0, m: 0.0, y: 0.0, k: 100.0 });
    }

    #[test]
    fn cmyk_of_white() {
        assert_eq!(rgb_to_cmyk(255, 255, 255), Cmyk { c: 0.0, m: 0.0, y: 0.0, k: 0.0 });
    }

    #[test]
    fn cmyk_of_red() {
        assert_eq!(rgb_to_cmyk(255, 0, 0), Cmyk { c: 0.0, m: 100.0, y: 100.0, k: 0.0 });
    }

    #[test]
    fn cmyk_of_mid_gray() {
        let cmyk = rgb_to_cmyk(128, 128, 128);
        assert_eq!((cmyk.c, cmyk.m, cmyk.y), (0.0, 0.0, 0.0));
        assert!(approx_eq(cmyk.k, 49.8, 1e-9));
    }

    #[test]
    fn cmyk_to_rgb_basics() {
        assert_eq!(cmyk_to_rgb(Cmyk { c: 0.0, m: 0.0, y: 0.0, k: 100.0 }), (0, 0, 0));
        assert_eq!(cmyk_to_rgb(Cmyk { c: 0.0, m: 100.0, y: 100.0, k: 0.0 }), (255, 0, 0));
        assert_eq!(cmyk_to_rgb(Cmyk { c: 0.0, m: 0.0, y: 0.0, k: 0.0 }), (255, 255, 255));
    }

    #[test]
    fn cmyk_to_rgb_half_key() {
        // 255 * 0.5 = 127.5, ties to even.
        assert_eq!(cmyk_to_rgb(Cmyk { c: 0.0, m: 0.0, y: 0.0, k: 50.0 }), (128, 128, 128));
    }

    #[test]
    fn cmyk_to_rgb_clamps_out_of_range() {
        assert_eq!(cmyk_to_rgb(Cmyk { c: 150.0, m: -5.0, y: 0.0, k: 0.0 }), (0, 255, 255));
    }

    // ── Normalization ───────────────────────────────────────────────────

    #[test]
    fn normalize_inside_domain() {
        assert!(approx_eq(normalize(5.0, (0.0, 10.0)), 0.5, 1e-12));
    }

    #[test]
    fn normalize_clamps() {
        assert_eq!(normalize(-3.0, (0.0, 10.0)), 0.0);
        assert_eq!(normalize(42.0, (0.0, 10.0)), 1.0);
    }

    #[test]
    fn normalize_reversed_domain() {
        assert!(approx_eq(normalize(2.5, (10.0, 0.0)), 0.25, 1e-12));
    }

    #[test]
    fn normalize_zero_width_domain() {
        assert_eq!(normalize(3.0, (3.0, 3.0)), 0.0);
    }

    #[test]
    fn round_to_ties_even() {
        assert!(approx_eq(round_to(0.125, 2), 0.12, 1e-12));
        assert_eq!(to_channel(127.5), 128);
        assert_eq!(to_channel(126.5), 126);
    }
}
