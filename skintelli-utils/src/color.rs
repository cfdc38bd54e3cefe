//! Color math shared by the detectors and the heatmap renderer.

use serde::{Deserialize, Serialize};

/// Rec.601 luma weights (R, G, B).
pub const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

/// Opaque 8-bit RGB color.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct RgbColor {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl RgbColor {
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    pub const fn channels(self) -> [u8; 3] {
        [self.red, self.green, self.blue]
    }

    /// Linear interpolation towards `other`; `t` is clamped to 0..=1.
    pub fn lerp(self, other: RgbColor, t: f32) -> RgbColor {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| -> u8 {
            (a as f32 + (b as f32 - a as f32) * t)
                .round()
                .clamp(0.0, 255.0) as u8
        };
        RgbColor::new(
            mix(self.red, other.red),
            mix(self.green, other.green),
            mix(self.blue, other.blue),
        )
    }
}

impl std::str::FromStr for RgbColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex_color(s).ok_or_else(|| format!("invalid color '{s}', expected #RGB or #RRGGBB"))
    }
}

/// Convert RGB channels (0-255) to HSV: hue in degrees `[0, 360)`, saturation and value in `[0, 1]`.
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let [rf, gf, bf] = [r, g, b].map(|c| c as f32 / 255.0);
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let chroma = max - min;

    if max <= 0.0 {
        return (0.0, 0.0, 0.0);
    }
    let saturation = chroma / max;
    if chroma <= f32::EPSILON {
        return (0.0, saturation, max);
    }

    let sector = if r >= g && r >= b {
        ((gf - bf) / chroma).rem_euclid(6.0)
    } else if g >= b {
        (bf - rf) / chroma + 2.0
    } else {
        (rf - gf) / chroma + 4.0
    };
    let hue = (sector * 60.0) % 360.0;
    (hue, saturation, max)
}

/// Perceptual (Rec.601) luma on the 0–255 scale.
#[inline]
pub fn rec601_luma(r: u8, g: u8, b: u8) -> f32 {
    LUMA_WEIGHTS[0] * r as f32 + LUMA_WEIGHTS[1] * g as f32 + LUMA_WEIGHTS[2] * b as f32
}

/// Piecewise-linear color ramp sampled with a position in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorRamp {
    stops: Vec<(f32, RgbColor)>,
}

impl ColorRamp {
    /// Build a ramp from `(position, color)` stops. Stops are sorted by position;
    /// an empty list yields a black ramp.
    pub fn new(mut stops: Vec<(f32, RgbColor)>) -> Self {
        stops.sort_by(|a, b| a.0.total_cmp(&b.0));
        if stops.is_empty() {
            stops.push((0.0, RgbColor::default()));
        }
        Self { stops }
    }

    /// Blue → green → yellow → red, the conventional severity palette.
    pub fn severity() -> Self {
        Self::new(vec![
            (0.0, RgbColor::new(0, 0, 255)),
            (0.35, RgbColor::new(0, 255, 0)),
            (0.6, RgbColor::new(255, 255, 0)),
            (1.0, RgbColor::new(255, 0, 0)),
        ])
    }

    pub fn sample(&self, t: f32) -> RgbColor {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let first = self.stops[0];
        if t <= first.0 {
            return first.1;
        }
        for pair in self.stops.windows(2) {
            let (lo, hi) = (pair[0], pair[1]);
            if t <= hi.0 {
                let span = hi.0 - lo.0;
                if span <= f32::EPSILON {
                    return hi.1;
                }
                return lo.1.lerp(hi.1, (t - lo.0) / span);
            }
        }
        self.stops[self.stops.len() - 1].1
    }
}

/// Parse a hexadecimal color string: `#RGB` or `#RRGGBB`, `#` optional.
pub fn parse_hex_color(input: &str) -> Option<RgbColor> {
    let hex = input.trim();
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    let nibble = |i: usize| u8::from_str_radix(hex.get(i..i + 1)?, 16).ok();
    let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    match hex.len() {
        3 => Some(RgbColor::new(
            nibble(0)? * 17,
            nibble(1)? * 17,
            nibble(2)? * 17,
        )),
        6 => Some(RgbColor::new(byte(0)?, byte(2)?, byte(4)?)),
        _ => None,
    }
}
