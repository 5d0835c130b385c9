//! Color-space utilities shared by extraction, preset generation and rendering.
//!
//! The HSL functions work in the unit cube: hue, saturation and lightness are
//! all in `[0, 1]`, with hue wrapping at 1. RGB channels are plain `u8`.

use std::fmt;
use std::str::FromStr;

use palette::{Hsl, IntoColor, Srgb};
use serde::{Deserialize, Serialize};

use crate::error::ColorParseError;

// ============================================================================
// HSL Conversion
// ============================================================================

/// Converts an RGB triple to `(hue, saturation, lightness)`, each in `[0, 1]`.
///
/// Hue is normalized to `[0, 1)`. Achromatic inputs report hue and
/// saturation of zero.
pub fn rgb_to_hsl(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let rgb = Srgb::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
    let hsl: Hsl = rgb.into_color();

    let hue = hsl.hue.into_positive_degrees() / 360.0;
    // Tiny negative angles come back as exactly 360 degrees.
    let hue = if hue >= 1.0 { 0.0 } else { hue };

    (hue, hsl.saturation, hsl.lightness)
}

/// Converts `(hue, saturation, lightness)` in `[0, 1]` back to RGB.
///
/// Channels are rounded to the nearest integer. With zero saturation every
/// channel equals `round(l * 255)`.
pub fn hsl_to_rgb(h: f32, s: f32, l: f32) -> (u8, u8, u8) {
    let hsl: Hsl = Hsl::new(h * 360.0, s, l);
    let rgb: Srgb = hsl.into_color();
    (
        unit_to_channel(rgb.red),
        unit_to_channel(rgb.green),
        unit_to_channel(rgb.blue),
    )
}

fn unit_to_channel(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

// ============================================================================
// Rgb
// ============================================================================

/// An opaque 8-bit RGB color.
///
/// Serializes as a lowercase `#rrggbb` string, and parses both the long and
/// the short (`#rgb`) hex forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Builds a color from a packed `0xRRGGBB` value.
    pub const fn from_u32(packed: u32) -> Self {
        Self {
            r: (packed >> 16) as u8,
            g: (packed >> 8) as u8,
            b: packed as u8,
        }
    }

    /// Builds a color from unit-range HSL components.
    pub fn from_hsl(h: f32, s: f32, l: f32) -> Self {
        let (r, g, b) = hsl_to_rgb(h, s, l);
        Self { r, g, b }
    }

    /// Returns the unit-range HSL components of this color.
    pub fn to_hsl(self) -> (f32, f32, f32) {
        rgb_to_hsl(self.r, self.g, self.b)
    }

    /// Returns the lowercase `#rrggbb` form.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn as_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Rgb {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ColorParseError::new(s);
        let digits = s.trim().strip_prefix('#').ok_or_else(err)?;
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(err());
        }

        match digits.len() {
            6 => {
                let packed = u32::from_str_radix(digits, 16).map_err(|_| err())?;
                Ok(Self::from_u32(packed))
            }
            3 => {
                let mut channels = [0u8; 3];
                for (slot, c) in channels.iter_mut().zip(digits.chars()) {
                    let nibble = c.to_digit(16).ok_or_else(err)? as u8;
                    *slot = nibble << 4 | nibble;
                }
                Ok(Self::new(channels[0], channels[1], channels[2]))
            }
            _ => Err(err()),
        }
    }
}

impl TryFrom<String> for Rgb {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(color: Rgb) -> Self {
        color.to_hex()
    }
}

// ============================================================================
// Palette
// ============================================================================

/// An ordered two-color gradient specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Palette {
    /// Color at the start of the gradient line.
    pub from: Rgb,
    /// Color at the end of the gradient line.
    pub to: Rgb,
}

impl Palette {
    pub const fn new(from: Rgb, to: Rgb) -> Self {
        Self { from, to }
    }

    /// Returns true if both stops are the same color.
    pub fn is_solid(&self) -> bool {
        self.from == self.to
    }

    /// CSS gradient for swatches and markup previews.
    pub fn css_gradient(&self) -> String {
        format!("linear-gradient(135deg, {}, {})", self.from, self.to)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn hue_distance(a: f32, b: f32) -> f32 {
        let d = (a - b).abs();
        d.min(1.0 - d)
    }

    #[test]
    fn primary_colors_to_hsl() {
        let (h, s, l) = rgb_to_hsl(255, 0, 0);
        assert!(h.abs() < 1e-6);
        assert!((s - 1.0).abs() < 1e-6);
        assert!((l - 0.5).abs() < 1e-6);

        let (h, _, _) = rgb_to_hsl(0, 255, 0);
        assert!((h - 1.0 / 3.0).abs() < 1e-4);

        let (h, _, _) = rgb_to_hsl(0, 0, 255);
        assert!((h - 2.0 / 3.0).abs() < 1e-4);
    }

    #[test]
    fn achromatic_has_zero_saturation() {
        let (h, s, l) = rgb_to_hsl(128, 128, 128);
        assert_eq!(h, 0.0);
        assert_eq!(s, 0.0);
        assert!((l - 128.0 / 255.0).abs() < 1e-6);

        assert_eq!(hsl_to_rgb(0.7, 0.0, 0.5), (128, 128, 128));
        assert_eq!(hsl_to_rgb(0.0, 0.0, 1.0), (255, 255, 255));
    }

    #[test]
    fn saturation_branches_on_lightness() {
        // l > 0.5 uses d / (2 - max - min)
        let (_, s, l) = rgb_to_hsl(255, 204, 204);
        assert!(l > 0.5);
        let expected = (1.0 - 0.8) / (2.0 - 1.0 - 0.8);
        assert!((s - expected).abs() < 1e-4);

        // l <= 0.5 uses d / (max + min)
        let (_, s, l) = rgb_to_hsl(102, 51, 51);
        assert!(l <= 0.5);
        let expected = (0.4 - 0.2) / (0.4 + 0.2);
        assert!((s - expected).abs() < 1e-4);
    }

    #[test]
    fn rgb_round_trip_is_exact() {
        for r in (0..=255u16).step_by(17) {
            for g in (0..=255u16).step_by(17) {
                for b in (0..=255u16).step_by(17) {
                    let (r, g, b) = (r as u8, g as u8, b as u8);
                    let (h, s, l) = rgb_to_hsl(r, g, b);
                    assert_eq!(hsl_to_rgb(h, s, l), (r, g, b), "round trip of ({r}, {g}, {b})");
                }
            }
        }
    }

    #[test]
    fn hsl_round_trip_within_tolerance() {
        for hi in 0..20 {
            for si in 2..=10 {
                for li in 2..=8 {
                    let (h, s, l) = (hi as f32 / 20.0, si as f32 / 10.0, li as f32 / 10.0);
                    let (r, g, b) = hsl_to_rgb(h, s, l);
                    let (h2, s2, l2) = rgb_to_hsl(r, g, b);
                    assert!(hue_distance(h, h2) < 0.02, "hue drift at ({h}, {s}, {l})");
                    assert!((s - s2).abs() < 0.03, "saturation drift at ({h}, {s}, {l})");
                    assert!((l - l2).abs() < 0.01, "lightness drift at ({h}, {s}, {l})");
                }
            }
        }
    }

    #[test]
    fn hex_formatting_and_parsing() {
        let color = Rgb::from_u32(0x1c2440);
        assert_eq!(color.to_hex(), "#1c2440");
        assert_eq!("#1C2440".parse::<Rgb>().unwrap(), color);
        assert_eq!("#fa0".parse::<Rgb>().unwrap(), Rgb::new(0xff, 0xaa, 0x00));

        assert!("1c2440".parse::<Rgb>().is_err());
        assert!("#12345".parse::<Rgb>().is_err());
        assert!("#gggggg".parse::<Rgb>().is_err());
    }

    #[test]
    fn rgb_serializes_as_hex_string() {
        let palette = Palette::new(Rgb::from_u32(0x61d2ff), Rgb::from_u32(0x6ba1ff));
        let json = serde_json::to_string(&palette).unwrap();
        assert_eq!(json, r##"{"from":"#61d2ff","to":"#6ba1ff"}"##);

        let restored: Palette = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, palette);
        assert!(serde_json::from_str::<Rgb>("\"red\"").is_err());
    }

    #[test]
    fn palette_css_gradient() {
        let palette = Palette::new(Rgb::from_u32(0xff0000), Rgb::from_u32(0x0000ff));
        assert_eq!(palette.css_gradient(), "linear-gradient(135deg, #ff0000, #0000ff)");
        assert!(!palette.is_solid());
    }
}
