//! Named palette banks and the random preset generator.
//!
//! The built-in bank is fixed for the life of the process. The custom bank is
//! produced by [`generate_custom_presets`] and replaced wholesale whenever the
//! user asks for new colors.

use std::fmt;
use std::str::FromStr;

use log::warn;
use rand::Rng;

use crate::color::{Palette, Rgb};
use crate::error::HslParseError;

/// Key used whenever a requested preset cannot be found.
pub const DEFAULT_PRESET_KEY: &str = "midnight";

/// Number of slots in a generated custom bank.
pub const CUSTOM_PRESET_COUNT: usize = 15;

/// Pair used for a custom slot whose random draws were unusable.
pub const SAFE_PALETTE: Palette = Palette::new(Rgb::from_u32(0x61d2ff), Rgb::from_u32(0x6ba1ff));

const BUILTIN_PRESETS: [(&str, u32, u32); 15] = [
    ("peach", 0xffb076, 0xff9a5a),
    ("coral", 0xff7285, 0xff5a8b),
    ("blush", 0xffb6c1, 0xffc8d3),
    ("mint", 0xa9f1df, 0x86e3cd),
    ("lavender", 0xc1b7ff, 0xd1c4ff),
    ("lime", 0xb4e876, 0x8ed56b),
    ("cobalt", 0x6678ff, 0x826fff),
    ("sunset", 0xff6b6b, 0x6b8cff),
    ("oceanBreeze", 0x61d2ff, 0x6ba1ff),
    ("midnight", 0x1c2440, 0x2a3c70),
    ("ruby", 0xff5e62, 0xff9966),
    ("goldenHour", 0xf9d976, 0xf39f86),
    ("ember", 0xff7d59, 0xff5631),
    ("tropicalWater", 0x43c6ac, 0xf8ffae),
    ("twilight", 0x6441a5, 0x2a0845),
];

// ============================================================================
// PresetBank
// ============================================================================

/// An ordered mapping from preset name to palette.
///
/// Order is preserved because it drives the layout of the swatch grid.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PresetBank {
    entries: Vec<(String, Palette)>,
}

impl PresetBank {
    /// Creates an empty bank.
    pub fn new() -> Self {
        Self::default()
    }

    /// The fifteen built-in presets.
    pub fn builtin() -> Self {
        let entries = BUILTIN_PRESETS
            .iter()
            .map(|&(name, from, to)| {
                (
                    name.to_string(),
                    Palette::new(Rgb::from_u32(from), Rgb::from_u32(to)),
                )
            })
            .collect();
        Self { entries }
    }

    /// Builds a bank from entries. Later duplicates replace earlier ones in place.
    pub fn from_entries(entries: impl IntoIterator<Item = (String, Palette)>) -> Self {
        let mut bank = Self::new();
        for (name, palette) in entries {
            bank.insert(name, palette);
        }
        bank
    }

    fn insert(&mut self, name: String, palette: Palette) {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = palette,
            None => self.entries.push((name, palette)),
        }
    }

    pub fn get(&self, name: &str) -> Option<Palette> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, palette)| *palette)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn first_key(&self) -> Option<&str> {
        self.entries.first().map(|(name, _)| name.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Palette)> {
        self.entries.iter().map(|(name, palette)| (name.as_str(), palette))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Randomness
// ============================================================================

/// A source of uniform draws in `[0, 1)`.
///
/// Implemented for every [`rand::Rng`]. Tests substitute their own source to
/// feed exact or deliberately broken values.
pub trait RandomSource {
    fn next_unit(&mut self) -> f32;
}

impl<R: Rng + ?Sized> RandomSource for R {
    fn next_unit(&mut self) -> f32 {
        self.gen_range(0.0..1.0)
    }
}

/// Pulls one draw, rejecting anything outside `[0, 1)`.
fn draw<R: RandomSource + ?Sized>(rng: &mut R) -> Option<f32> {
    let value = rng.next_unit();
    (0.0..1.0).contains(&value).then_some(value)
}

// ============================================================================
// HslColor
// ============================================================================

/// A color in CSS HSL units: hue in degrees, saturation and lightness in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HslColor {
    pub hue: f32,
    pub saturation: f32,
    pub lightness: f32,
}

impl HslColor {
    pub fn new(hue: f32, saturation: f32, lightness: f32) -> Self {
        Self {
            hue,
            saturation,
            lightness,
        }
    }

    /// Converts to RGB, wrapping hue and clamping the percentages first.
    pub fn to_rgb(self) -> Rgb {
        let hue = if self.hue.is_finite() {
            self.hue.rem_euclid(360.0)
        } else {
            0.0
        };
        let percent = |v: f32| {
            if v.is_finite() {
                v.clamp(0.0, 100.0) / 100.0
            } else {
                0.0
            }
        };
        Rgb::from_hsl(hue / 360.0, percent(self.saturation), percent(self.lightness))
    }
}

impl fmt::Display for HslColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hsl({}, {}%, {}%)",
            css_number(self.hue),
            css_number(self.saturation),
            css_number(self.lightness)
        )
    }
}

fn css_number(value: f32) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        let text = format!("{value:.2}");
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

impl FromStr for HslColor {
    type Err = HslParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || HslParseError {
            input: s.to_string(),
        };
        let body = s
            .trim()
            .strip_prefix("hsl(")
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(err)?;

        let mut parts = body.split(',').map(str::trim);
        let mut next = |percent: bool| -> Result<f32, HslParseError> {
            let part = parts.next().ok_or_else(err)?;
            let number = if percent {
                part.strip_suffix('%').ok_or_else(err)?
            } else {
                part
            };
            number.trim().parse::<f32>().map_err(|_| err())
        };

        let hue = next(false)?;
        let saturation = next(true)?;
        let lightness = next(true)?;
        if parts.next().is_some() {
            return Err(err());
        }
        Ok(Self::new(hue, saturation, lightness))
    }
}

// ============================================================================
// Generator
// ============================================================================

/// Draws a vivid random color: hue `[0, 360)`, saturation `[65, 85)`,
/// lightness `[50, 70)`, all floored to whole numbers.
///
/// Returns `None` if the random source produced an unusable draw.
pub fn random_color<R: RandomSource + ?Sized>(rng: &mut R) -> Option<HslColor> {
    let hue = (draw(rng)? * 360.0).floor();
    let saturation = 65.0 + (draw(rng)? * 20.0).floor();
    let lightness = 50.0 + (draw(rng)? * 20.0).floor();
    Some(HslColor::new(hue, saturation, lightness))
}

/// Picks a partner for `base`: analogous ±30° or complementary 180°, with
/// saturation jittered ±10 into `[50, 100]` and lightness ±10 into `[40, 75]`.
///
/// Returns `None` if the random source produced an unusable draw.
pub fn harmonious_color<R: RandomSource + ?Sized>(base: HslColor, rng: &mut R) -> Option<HslColor> {
    let relationship = (draw(rng)? * 3.0).floor() as u8;
    let offset = match relationship {
        0 => 30.0,
        1 => -30.0,
        _ => 180.0,
    };
    let hue = (base.hue + offset).rem_euclid(360.0);
    let saturation = (base.saturation + draw(rng)? * 20.0 - 10.0).clamp(50.0, 100.0);
    let lightness = (base.lightness + draw(rng)? * 20.0 - 10.0).clamp(40.0, 75.0);
    Some(HslColor::new(hue, saturation, lightness))
}

fn generate_slot<R: RandomSource + ?Sized>(rng: &mut R) -> Option<Palette> {
    let base = random_color(rng)?;
    let partner = harmonious_color(base, rng)?;
    Some(Palette::new(base.to_rgb(), partner.to_rgb()))
}

/// Generates the custom bank `custom1..custom15`.
///
/// Always returns exactly [`CUSTOM_PRESET_COUNT`] entries; a slot whose draws
/// were unusable gets [`SAFE_PALETTE`].
pub fn generate_custom_presets<R: RandomSource + ?Sized>(rng: &mut R) -> PresetBank {
    let entries = (1..=CUSTOM_PRESET_COUNT).map(|slot| {
        let palette = generate_slot(rng).unwrap_or_else(|| {
            warn!("custom{slot}: random source out of range, using safe palette");
            SAFE_PALETTE
        });
        (format!("custom{slot}"), palette)
    });
    PresetBank::from_entries(entries.collect::<Vec<_>>())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    /// Replays a fixed list of draws, repeating the last one.
    struct Scripted {
        values: Vec<f32>,
        pos: usize,
    }

    impl Scripted {
        fn new(values: &[f32]) -> Self {
            Self {
                values: values.to_vec(),
                pos: 0,
            }
        }
    }

    impl RandomSource for Scripted {
        fn next_unit(&mut self) -> f32 {
            let value = self.values[self.pos.min(self.values.len() - 1)];
            self.pos += 1;
            value
        }
    }

    #[test]
    fn builtin_bank_contents() {
        let bank = PresetBank::builtin();
        assert_eq!(bank.len(), 15);
        assert_eq!(bank.first_key(), Some("peach"));
        assert_eq!(
            bank.get(DEFAULT_PRESET_KEY),
            Some(Palette::new(Rgb::from_u32(0x1c2440), Rgb::from_u32(0x2a3c70)))
        );
        assert!(bank.contains("oceanBreeze"));
        assert!(!bank.contains("custom1"));
    }

    #[test]
    fn from_entries_replaces_duplicates_in_place() {
        let a = Palette::new(Rgb::from_u32(0x111111), Rgb::from_u32(0x222222));
        let b = Palette::new(Rgb::from_u32(0x333333), Rgb::from_u32(0x444444));
        let bank = PresetBank::from_entries(vec![
            ("one".to_string(), a),
            ("two".to_string(), a),
            ("one".to_string(), b),
        ]);
        assert_eq!(bank.keys().collect::<Vec<_>>(), vec!["one", "two"]);
        assert_eq!(bank.get("one"), Some(b));
    }

    #[test]
    fn generated_bank_has_fifteen_named_slots() {
        let mut rng = StdRng::seed_from_u64(7);
        let bank = generate_custom_presets(&mut rng);

        assert_eq!(bank.len(), CUSTOM_PRESET_COUNT);
        let keys: Vec<_> = bank.keys().collect();
        assert_eq!(keys[0], "custom1");
        assert_eq!(keys[14], "custom15");

        for (_, palette) in bank.iter() {
            let (_, s, l) = palette.from.to_hsl();
            assert!((0.6..=0.9).contains(&s), "base saturation {s}");
            assert!((0.45..=0.75).contains(&l), "base lightness {l}");
        }
    }

    #[test]
    fn out_of_range_draws_use_safe_palette() {
        for broken in [1.5, -0.25, f32::NAN, f32::INFINITY, 1.0] {
            let bank = generate_custom_presets(&mut Scripted::new(&[broken]));
            assert_eq!(bank.len(), CUSTOM_PRESET_COUNT);
            assert!(bank.iter().all(|(_, p)| *p == SAFE_PALETTE), "draw {broken}");
        }
    }

    #[test]
    fn one_bad_draw_only_affects_its_slot() {
        // Slot 1 consumes six good draws, slot 2 hits the bad one.
        let mut draws = vec![0.5; 6];
        draws.push(7.0);
        draws.extend(std::iter::repeat_n(0.25, 200));
        let bank = generate_custom_presets(&mut Scripted::new(&draws));

        assert_ne!(bank.get("custom1"), Some(SAFE_PALETTE));
        assert_eq!(bank.get("custom2"), Some(SAFE_PALETTE));
        assert_ne!(bank.get("custom3"), Some(SAFE_PALETTE));
    }

    #[test]
    fn scripted_generation_is_exact() {
        let mut rng = Scripted::new(&[0.5, 0.5, 0.5, 0.0, 0.5, 0.5]);
        let base = random_color(&mut rng).unwrap();
        assert_eq!(base.to_string(), "hsl(180, 75%, 60%)");

        let partner = harmonious_color(base, &mut rng).unwrap();
        assert_eq!(partner.to_string(), "hsl(210, 75%, 60%)");
    }

    #[test]
    fn harmonious_color_wraps_and_clamps() {
        let base = HslColor::new(350.0, 100.0, 75.0);
        let partner = harmonious_color(base, &mut Scripted::new(&[0.0, 0.99, 0.99])).unwrap();
        assert_eq!(partner.hue, 20.0);
        assert_eq!(partner.saturation, 100.0);
        assert_eq!(partner.lightness, 75.0);

        let base = HslColor::new(10.0, 50.0, 40.0);
        let minus = harmonious_color(base, &mut Scripted::new(&[0.4, 0.0, 0.0])).unwrap();
        assert_eq!(minus.hue, 340.0);
        assert_eq!(minus.saturation, 50.0);
        assert_eq!(minus.lightness, 40.0);

        let base = HslColor::new(90.0, 70.0, 60.0);
        let complement = harmonious_color(base, &mut Scripted::new(&[0.9, 0.5, 0.5])).unwrap();
        assert_eq!(complement.hue, 270.0);
    }

    #[test]
    fn hsl_string_round_trip() {
        let color: HslColor = "hsl(210, 75%, 60%)".parse().unwrap();
        assert_eq!(color, HslColor::new(210.0, 75.0, 60.0));
        assert_eq!(color.to_rgb(), Rgb::from_hsl(210.0 / 360.0, 0.75, 0.6));

        let fractional = HslColor::new(12.0, 66.5, 47.25);
        assert_eq!(fractional.to_string(), "hsl(12, 66.5%, 47.25%)");

        assert!("hsl(10, 20, 30)".parse::<HslColor>().is_err());
        assert!("rgb(1, 2, 3)".parse::<HslColor>().is_err());
        assert!("hsl(1, 2%, 3%, 4%)".parse::<HslColor>().is_err());
    }

    #[test]
    fn to_rgb_sanitizes_components() {
        let wild = HslColor::new(-30.0, 250.0, f32::NAN);
        assert_eq!(wild.to_rgb(), Rgb::from_hsl(330.0 / 360.0, 1.0, 0.0));
    }
}
