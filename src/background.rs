//! Resolves the live settings into the background that gets painted.

use log::warn;

use crate::color::{Palette, Rgb};
use crate::preset::{DEFAULT_PRESET_KEY, PresetBank};
use crate::settings::{BackgroundMode, Settings};

/// Angle of every background gradient, in CSS degrees.
pub const GRADIENT_ANGLE_DEG: f32 = 135.0;

/// Palette of last resort when neither bank has the default key.
const MIDNIGHT: Palette = Palette::new(Rgb::from_u32(0x1c2440), Rgb::from_u32(0x2a3c70));

// ============================================================================
// Background
// ============================================================================

/// What fills the frame behind the subject.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Background {
    /// Nothing is painted.
    Transparent,
    Solid(Rgb),
    /// A two-stop gradient following CSS `linear-gradient` angle semantics.
    LinearGradient { from: Rgb, to: Rgb, angle_deg: f32 },
}

impl Background {
    /// Builds the background for a palette. Equal stops collapse to a solid fill.
    pub fn from_palette(palette: Palette) -> Self {
        if palette.is_solid() {
            Self::Solid(palette.from)
        } else {
            Self::LinearGradient {
                from: palette.from,
                to: palette.to,
                angle_deg: GRADIENT_ANGLE_DEG,
            }
        }
    }

    /// CSS `background` value for a markup preview layer.
    pub fn css(&self) -> String {
        match self {
            Self::Transparent => "transparent".to_string(),
            Self::Solid(color) => color.to_hex(),
            Self::LinearGradient { from, to, angle_deg } => {
                format!("linear-gradient({angle_deg}deg, {from}, {to})")
            }
        }
    }

    /// Start and end points of the gradient line inside a `width x height` box.
    ///
    /// The line passes through the center and its length is
    /// `|w * sin a| + |h * cos a|`, so the corners land exactly on the first
    /// and last stop the way a browser draws it. Returns `None` for
    /// non-gradient backgrounds.
    pub fn gradient_line(&self, width: f32, height: f32) -> Option<((f32, f32), (f32, f32))> {
        let Self::LinearGradient { angle_deg, .. } = self else {
            return None;
        };
        let angle = angle_deg.to_radians();
        let (dx, dy) = (angle.sin(), -angle.cos());
        let half = ((width * dx).abs() + (height * dy).abs()) / 2.0;
        let (cx, cy) = (width / 2.0, height / 2.0);
        Some((
            (cx - dx * half, cy - dy * half),
            (cx + dx * half, cy + dy * half),
        ))
    }

    pub fn is_transparent(&self) -> bool {
        matches!(self, Self::Transparent)
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// The palette sources a background can be drawn from.
#[derive(Debug, Clone, Copy)]
pub struct PaletteSources<'a> {
    pub static_bank: &'a PresetBank,
    pub custom_bank: &'a PresetBank,
    pub extracted: &'a [Palette],
}

/// Picks the background for the current settings.
///
/// Without a subject nothing is painted. In extracted mode an out-of-range
/// index falls back to the first gradient, and an empty list falls back to
/// the static `midnight` preset. A missing preset key falls back to
/// `midnight` in the active bank, then in the static bank.
pub fn resolve_background(
    settings: &Settings,
    has_subject: bool,
    sources: PaletteSources<'_>,
) -> Background {
    if !has_subject {
        return Background::Transparent;
    }
    Background::from_palette(resolve_palette(settings, sources))
}

fn resolve_palette(settings: &Settings, sources: PaletteSources<'_>) -> Palette {
    let bank = match settings.background_mode {
        BackgroundMode::ImageExtracted => {
            let index = settings.selected_gradient_index;
            return match sources.extracted.get(index).or(sources.extracted.first()) {
                Some(palette) => *palette,
                None => static_midnight(sources.static_bank),
            };
        }
        BackgroundMode::CustomPreset => sources.custom_bank,
        BackgroundMode::Preset => sources.static_bank,
    };

    let key = settings.selected_preset_key.as_str();
    if let Some(palette) = bank.get(key) {
        return palette;
    }
    warn!("preset {key:?} not found, falling back to {DEFAULT_PRESET_KEY}");
    bank.get(DEFAULT_PRESET_KEY)
        .unwrap_or_else(|| static_midnight(sources.static_bank))
}

fn static_midnight(static_bank: &PresetBank) -> Palette {
    static_bank.get(DEFAULT_PRESET_KEY).unwrap_or(MIDNIGHT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preset::{SAFE_PALETTE, generate_custom_presets};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn midnight() -> Background {
        Background::from_palette(MIDNIGHT)
    }

    fn fixture() -> (PresetBank, PresetBank, Vec<Palette>) {
        let custom = generate_custom_presets(&mut StdRng::seed_from_u64(3));
        let extracted = vec![
            Palette::new(Rgb::from_u32(0xff0000), Rgb::from_u32(0x00ffff)),
            Palette::new(Rgb::from_u32(0xff0000), Rgb::from_u32(0xff2b00)),
        ];
        (PresetBank::builtin(), custom, extracted)
    }

    #[test]
    fn no_subject_is_transparent() {
        let (static_bank, custom_bank, extracted) = fixture();
        let sources = PaletteSources {
            static_bank: &static_bank,
            custom_bank: &custom_bank,
            extracted: &extracted,
        };
        let bg = resolve_background(&Settings::default(), false, sources);
        assert!(bg.is_transparent());
        assert_eq!(bg.css(), "transparent");
    }

    #[test]
    fn extracted_mode_indexes_and_clamps() {
        let (static_bank, custom_bank, extracted) = fixture();
        let sources = PaletteSources {
            static_bank: &static_bank,
            custom_bank: &custom_bank,
            extracted: &extracted,
        };

        let second = Settings::new().with_extracted_gradient(1);
        assert_eq!(
            resolve_background(&second, true, sources),
            Background::from_palette(extracted[1])
        );

        let out_of_range = Settings::new().with_extracted_gradient(9);
        assert_eq!(
            resolve_background(&out_of_range, true, sources),
            Background::from_palette(extracted[0])
        );
    }

    #[test]
    fn extracted_mode_without_palettes_uses_midnight() {
        let (static_bank, custom_bank, _) = fixture();
        let sources = PaletteSources {
            static_bank: &static_bank,
            custom_bank: &custom_bank,
            extracted: &[],
        };
        let settings = Settings::new().with_extracted_gradient(0);
        assert_eq!(resolve_background(&settings, true, sources), midnight());
    }

    #[test]
    fn preset_modes_use_their_bank() {
        let (static_bank, custom_bank, extracted) = fixture();
        let sources = PaletteSources {
            static_bank: &static_bank,
            custom_bank: &custom_bank,
            extracted: &extracted,
        };

        let peach = Settings::new().with_preset(BackgroundMode::Preset, "peach");
        assert_eq!(
            resolve_background(&peach, true, sources).css(),
            "linear-gradient(135deg, #ffb076, #ff9a5a)"
        );

        let custom = Settings::new().with_preset(BackgroundMode::CustomPreset, "custom4");
        assert_eq!(
            resolve_background(&custom, true, sources),
            Background::from_palette(custom_bank.get("custom4").unwrap())
        );
    }

    #[test]
    fn missing_keys_fall_back_to_midnight() {
        let (static_bank, custom_bank, extracted) = fixture();
        let sources = PaletteSources {
            static_bank: &static_bank,
            custom_bank: &custom_bank,
            extracted: &extracted,
        };

        let unknown = Settings::new().with_preset(BackgroundMode::Preset, "nope");
        assert_eq!(resolve_background(&unknown, true, sources), midnight());

        // The custom bank has no midnight, so the static one is used.
        let unknown_custom = Settings::new().with_preset(BackgroundMode::CustomPreset, "peach");
        assert_eq!(resolve_background(&unknown_custom, true, sources), midnight());

        let empty = PresetBank::new();
        let bare = PaletteSources {
            static_bank: &empty,
            custom_bank: &empty,
            extracted: &[],
        };
        assert_eq!(resolve_background(&unknown, true, bare), midnight());
    }

    #[test]
    fn equal_stops_render_solid() {
        assert_eq!(
            Background::from_palette(Palette::new(SAFE_PALETTE.from, SAFE_PALETTE.from)),
            Background::Solid(SAFE_PALETTE.from)
        );
        assert_eq!(Background::Solid(Rgb::from_u32(0x123456)).css(), "#123456");
    }

    #[test]
    fn gradient_line_spans_corners() {
        let bg = midnight();
        let ((x0, y0), (x1, y1)) = bg.gradient_line(200.0, 100.0).unwrap();
        // 135deg runs from the top-left toward the bottom-right.
        assert!(x0 < x1 && y0 < y1);
        assert!(((x0 + x1) / 2.0 - 100.0).abs() < 1e-3);
        assert!(((y0 + y1) / 2.0 - 50.0).abs() < 1e-3);

        let expected = (200.0 + 100.0) * std::f32::consts::FRAC_1_SQRT_2;
        let length = ((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt();
        assert!((length - expected).abs() < 1e-2);

        assert!(Background::Solid(Rgb::new(0, 0, 0)).gradient_line(10.0, 10.0).is_none());
    }
}
