//! Serializable editor settings.
//!
//! [`Settings`] captures every user-adjustable knob of the composition in a
//! format that can be serialized to JSON, stored next to a project, or passed
//! between a UI process and a rendering process.
//!
//! # Example
//!
//! ```
//! use snapbeautify_renderer::{AspectRatio, ExportFormat, Settings};
//!
//! let settings = Settings::new()
//!     .with_padding(64.0)
//!     .with_aspect_ratio(AspectRatio::Widescreen)
//!     .with_export_format(ExportFormat::Webp);
//!
//! let json = settings.to_json().unwrap();
//! let restored = Settings::from_json(&json).unwrap();
//! assert_eq!(restored, settings);
//! ```

use serde::{Deserialize, Serialize};

use crate::preset::DEFAULT_PRESET_KEY;

/// Upper bound of the shadow slider.
pub const MAX_SHADOW_INTENSITY: f32 = 30.0;

/// Upper bound of the corner radius slider.
pub const MAX_CORNER_RADIUS: f32 = 40.0;

// ============================================================================
// Enumerations
// ============================================================================

/// Which palette source feeds the background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum BackgroundMode {
    /// The built-in named presets.
    #[default]
    Preset,
    /// The randomly generated custom presets.
    CustomPreset,
    /// Gradients derived from the loaded image.
    ImageExtracted,
}

/// Aspect ratio of the preview frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum AspectRatio {
    /// Frame fills the available viewport.
    #[default]
    #[serde(rename = "auto")]
    Auto,
    #[serde(rename = "16/9")]
    #[cfg_attr(feature = "clap", value(name = "16/9"))]
    Widescreen,
    #[serde(rename = "4/3")]
    #[cfg_attr(feature = "clap", value(name = "4/3"))]
    Standard,
    #[serde(rename = "3/2")]
    #[cfg_attr(feature = "clap", value(name = "3/2"))]
    Photo,
    #[serde(rename = "1/1")]
    #[cfg_attr(feature = "clap", value(name = "1/1"))]
    Square,
    #[serde(rename = "2/3")]
    #[cfg_attr(feature = "clap", value(name = "2/3"))]
    PhotoPortrait,
    #[serde(rename = "9/16")]
    #[cfg_attr(feature = "clap", value(name = "9/16"))]
    Story,
    #[serde(rename = "4/5")]
    #[cfg_attr(feature = "clap", value(name = "4/5"))]
    Portrait,
}

impl AspectRatio {
    /// Returns `(width, height)` parts of the ratio, or `None` for `Auto`.
    pub fn parts(self) -> Option<(u32, u32)> {
        match self {
            Self::Auto => None,
            Self::Widescreen => Some((16, 9)),
            Self::Standard => Some((4, 3)),
            Self::Photo => Some((3, 2)),
            Self::Square => Some((1, 1)),
            Self::PhotoPortrait => Some((2, 3)),
            Self::Story => Some((9, 16)),
            Self::Portrait => Some((4, 5)),
        }
    }

    /// Returns width divided by height, or `None` for `Auto`.
    pub fn ratio(self) -> Option<f32> {
        self.parts().map(|(w, h)| w as f32 / h as f32)
    }

    /// Display label such as `16:9` or `Auto`.
    pub fn label(self) -> String {
        match self.parts() {
            Some((w, h)) => format!("{w}:{h}"),
            None => "Auto".to_string(),
        }
    }
}

/// Output encoding for exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum ExportFormat {
    #[default]
    Png,
    Jpg,
    Webp,
}

impl ExportFormat {
    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpg => "jpg",
            Self::Webp => "webp",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpg => "image/jpeg",
            Self::Webp => "image/webp",
        }
    }

    /// Encoder quality in `0.0..=1.0`, or `None` for lossless formats.
    pub fn quality(self) -> Option<f32> {
        match self {
            Self::Png => None,
            Self::Jpg | Self::Webp => Some(0.9),
        }
    }

    /// The download file name for this format.
    pub fn file_name(self) -> String {
        format!("snapbeautify-export.{}", self.extension())
    }
}

// ============================================================================
// Settings
// ============================================================================

/// The live editor settings.
///
/// # JSON Format
///
/// ```json
/// {
///   "padding": 120.0,
///   "shadowIntensity": 20.0,
///   "cornerRadius": 20.0,
///   "backgroundMode": "preset",
///   "selectedPresetKey": "midnight",
///   "selectedGradientIndex": 0,
///   "aspectRatio": "auto",
///   "exportFormat": "png"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct Settings {
    /// Space between the subject and the frame edge, in logical pixels.
    pub padding: f32,

    /// Shadow strength (0-30); drives blur radius and offset.
    pub shadow_intensity: f32,

    /// Corner radius of the subject (0-40), in logical pixels.
    pub corner_radius: f32,

    /// Which palette source is active.
    pub background_mode: BackgroundMode,

    /// Key into the active preset bank. Ignored in `ImageExtracted` mode.
    pub selected_preset_key: String,

    /// Index into the extracted palette list. Only used in `ImageExtracted` mode.
    pub selected_gradient_index: usize,

    pub aspect_ratio: AspectRatio,

    pub export_format: ExportFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            padding: 120.0,
            shadow_intensity: 20.0,
            corner_radius: 20.0,
            background_mode: BackgroundMode::Preset,
            selected_preset_key: DEFAULT_PRESET_KEY.to_string(),
            selected_gradient_index: 0,
            aspect_ratio: AspectRatio::Auto,
            export_format: ExportFormat::Png,
        }
    }
}

impl Settings {
    /// Creates settings with the editor defaults.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_padding(mut self, padding: f32) -> Self {
        self.padding = clamp_padding(padding);
        self
    }

    pub fn with_shadow_intensity(mut self, intensity: f32) -> Self {
        self.shadow_intensity = clamp_shadow(intensity);
        self
    }

    pub fn with_corner_radius(mut self, radius: f32) -> Self {
        self.corner_radius = clamp_radius(radius);
        self
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: AspectRatio) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    pub fn with_export_format(mut self, format: ExportFormat) -> Self {
        self.export_format = format;
        self
    }

    /// Selects a preset key and the bank it belongs to.
    pub fn with_preset(mut self, mode: BackgroundMode, key: impl Into<String>) -> Self {
        self.background_mode = mode;
        self.selected_preset_key = key.into();
        self
    }

    /// Selects an extracted gradient by index.
    pub fn with_extracted_gradient(mut self, index: usize) -> Self {
        self.background_mode = BackgroundMode::ImageExtracted;
        self.selected_gradient_index = index;
        self
    }

    /// Returns a copy with every numeric field forced into its valid range.
    pub fn sanitized(mut self) -> Self {
        self.padding = clamp_padding(self.padding);
        self.shadow_intensity = clamp_shadow(self.shadow_intensity);
        self.corner_radius = clamp_radius(self.corner_radius);
        self
    }

    /// Serializes the settings to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serializes the settings to a pretty-printed JSON string.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserializes settings from a JSON string. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Returns a copy with the fields present in `json` replaced. Fields the
    /// document leaves out keep their current values.
    pub fn with_json_overrides(&self, json: &str) -> Result<Self, serde_json::Error> {
        let mut merged = serde_json::to_value(self)?;
        let overrides: serde_json::Value = serde_json::from_str(json)?;
        match (merged.as_object_mut(), overrides) {
            (Some(fields), serde_json::Value::Object(set)) => fields.extend(set),
            _ => {
                return Err(<serde_json::Error as serde::de::Error>::custom(
                    "settings must be a JSON object",
                ));
            }
        }
        serde_json::from_value(merged)
    }
}

pub(crate) fn clamp_padding(padding: f32) -> f32 {
    if padding.is_finite() { padding.max(0.0) } else { 0.0 }
}

pub(crate) fn clamp_shadow(intensity: f32) -> f32 {
    if intensity.is_finite() {
        intensity.clamp(0.0, MAX_SHADOW_INTENSITY)
    } else {
        0.0
    }
}

pub(crate) fn clamp_radius(radius: f32) -> f32 {
    if radius.is_finite() {
        radius.clamp(0.0, MAX_CORNER_RADIUS)
    } else {
        0.0
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_editor() {
        let settings = Settings::default();
        assert_eq!(settings.padding, 120.0);
        assert_eq!(settings.shadow_intensity, 20.0);
        assert_eq!(settings.corner_radius, 20.0);
        assert_eq!(settings.selected_preset_key, "midnight");
        assert_eq!(settings.background_mode, BackgroundMode::Preset);
        assert_eq!(settings.export_format, ExportFormat::Png);
    }

    #[test]
    fn settings_json_format() {
        let settings = Settings::new().with_aspect_ratio(AspectRatio::Story);
        let json = settings.to_json_pretty().unwrap();

        assert!(json.contains("\"shadowIntensity\""));
        assert!(json.contains("\"selectedPresetKey\""));
        assert!(json.contains("\"9/16\""));
        assert!(json.contains("\"png\""));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let settings =
            Settings::from_json(r#"{"padding": 10, "backgroundMode": "imageExtracted"}"#).unwrap();
        assert_eq!(settings.padding, 10.0);
        assert_eq!(settings.background_mode, BackgroundMode::ImageExtracted);
        assert_eq!(settings.corner_radius, 20.0);
        assert_eq!(settings.aspect_ratio, AspectRatio::Auto);
    }

    #[test]
    fn json_overrides_keep_unset_fields() {
        let current = Settings::new().with_extracted_gradient(2).with_padding(64.0);

        let merged = current.with_json_overrides(r#"{"cornerRadius": 8}"#).unwrap();
        assert_eq!(merged.corner_radius, 8.0);
        assert_eq!(merged.padding, 64.0);
        assert_eq!(merged.background_mode, BackgroundMode::ImageExtracted);
        assert_eq!(merged.selected_gradient_index, 2);

        let preset = current
            .with_json_overrides(r#"{"backgroundMode": "preset", "selectedPresetKey": "peach"}"#)
            .unwrap();
        assert_eq!(preset.background_mode, BackgroundMode::Preset);
        assert_eq!(preset.selected_preset_key, "peach");

        assert!(current.with_json_overrides("[1, 2]").is_err());
        assert!(current.with_json_overrides(r#"{"exportFormat": "gif"}"#).is_err());
    }

    #[test]
    fn empty_json_deserializes() {
        let settings = Settings::from_json("{}").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn builders_clamp_ranges() {
        let settings = Settings::new()
            .with_padding(-5.0)
            .with_shadow_intensity(99.0)
            .with_corner_radius(f32::NAN);
        assert_eq!(settings.padding, 0.0);
        assert_eq!(settings.shadow_intensity, MAX_SHADOW_INTENSITY);
        assert_eq!(settings.corner_radius, 0.0);
    }

    #[test]
    fn sanitized_clamps_deserialized_values() {
        let settings = Settings::from_json(r#"{"cornerRadius": 400, "shadowIntensity": -3}"#)
            .unwrap()
            .sanitized();
        assert_eq!(settings.corner_radius, MAX_CORNER_RADIUS);
        assert_eq!(settings.shadow_intensity, 0.0);
    }

    #[test]
    fn export_format_metadata() {
        assert_eq!(ExportFormat::Jpg.mime_type(), "image/jpeg");
        assert_eq!(ExportFormat::Webp.file_name(), "snapbeautify-export.webp");
        assert_eq!(ExportFormat::Png.quality(), None);
        assert_eq!(ExportFormat::Jpg.quality(), Some(0.9));
    }

    #[test]
    fn aspect_ratio_parts() {
        assert_eq!(AspectRatio::Auto.ratio(), None);
        assert_eq!(AspectRatio::Portrait.parts(), Some((4, 5)));
        assert_eq!(AspectRatio::Widescreen.label(), "16:9");
        assert_eq!(AspectRatio::Auto.label(), "Auto");
    }
}
