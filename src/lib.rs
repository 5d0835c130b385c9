//! snapbeautify-renderer: screenshot beautification library
//!
//! This crate frames a screenshot (or a code snippet) on a padded background,
//! with rounded corners and a drop shadow, and exports the result as a
//! high-resolution PNG, JPEG or WebP.
//!
//! Backgrounds come from three palette sources: a built-in preset bank, a
//! bank of randomly generated harmonious gradients, and gradients extracted
//! from the loaded image's own colors.
//!
//! # Example
//!
//! ```
//! use snapbeautify_renderer::{AspectRatio, EditorSession, ExportFormat, SizeF};
//!
//! let mut session = EditorSession::new();
//! session.show_code(None);
//! session.set_aspect_ratio(AspectRatio::Widescreen);
//! session.set_export_format(ExportFormat::Webp);
//! session.select_preset("oceanBreeze");
//!
//! // The caller measures the preview; here a 1280x720 viewport.
//! let layout = session.measure(SizeF::new(1280.0, 720.0));
//!
//! let mut downloads = Vec::new();
//! let file = session.export(&layout, 2.0, &mut downloads).unwrap();
//! assert_eq!(file.file_name, "snapbeautify-export.webp");
//! ```
//!
//! # Serializable Settings
//!
//! [`Settings`] round-trips through JSON, so a front end can persist or
//! hand over the whole editor state:
//!
//! ```
//! use snapbeautify_renderer::{EditorSession, Settings};
//!
//! let settings = Settings::from_json(r#"{ "padding": 64, "cornerRadius": 12 }"#).unwrap();
//!
//! let mut session = EditorSession::new();
//! session.apply_settings(settings);
//! assert_eq!(session.settings().padding, 64.0);
//!
//! let json = session.settings().to_json().unwrap();
//! assert!(json.contains("\"cornerRadius\":12.0"));
//! ```

mod background;
mod color;
mod composition;
mod editor;
mod error;
mod export;
mod extract;
mod preset;
mod preview;
pub mod raster;
mod settings;
mod subject;

pub use background::{Background, GRADIENT_ANGLE_DEG, PaletteSources, resolve_background};
pub use color::{Palette, Rgb};
pub use composition::{
    CodeBlock, CodeLine, Composition, PreviewLayout, RectF, ShadowSpec, SizeF, SubjectPlacement,
    rounded_rect_path,
};
pub use editor::{EditorSession, LoadOutcome, LoadTicket};
pub use error::{
    Action, ClipboardError, ColorParseError, DecodeError, EditorError, EncodeError, HslParseError,
    RenderError,
};
#[cfg(feature = "clipboard")]
pub use export::SystemClipboard;
pub use export::{
    ActionLatch, ClipboardImage, ClipboardPolicy, ClipboardSink, DownloadSink, ExportedFile,
    FileDownload, LatchGuard,
};
pub use extract::{ColorAnalysis, extract_palettes};
pub use preset::{
    CUSTOM_PRESET_COUNT, DEFAULT_PRESET_KEY, HslColor, PresetBank, RandomSource, SAFE_PALETTE,
    generate_custom_presets, harmonious_color, random_color,
};
pub use preview::{PreviewCache, PreviewKey};
pub use settings::{
    AspectRatio, BackgroundMode, ExportFormat, MAX_CORNER_RADIUS, MAX_SHADOW_INTENSITY, Settings,
};
pub use subject::{CodeSubject, DEFAULT_CODE_SNIPPET, ImageSubject, Subject, SubjectId};
