//! Error taxonomy for loading, rendering, encoding and delivery.
//!
//! Every failure surfaces at an [`EditorSession`](crate::EditorSession)
//! entry point as an [`EditorError`], which knows how to describe itself to
//! the user.

use thiserror::Error;

use crate::settings::ExportFormat;

/// A string that is not a `#rgb` or `#rrggbb` color.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid hex color: {input:?}")]
pub struct ColorParseError {
    pub input: String,
}

impl ColorParseError {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// A string that is not a CSS `hsl(h, s%, l%)` color.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid hsl color: {input:?}")]
pub struct HslParseError {
    pub input: String,
}

/// The input bytes could not be turned into a bitmap.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("image data is empty")]
    Empty,

    #[error("image has zero width or height")]
    ZeroSized,

    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),
}

/// Drawing could not be completed.
#[derive(Debug, Error)]
pub enum RenderError {
    /// There is nothing to draw.
    #[error("no subject to render")]
    NoSubject,

    /// A raster surface of the requested size could not be allocated.
    #[error("could not allocate a {width}x{height} surface")]
    SurfaceUnavailable { width: u32, height: u32 },

    /// A measurement the layout collaborator must supply is missing.
    #[error("missing layout measurement: {0}")]
    MissingLayout(&'static str),
}

/// The finished surface could not be encoded.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("failed to encode {format:?}: {source}")]
    Image {
        format: ExportFormat,
        #[source]
        source: image::ImageError,
    },

    #[error("surface dimensions do not match its pixel buffer")]
    BufferMismatch,
}

/// The clipboard refused the image.
#[derive(Debug, Error)]
pub enum ClipboardError {
    /// Copy is not offered for this export format.
    #[error("copying is not available for {0:?} exports")]
    FormatNotAllowed(ExportFormat),

    /// No clipboard could be opened.
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),

    /// The clipboard was opened but rejected the write.
    #[error("clipboard write failed: {0}")]
    WriteFailed(String),
}

/// Which guarded action an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Export,
    Copy,
}

/// An error returned from an editor operation.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("no image loaded and code mode is off")]
    NoSubject,

    #[error("{0:?} already in progress")]
    Busy(Action),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Clipboard(#[from] ClipboardError),

    #[error("failed to deliver export: {0}")]
    Download(#[from] std::io::Error),
}

impl EditorError {
    /// Returns the message shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            Self::NoSubject | Self::Render(RenderError::NoSubject) => {
                "Please upload an image first or enable code mode".to_string()
            }
            Self::Busy(Action::Export) => "An export is already in progress".to_string(),
            Self::Busy(Action::Copy) => "A copy is already in progress".to_string(),
            Self::Decode(_) => "Error loading image. Please try another image.".to_string(),
            Self::Render(_) | Self::Encode(_) | Self::Download(_) => {
                "There was an error generating your image. Please try again.".to_string()
            }
            Self::Clipboard(ClipboardError::FormatNotAllowed(format)) => format!(
                "Copy to clipboard is not available for {} exports",
                format.extension()
            ),
            Self::Clipboard(_) => "Failed to copy image to clipboard. This feature may not be \
                                   supported on this system."
                .to_string(),
        }
    }

    /// Returns true if the subject is still valid and retrying makes sense.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Busy(_) | Self::Encode(_) | Self::Clipboard(_) | Self::Download(_)
        )
    }
}
