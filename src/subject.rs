//! The subject being beautified: a decoded image or a code snippet.

use image::RgbaImage;

use crate::error::DecodeError;

/// The demo snippet shown when code mode is switched on.
pub const DEFAULT_CODE_SNIPPET: &str = "function hello() {\n  console.log('Hello World!')\n}";

/// Identity of an installed subject.
///
/// Every load gets a fresh id, so results computed for an earlier subject can
/// be recognised and discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubjectId(pub(crate) u64);

impl SubjectId {
    pub fn get(self) -> u64 {
        self.0
    }
}

// ============================================================================
// ImageSubject
// ============================================================================

/// A decoded bitmap in RGBA format.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSubject {
    /// The decoded pixels. Never modified after decode.
    pub pixels: RgbaImage,
}

impl ImageSubject {
    /// Wraps an already decoded bitmap.
    ///
    /// Returns an error if either dimension is zero.
    pub fn new(pixels: RgbaImage) -> Result<Self, DecodeError> {
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(DecodeError::ZeroSized);
        }
        Ok(Self { pixels })
    }

    /// Decodes image bytes in any format the `image` crate understands.
    ///
    /// The format is sniffed from the data itself; the caller's MIME type is
    /// not consulted.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::Empty);
        }
        let pixels = image::load_from_memory(bytes)?.to_rgba8();
        Self::new(pixels)
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Returns the natural size as floats, for layout math.
    pub fn natural_size(&self) -> (f32, f32) {
        (self.pixels.width() as f32, self.pixels.height() as f32)
    }
}

// ============================================================================
// CodeSubject
// ============================================================================

/// A code snippet rendered inside a dark, rounded block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeSubject {
    pub text: String,
}

impl CodeSubject {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Returns the text split into display lines. Tabs become two spaces.
    pub fn lines(&self) -> Vec<String> {
        self.text
            .lines()
            .map(|line| line.replace('\t', "  "))
            .collect()
    }

    pub fn line_count(&self) -> usize {
        self.text.lines().count()
    }
}

impl Default for CodeSubject {
    fn default() -> Self {
        Self::new(DEFAULT_CODE_SNIPPET)
    }
}

// ============================================================================
// Subject
// ============================================================================

/// The single active subject of an editor session.
#[derive(Debug, Clone, PartialEq)]
pub enum Subject {
    Image(ImageSubject),
    Code(CodeSubject),
}

impl Subject {
    pub fn as_image(&self) -> Option<&ImageSubject> {
        match self {
            Self::Image(image) => Some(image),
            Self::Code(_) => None,
        }
    }

    pub fn as_code(&self) -> Option<&CodeSubject> {
        match self {
            Self::Code(code) => Some(code),
            Self::Image(_) => None,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Self::Image(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba(color));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn decode_png() {
        let subject = ImageSubject::decode(&png_bytes(30, 20, [255, 0, 0, 255])).unwrap();
        assert_eq!(subject.width(), 30);
        assert_eq!(subject.height(), 20);
        assert_eq!(subject.pixels.get_pixel(5, 5).0, [255, 0, 0, 255]);
        assert_eq!(subject.natural_size(), (30.0, 20.0));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(ImageSubject::decode(&[]), Err(DecodeError::Empty)));
        assert!(matches!(
            ImageSubject::decode(b"definitely not an image"),
            Err(DecodeError::Image(_))
        ));
    }

    #[test]
    fn zero_sized_bitmap_rejected() {
        assert!(matches!(
            ImageSubject::new(RgbaImage::new(0, 10)),
            Err(DecodeError::ZeroSized)
        ));
    }

    #[test]
    fn code_subject_lines() {
        let code = CodeSubject::default();
        assert_eq!(code.line_count(), 3);
        assert_eq!(
            code.lines(),
            vec![
                "function hello() {".to_string(),
                "  console.log('Hello World!')".to_string(),
                "}".to_string(),
            ]
        );

        let tabbed = CodeSubject::new("if x {\n\treturn;\n}");
        assert_eq!(tabbed.lines()[1], "  return;");
    }

    #[test]
    fn subject_accessors() {
        let subject = Subject::Code(CodeSubject::default());
        assert!(subject.as_code().is_some());
        assert!(subject.as_image().is_none());
        assert!(!subject.is_image());
    }
}
