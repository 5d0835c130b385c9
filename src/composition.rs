//! Geometry of a finished frame: container size, subject placement, clip and
//! shadow.
//!
//! The preview layout is measured once by [`PreviewLayout::measure`] and then
//! turned into a [`Composition`], which is the only thing the rasterizer reads.
//! Preview and export share the same value, so they cannot drift apart.

use resvg::tiny_skia::{Path, PathBuilder};

use crate::background::Background;
use crate::color::Rgb;
use crate::error::RenderError;
use crate::settings::{AspectRatio, Settings, clamp_padding, clamp_radius, clamp_shadow};
use crate::subject::{CodeSubject, Subject};

/// Share of the viewport width a fixed-ratio frame may use.
pub const FRAME_MAX_WIDTH: f32 = 0.95;

/// Share of the viewport height a fixed-ratio frame, or a displayed image, may use.
pub const FRAME_MAX_HEIGHT: f32 = 0.8;

/// Height of a code block with up to [`CODE_BASE_LINES`] lines.
pub const CODE_BLOCK_MIN_HEIGHT: f32 = 120.0;

/// Lines that fit in the minimum code block height.
pub const CODE_BASE_LINES: usize = 3;

/// Vertical distance between code baselines.
pub const CODE_LINE_HEIGHT: f32 = 30.0;

/// Horizontal inset of code text from the block edge.
pub const CODE_TEXT_INSET: f32 = 20.0;

pub const CODE_FONT_SIZE: f32 = 14.0;

pub const CODE_FONT_FAMILY: &str = "SF Mono, ui-monospace, monospace";

const CODE_BLOCK_FILL: Rgb = Rgb::new(30, 30, 35);
const CODE_BLOCK_OPACITY: f32 = 0.9;
const CODE_TEXT_COLOR: Rgb = Rgb::from_u32(0xffffff);
const CODE_ACCENT_COLOR: Rgb = Rgb::from_u32(0xffcc00);

// ============================================================================
// SizeF / RectF
// ============================================================================

/// A size in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SizeF {
    pub width: f32,
    pub height: f32,
}

impl SizeF {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Returns true unless both sides are finite and positive.
    pub fn is_empty(&self) -> bool {
        let positive = |v: f32| v.is_finite() && v > 0.0;
        !(positive(self.width) && positive(self.height))
    }

    /// Scales down (never up) to fit inside `bounds`, keeping the aspect ratio.
    pub fn fit_within(self, bounds: SizeF) -> SizeF {
        if self.is_empty() {
            return SizeF::default();
        }
        let scale = (bounds.width.max(0.0) / self.width)
            .min(bounds.height.max(0.0) / self.height)
            .min(1.0);
        SizeF::new(self.width * scale, self.height * scale)
    }
}

/// An axis-aligned rectangle in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RectF {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl RectF {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_size(size: SizeF) -> Self {
        Self::new(0.0, 0.0, size.width, size.height)
    }

    /// A rectangle of `size` centered inside `container`.
    pub fn centered(container: SizeF, size: SizeF) -> Self {
        Self::new(
            (container.width - size.width) / 2.0,
            (container.height - size.height) / 2.0,
            size.width,
            size.height,
        )
    }

    pub fn size(&self) -> SizeF {
        SizeF::new(self.width, self.height)
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

// ============================================================================
// Layout
// ============================================================================

impl AspectRatio {
    /// Size of the preview frame inside `viewport`.
    ///
    /// `Auto` fills the viewport. A fixed ratio yields the largest box of that
    /// ratio within 95% of the viewport width and 80% of its height.
    pub fn frame(self, viewport: SizeF) -> SizeF {
        let Some(ratio) = self.ratio() else {
            return viewport;
        };
        let max_width = viewport.width * FRAME_MAX_WIDTH;
        let max_height = viewport.height * FRAME_MAX_HEIGHT;
        let width = max_width.min(max_height * ratio).max(0.0);
        SizeF::new(width, width / ratio)
    }
}

/// Measurements taken from the preview, as the layout collaborator sees them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewLayout {
    /// Size of the framed preview container.
    pub container: SizeF,
    /// On-screen size of the image subject, if one is shown.
    pub displayed_image: Option<SizeF>,
}

impl PreviewLayout {
    pub fn new(container: SizeF) -> Self {
        Self {
            container,
            displayed_image: None,
        }
    }

    pub fn with_displayed_image(mut self, size: SizeF) -> Self {
        self.displayed_image = Some(size);
        self
    }

    /// Lays the preview out inside `viewport`.
    ///
    /// The container comes from the aspect ratio. An image is shown at its
    /// natural size, shrunk to fit the container minus `padding` on each side
    /// and capped at 80% of the viewport height.
    pub fn measure(viewport: SizeF, settings: &Settings, subject: Option<&Subject>) -> Self {
        let container = settings.aspect_ratio.frame(viewport);
        let layout = Self::new(container);

        let Some(image) = subject.and_then(Subject::as_image) else {
            return layout;
        };

        let padding = clamp_padding(settings.padding);
        let available = SizeF::new(
            container.width - 2.0 * padding,
            (container.height - 2.0 * padding).min(viewport.height * FRAME_MAX_HEIGHT),
        );
        let (width, height) = image.natural_size();
        layout.with_displayed_image(SizeF::new(width, height).fit_within(available))
    }
}

// ============================================================================
// Shadow
// ============================================================================

/// A drop shadow in canvas terms: blur is the CSS blur radius, so the
/// Gaussian sigma is half of it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowSpec {
    pub color: Rgb,
    pub opacity: f32,
    pub blur: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl ShadowSpec {
    /// Shadow behind an image subject, or `None` when intensity is zero.
    pub fn for_image(intensity: f32) -> Option<Self> {
        let intensity = clamp_shadow(intensity);
        (intensity > 0.0).then(|| Self {
            color: Rgb::new(0, 0, 0),
            opacity: 0.1,
            blur: intensity * 2.0,
            offset_x: 0.0,
            offset_y: intensity / 2.0,
        })
    }

    /// Fixed shadow behind the code block.
    pub fn code_block() -> Self {
        Self {
            color: Rgb::new(0, 0, 0),
            opacity: 0.3,
            blur: 20.0,
            offset_x: 0.0,
            offset_y: 5.0,
        }
    }

    pub fn sigma(&self) -> f32 {
        self.blur / 2.0
    }

    /// How far the shadow can reach past its shape, in logical pixels.
    pub fn extent(&self) -> f32 {
        (self.sigma() * 3.0 + self.offset_x.abs().max(self.offset_y.abs())).ceil()
    }
}

// ============================================================================
// Rounded Rect
// ============================================================================

/// Builds a rounded rectangle from straight edges and four quadratic corners.
///
/// The radius is clamped to half the shorter side. Returns `None` for empty
/// rectangles.
pub fn rounded_rect_path(rect: RectF, radius: f32) -> Option<Path> {
    if rect.size().is_empty() {
        return None;
    }
    let r = if radius.is_finite() { radius } else { 0.0 };
    let r = r.clamp(0.0, rect.width.min(rect.height) / 2.0);
    let RectF {
        x,
        y,
        width: w,
        height: h,
    } = rect;

    let mut pb = PathBuilder::new();
    pb.move_to(x + r, y);
    pb.line_to(x + w - r, y);
    pb.quad_to(x + w, y, x + w, y + r);
    pb.line_to(x + w, y + h - r);
    pb.quad_to(x + w, y + h, x + w - r, y + h);
    pb.line_to(x + r, y + h);
    pb.quad_to(x, y + h, x, y + h - r);
    pb.line_to(x, y + r);
    pb.quad_to(x, y, x + r, y);
    pb.close();
    pb.finish()
}

// ============================================================================
// Placement
// ============================================================================

/// One line of code text, positioned at its baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeLine {
    pub text: String,
    pub color: Rgb,
    pub x: f32,
    pub baseline: f32,
}

/// The dark rounded block a code subject is drawn in.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeBlock {
    pub rect: RectF,
    pub corner_radius: f32,
    pub fill: Rgb,
    pub fill_opacity: f32,
    pub shadow: ShadowSpec,
    pub lines: Vec<CodeLine>,
}

impl CodeBlock {
    /// Block height for a snippet with `line_count` lines.
    pub fn height_for(line_count: usize) -> f32 {
        let extra = line_count.saturating_sub(CODE_BASE_LINES);
        CODE_BLOCK_MIN_HEIGHT + extra as f32 * CODE_LINE_HEIGHT
    }

    fn layout(code: &CodeSubject, container: SizeF, padding: f32, corner_radius: f32) -> Self {
        let lines = code.lines();
        let height = Self::height_for(lines.len());
        let rect = RectF::new(
            padding,
            (container.height - height) / 2.0,
            (container.width - 2.0 * padding).max(0.0),
            height,
        );

        let lines = lines
            .into_iter()
            .enumerate()
            .map(|(i, text)| CodeLine {
                // Indented lines get the accent color.
                color: if text.starts_with(' ') {
                    CODE_ACCENT_COLOR
                } else {
                    CODE_TEXT_COLOR
                },
                text,
                x: rect.x + CODE_TEXT_INSET,
                baseline: rect.y + CODE_LINE_HEIGHT * (i + 1) as f32,
            })
            .collect();

        Self {
            rect,
            corner_radius,
            fill: CODE_BLOCK_FILL,
            fill_opacity: CODE_BLOCK_OPACITY,
            shadow: ShadowSpec::code_block(),
            lines,
        }
    }
}

/// Where and how the subject is drawn.
#[derive(Debug, Clone, PartialEq)]
pub enum SubjectPlacement {
    Image {
        rect: RectF,
        corner_radius: f32,
        shadow: Option<ShadowSpec>,
    },
    Code(CodeBlock),
}

// ============================================================================
// Composition
// ============================================================================

/// Everything needed to paint one frame, in logical pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    pub size: SizeF,
    pub background: Background,
    pub subject: SubjectPlacement,
}

impl Composition {
    /// Places `subject` inside the measured container.
    ///
    /// Fails with [`RenderError::MissingLayout`] if the container is empty or
    /// an image subject has no displayed size.
    pub fn new(
        settings: &Settings,
        background: Background,
        subject: &Subject,
        layout: &PreviewLayout,
    ) -> Result<Self, RenderError> {
        if layout.container.is_empty() {
            return Err(RenderError::MissingLayout("container size"));
        }
        let size = layout.container;
        let corner_radius = clamp_radius(settings.corner_radius);

        let subject = match subject {
            Subject::Image(_) => {
                let displayed = layout
                    .displayed_image
                    .ok_or(RenderError::MissingLayout("displayed image size"))?;
                SubjectPlacement::Image {
                    rect: RectF::centered(size, displayed),
                    corner_radius,
                    shadow: ShadowSpec::for_image(settings.shadow_intensity),
                }
            }
            Subject::Code(code) => SubjectPlacement::Code(CodeBlock::layout(
                code,
                size,
                clamp_padding(settings.padding),
                corner_radius,
            )),
        };

        Ok(Self {
            size,
            background,
            subject,
        })
    }
}
