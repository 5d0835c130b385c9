//! Rasterization of a [`Composition`] with tiny-skia.
//!
//! [`rasterize`] paints the background, then the subject, onto a surface of
//! `round(width * dpr) x round(height * dpr)` device pixels. The same routine
//! backs the live preview (at dpr 1) and every export.

pub mod code;
pub mod encode;
pub mod shadow;

use std::ops::{Deref, DerefMut};

use image::{Rgba, RgbaImage, imageops::FilterType};
use log::{debug, warn};
use resvg::tiny_skia::{
    Color, FillRule, FilterQuality, GradientStop, LinearGradient, Mask, Paint, Path, Pattern,
    Pixmap, PixmapPaint, Point, Rect, Shader, SpreadMode, Transform,
};

use crate::background::Background;
use crate::color::Rgb;
use crate::composition::{Composition, RectF, ShadowSpec, SubjectPlacement, rounded_rect_path};
use crate::error::RenderError;
use crate::subject::{ImageSubject, Subject};

// ============================================================================
// Canvas
// ============================================================================

#[derive(Clone)]
struct DrawState {
    transform: Transform,
    clip: Option<Mask>,
}

/// A pixmap plus a 2D-context style drawing state.
///
/// [`Canvas::save`] returns a guard; the transform and clip in effect before
/// the call come back when the guard is dropped.
pub struct Canvas {
    pixmap: Pixmap,
    state: DrawState,
    stack: Vec<DrawState>,
}

impl Canvas {
    /// Allocates a transparent canvas of `width x height` device pixels.
    pub fn new(width: u32, height: u32) -> Result<Self, RenderError> {
        let pixmap =
            Pixmap::new(width, height).ok_or(RenderError::SurfaceUnavailable { width, height })?;
        Ok(Self {
            pixmap,
            state: DrawState {
                transform: Transform::identity(),
                clip: None,
            },
            stack: Vec::new(),
        })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn transform(&self) -> Transform {
        self.state.transform
    }

    /// The horizontal device pixels per logical pixel.
    pub fn device_scale(&self) -> f32 {
        self.state.transform.sx
    }

    /// Pushes the drawing state. It is restored when the guard drops.
    pub fn save(&mut self) -> SavedState<'_> {
        self.stack.push(self.state.clone());
        SavedState { canvas: self }
    }

    fn restore(&mut self) {
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
    }

    pub fn scale(&mut self, sx: f32, sy: f32) {
        self.state.transform = self.state.transform.pre_scale(sx, sy);
    }

    pub fn translate(&mut self, tx: f32, ty: f32) {
        self.state.transform = self.state.transform.pre_translate(tx, ty);
    }

    /// Intersects the clip with `path`, given in current coordinates.
    pub fn clip_path(&mut self, path: &Path) {
        let transform = self.state.transform;
        match self.state.clip.as_mut() {
            Some(mask) => mask.intersect_path(path, FillRule::Winding, true, transform),
            None => {
                if let Some(mut mask) = Mask::new(self.pixmap.width(), self.pixmap.height()) {
                    mask.fill_path(path, FillRule::Winding, true, transform);
                    self.state.clip = Some(mask);
                }
            }
        }
    }

    pub fn fill_path(&mut self, path: &Path, paint: &Paint) {
        self.pixmap.fill_path(
            path,
            paint,
            FillRule::Winding,
            self.state.transform,
            self.state.clip.as_ref(),
        );
    }

    pub fn fill_rect(&mut self, rect: RectF, paint: &Paint) {
        if let Some(rect) = Rect::from_xywh(rect.x, rect.y, rect.width, rect.height) {
            self.pixmap
                .fill_rect(rect, paint, self.state.transform, self.state.clip.as_ref());
        }
    }

    /// Copies `src` at a device-pixel offset, ignoring the transform but
    /// honouring the clip.
    pub fn draw_pixmap_at(&mut self, x: i32, y: i32, src: &Pixmap) {
        self.pixmap.draw_pixmap(
            x,
            y,
            src.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            self.state.clip.as_ref(),
        );
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub(crate) fn pixmap_mut(&mut self) -> &mut Pixmap {
        &mut self.pixmap
    }

    pub fn into_pixmap(self) -> Pixmap {
        self.pixmap
    }
}

/// Guard returned by [`Canvas::save`].
pub struct SavedState<'a> {
    canvas: &'a mut Canvas,
}

impl Deref for SavedState<'_> {
    type Target = Canvas;

    fn deref(&self) -> &Canvas {
        self.canvas
    }
}

impl DerefMut for SavedState<'_> {
    fn deref_mut(&mut self) -> &mut Canvas {
        self.canvas
    }
}

impl Drop for SavedState<'_> {
    fn drop(&mut self) {
        self.canvas.restore();
    }
}

// ============================================================================
// Rasterize
// ============================================================================

/// Paints `composition` at `dpr` device pixels per logical pixel.
///
/// A non-finite or non-positive `dpr` is treated as 1.
pub fn rasterize(
    composition: &Composition,
    subject: &Subject,
    dpr: f32,
) -> Result<Pixmap, RenderError> {
    let dpr = sanitize_dpr(dpr);
    let (width, height) = device_size(composition.size.width, composition.size.height, dpr);
    debug!(
        "rasterizing {}x{} logical at dpr {dpr} -> {width}x{height}",
        composition.size.width, composition.size.height
    );

    let mut canvas = Canvas::new(width, height)?;
    canvas.scale(dpr, dpr);

    paint_background(&mut canvas, &composition.background, RectF::from_size(composition.size));

    match (&composition.subject, subject) {
        (SubjectPlacement::Code(block), _) => code::draw_code_block(&mut canvas, block),
        (
            SubjectPlacement::Image {
                rect,
                corner_radius,
                shadow,
            },
            Subject::Image(image),
        ) => draw_image_subject(&mut canvas, image, *rect, *corner_radius, shadow.as_ref(), dpr)?,
        (SubjectPlacement::Image { .. }, Subject::Code(_)) => {
            warn!("image placement without an image subject, drawing background only");
        }
    }

    Ok(canvas.into_pixmap())
}

fn sanitize_dpr(dpr: f32) -> f32 {
    if dpr.is_finite() && dpr > 0.0 { dpr } else { 1.0 }
}

/// Rounds a logical size to device pixels.
pub fn device_size(width: f32, height: f32, dpr: f32) -> (u32, u32) {
    let px = |v: f32| (v * dpr).round().max(0.0) as u32;
    (px(width), px(height))
}

fn paint_background(canvas: &mut Canvas, background: &Background, rect: RectF) {
    let Some(paint) = background_paint(background, rect) else {
        return;
    };
    canvas.fill_rect(rect, &paint);
}

/// Paint for a background covering `rect`, or `None` when transparent.
pub fn background_paint(background: &Background, rect: RectF) -> Option<Paint<'static>> {
    let mut paint = Paint::default();
    match background {
        Background::Transparent => return None,
        Background::Solid(color) => paint.set_color(opaque(*color)),
        Background::LinearGradient { from, to, .. } => {
            let ((x0, y0), (x1, y1)) = background.gradient_line(rect.width, rect.height)?;
            let shader = LinearGradient::new(
                Point::from_xy(rect.x + x0, rect.y + y0),
                Point::from_xy(rect.x + x1, rect.y + y1),
                vec![
                    GradientStop::new(0.0, opaque(*from)),
                    GradientStop::new(1.0, opaque(*to)),
                ],
                SpreadMode::Pad,
                Transform::identity(),
            )
            .unwrap_or_else(|| Shader::SolidColor(opaque(*from)));
            paint.shader = shader;
        }
    }
    Some(paint)
}

pub(crate) fn opaque(color: Rgb) -> Color {
    Color::from_rgba8(color.r, color.g, color.b, 255)
}

pub(crate) fn with_opacity(color: Rgb, opacity: f32) -> Color {
    let alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
    Color::from_rgba8(color.r, color.g, color.b, alpha)
}

/// Draws the image into its own layer (clip and shadow), then copies the layer
/// onto the canvas centered at `rect`.
fn draw_image_subject(
    canvas: &mut Canvas,
    image: &ImageSubject,
    rect: RectF,
    corner_radius: f32,
    shadow: Option<&ShadowSpec>,
    dpr: f32,
) -> Result<(), RenderError> {
    if rect.size().is_empty() {
        return Ok(());
    }
    let margin = shadow.map(|s| s.extent()).unwrap_or(0.0);
    let (width, height) = device_size(rect.width + 2.0 * margin, rect.height + 2.0 * margin, dpr);
    if width == 0 || height == 0 {
        debug!("image rounds to {width}x{height} device pixels, skipping");
        return Ok(());
    }

    let mut layer = Canvas::new(width, height)?;
    layer.scale(dpr, dpr);
    layer.translate(margin, margin);

    let local = RectF::from_size(rect.size());
    let Some(path) = rounded_rect_path(local, corner_radius) else {
        return Ok(());
    };

    if let Some(shadow) = shadow {
        shadow::draw_shadow(&mut layer, &path, shadow);
    }

    let (target_w, target_h) = device_size(rect.width, rect.height, dpr);
    let scaled = resample(&image.pixels, target_w.max(1), target_h.max(1));
    let source = rgba_image_to_pixmap(&scaled)?;
    {
        let mut clipped = layer.save();
        clipped.clip_path(&path);
        let pattern = Pattern::new(
            source.as_ref(),
            SpreadMode::Pad,
            FilterQuality::Bilinear,
            1.0,
            Transform::from_scale(
                rect.width / source.width() as f32,
                rect.height / source.height() as f32,
            ),
        );
        let paint = Paint {
            shader: pattern,
            anti_alias: true,
            ..Paint::default()
        };
        clipped.fill_rect(local, &paint);
    }

    let x = ((rect.x - margin) * dpr).round() as i32;
    let y = ((rect.y - margin) * dpr).round() as i32;
    canvas.draw_pixmap_at(x, y, layer.pixmap());
    Ok(())
}

fn resample(pixels: &RgbaImage, width: u32, height: u32) -> std::borrow::Cow<'_, RgbaImage> {
    if pixels.width() == width && pixels.height() == height {
        std::borrow::Cow::Borrowed(pixels)
    } else {
        let resized = image::imageops::resize(pixels, width, height, FilterType::Triangle);
        std::borrow::Cow::Owned(resized)
    }
}

// ============================================================================
// Pixel Conversion
// ============================================================================

/// Converts a straight-alpha image into a premultiplied pixmap.
pub fn rgba_image_to_pixmap(image: &RgbaImage) -> Result<Pixmap, RenderError> {
    let (width, height) = image.dimensions();
    let mut pixmap =
        Pixmap::new(width, height).ok_or(RenderError::SurfaceUnavailable { width, height })?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = resvg::tiny_skia::ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Ok(pixmap)
}

/// Converts a tiny-skia pixmap back into a straight-alpha image.
pub fn pixmap_to_rgba_image(pixmap: &Pixmap) -> RgbaImage {
    let mut img = RgbaImage::new(pixmap.width(), pixmap.height());
    for (dst, src) in img.pixels_mut().zip(pixmap.pixels()) {
        let (r, g, b, a) = unpremultiply(src.red(), src.green(), src.blue(), src.alpha());
        *dst = Rgba([r, g, b, a]);
    }
    img
}

fn unpremultiply(r: u8, g: u8, b: u8, a: u8) -> (u8, u8, u8, u8) {
    match a {
        0 => (0, 0, 0, 0),
        255 => (r, g, b, a),
        _ => {
            let alpha = a as f32 / 255.0;
            let channel = |c: u8| (c as f32 / alpha).round().min(255.0) as u8;
            (channel(r), channel(g), channel(b), a)
        }
    }
}
