//! Drop shadows: an alpha mask of the shape, blurred and tinted.
//!
//! The Gaussian is approximated by three successive box blurs sized for the
//! requested sigma.

use resvg::tiny_skia::{ColorU8, FillRule, Mask, Path, Pixmap};

use super::Canvas;
use crate::color::Rgb;
use crate::composition::ShadowSpec;

/// Paints the shadow of `path` (in current canvas coordinates) under whatever
/// is drawn next.
pub fn draw_shadow(canvas: &mut Canvas, path: &Path, spec: &ShadowSpec) {
    let (width, height) = (canvas.width(), canvas.height());
    let Some(mut mask) = Mask::new(width, height) else {
        return;
    };
    let transform = canvas.transform().pre_translate(spec.offset_x, spec.offset_y);
    mask.fill_path(path, FillRule::Winding, true, transform);

    let sigma = spec.sigma() * canvas.device_scale();
    blur_alpha(mask.data_mut(), width as usize, height as usize, sigma);

    if let Some(shadow) = tint(&mask, spec.color, spec.opacity) {
        canvas.draw_pixmap_at(0, 0, &shadow);
    }
}

/// Blurs an 8-bit alpha buffer in place with a Gaussian of `sigma` pixels.
pub fn blur_alpha(data: &mut [u8], width: usize, height: usize, sigma: f32) {
    if !(sigma.is_finite() && sigma > 0.0) || data.len() != width * height {
        return;
    }
    for radius in box_radii(sigma) {
        box_blur(data, width, height, radius);
    }
}

/// Radii of three box blurs whose sum approximates a Gaussian.
fn box_radii(sigma: f32) -> [usize; 3] {
    let variance = 12.0 * sigma * sigma;
    let ideal = (variance / 3.0 + 1.0).sqrt();
    let mut lower = ideal.floor() as i64;
    if lower % 2 == 0 {
        lower -= 1;
    }
    let lower = lower.max(1);
    let upper = lower + 2;
    let l = lower as f32;
    let m = ((variance - 3.0 * l * l - 12.0 * l - 9.0) / (-4.0 * l - 4.0)).round() as i64;

    let mut radii = [0; 3];
    for (i, radius) in radii.iter_mut().enumerate() {
        let size = if (i as i64) < m { lower } else { upper };
        *radius = ((size - 1) / 2) as usize;
    }
    radii
}

fn box_blur(data: &mut [u8], width: usize, height: usize, radius: usize) {
    if radius == 0 {
        return;
    }
    let mut line = Vec::with_capacity(width.max(height));
    for y in 0..height {
        let row = y * width;
        line.clear();
        line.extend_from_slice(&data[row..row + width]);
        blur_line(&line, radius, |i, v| data[row + i] = v);
    }
    for x in 0..width {
        line.clear();
        line.extend((0..height).map(|y| data[y * width + x]));
        blur_line(&line, radius, |i, v| data[i * width + x] = v);
    }
}

/// Running-sum box filter. Samples outside the line count as transparent.
fn blur_line(src: &[u8], radius: usize, mut write: impl FnMut(usize, u8)) {
    let window = (2 * radius + 1) as u32;
    let mut sum: u32 = src.iter().take(radius + 1).map(|&v| v as u32).sum();
    for i in 0..src.len() {
        write(i, ((sum + window / 2) / window) as u8);
        if let Some(&entering) = src.get(i + radius + 1) {
            sum += entering as u32;
        }
        if i >= radius {
            sum -= src[i - radius] as u32;
        }
    }
}

fn tint(mask: &Mask, color: Rgb, opacity: f32) -> Option<Pixmap> {
    let opacity = opacity.clamp(0.0, 1.0);
    let mut pixmap = Pixmap::new(mask.width(), mask.height())?;
    for (px, &coverage) in pixmap.pixels_mut().iter_mut().zip(mask.data()) {
        let alpha = (coverage as f32 * opacity).round() as u8;
        *px = ColorU8::from_rgba(color.r, color.g, color.b, alpha).premultiply();
    }
    Some(pixmap)
}
