//! Encoding finished surfaces into PNG, JPEG or WebP bytes.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, RgbaImage};
use resvg::tiny_skia::Pixmap;

use super::pixmap_to_rgba_image;
use crate::error::EncodeError;
use crate::settings::ExportFormat;

/// Encodes a rendered surface.
pub fn encode_pixmap(pixmap: &Pixmap, format: ExportFormat) -> Result<Vec<u8>, EncodeError> {
    encode_rgba(&pixmap_to_rgba_image(pixmap), format)
}

/// Encodes a straight-alpha image.
///
/// JPEG has no alpha channel, so transparent pixels come out black. Lossy
/// WebP quantizes the color channels by quality before handing the pixels to
/// the pure-Rust encoder; alpha is kept exact.
pub fn encode_rgba(image: &RgbaImage, format: ExportFormat) -> Result<Vec<u8>, EncodeError> {
    let (width, height) = image.dimensions();
    if image.as_raw().len() != width as usize * height as usize * 4 {
        return Err(EncodeError::BufferMismatch);
    }

    let mut buf = Vec::new();
    let result = match format {
        ExportFormat::Png => {
            PngEncoder::new(&mut buf).write_image(
                image.as_raw(),
                width,
                height,
                ExtendedColorType::Rgba8,
            )
        }
        ExportFormat::Jpg => {
            let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            JpegEncoder::new_with_quality(&mut buf, encoder_quality(format))
                .write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
        }
        ExportFormat::Webp => {
            let mut pixels = image.clone();
            quantize_rgb(&mut pixels, encoder_quality(format));
            WebPEncoder::new_lossless(&mut buf).write_image(
                pixels.as_raw(),
                width,
                height,
                ExtendedColorType::Rgba8,
            )
        }
    };
    result.map_err(|source| EncodeError::Image { format, source })?;
    Ok(buf)
}

/// The format's quality on the 1-100 scale encoders take; 100 when lossless.
fn encoder_quality(format: ExportFormat) -> u8 {
    let quality = format.quality().unwrap_or(1.0);
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

/// Snaps each color channel to one of `webp_levels(quality)` evenly spaced
/// values. Quality 100 leaves the pixels untouched.
fn quantize_rgb(image: &mut RgbaImage, quality: u8) {
    if quality >= 100 {
        return;
    }
    let step = 255.0 / (webp_levels(quality) as f32 - 1.0);
    for pixel in image.pixels_mut() {
        for channel in pixel.0.iter_mut().take(3) {
            let bucket = (f32::from(*channel) / step).round();
            *channel = (bucket * step).round().clamp(0.0, 255.0) as u8;
        }
    }
}

/// Levels per channel: finer near the top of the scale, coarse at the bottom.
fn webp_levels(quality: u8) -> u16 {
    if quality >= 100 {
        return 256;
    }
    let normalized = f32::from(quality.max(1)) / 100.0;
    (2.0 + normalized * normalized * 254.0).round().clamp(2.0, 256.0) as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba};

    fn sample() -> RgbaImage {
        RgbaImage::from_fn(8, 6, |x, y| Rgba([x as u8 * 30, y as u8 * 40, 128, 255]))
    }

    #[test]
    fn png_is_lossless() {
        let bytes = encode_rgba(&sample(), ExportFormat::Png).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded, sample());
    }

    #[test]
    fn jpeg_drops_alpha() {
        let bytes = encode_rgba(&sample(), ExportFormat::Jpg).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 6));
        assert_eq!(encoder_quality(ExportFormat::Jpg), 90);
    }

    #[test]
    fn webp_applies_format_quality() {
        assert_eq!(encoder_quality(ExportFormat::Webp), 90);
        assert_eq!(webp_levels(90), 208);
        assert_eq!(webp_levels(100), 256);
        assert_eq!(webp_levels(1), 2);

        let ramp = RgbaImage::from_fn(256, 4, |x, y| {
            Rgba([x as u8, 255 - x as u8, (x + y) as u8, 200])
        });
        let bytes = encode_rgba(&ramp, ExportFormat::Webp).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::WebP);

        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (256, 4));
        assert_ne!(decoded, ramp);

        let mut expected = ramp.clone();
        quantize_rgb(&mut expected, 90);
        assert_eq!(decoded, expected);
        for (got, src) in decoded.pixels().zip(ramp.pixels()) {
            assert_eq!(got.0[3], src.0[3]);
            for c in 0..3 {
                assert!(got.0[c].abs_diff(src.0[c]) <= 1);
            }
        }
    }

    #[test]
    fn quantize_keeps_extremes() {
        let mut img = RgbaImage::from_pixel(1, 1, Rgba([0, 255, 3, 17]));
        quantize_rgb(&mut img, 1);
        assert_eq!(img.get_pixel(0, 0).0, [0, 255, 0, 17]);

        let mut untouched = RgbaImage::from_pixel(1, 1, Rgba([3, 4, 5, 6]));
        quantize_rgb(&mut untouched, 100);
        assert_eq!(untouched.get_pixel(0, 0).0, [3, 4, 5, 6]);
    }

    #[test]
    fn pixmap_encodes_unpremultiplied() {
        let mut pixmap = Pixmap::new(2, 2).unwrap();
        pixmap.fill(resvg::tiny_skia::Color::from_rgba8(255, 0, 0, 255));
        let bytes = encode_pixmap(&pixmap, ExportFormat::Png).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(1, 1).0, [255, 0, 0, 255]);
    }
}
