//! Dominant-color extraction.
//!
//! Samples a 150 px copy of an image, groups the surviving colors into
//! twelve 30° hue bins, and proposes gradient partners for the most frequent
//! color of the strongest bin.
//!
//! Extraction never fails: an image with no usable colors (monochrome, near
//! white, near black, or fully transparent) yields [`FALLBACK_PALETTE`].

use std::borrow::Cow;
use std::collections::HashMap;

use image::{RgbaImage, imageops};
use log::debug;

use crate::color::{Palette, Rgb};

/// Longest side of the sampling copy, in pixels. Smaller images are scaled up.
pub const SAMPLE_MAX_SIDE: u32 = 150;

/// Only every n-th pixel (row-major) of the sampling copy is visited.
pub const SAMPLE_STRIDE: usize = 4;

/// Number of hue bins (30° each).
pub const HUE_BINS: usize = 12;

/// Palette returned when nothing survives filtering.
pub const FALLBACK_PALETTE: Palette =
    Palette::new(Rgb::from_u32(0x1c2440), Rgb::from_u32(0x2a3c70));

const MIN_LIGHTNESS: f32 = 0.15;
const MAX_LIGHTNESS: f32 = 0.85;
const MIN_SATURATION: f32 = 0.15;
const RANKED_BINS: usize = 3;

// ============================================================================
// Analysis Types
// ============================================================================

/// A distinct color and how many sampled pixels had it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorCount {
    pub color: Rgb,
    pub count: u32,
}

/// Statistics for one 30° hue segment.
#[derive(Debug, Clone, PartialEq)]
pub struct HueBin {
    /// Bin number, `floor(hue * 12)`.
    pub index: usize,

    /// Member colors in first-seen order.
    pub members: Vec<ColorCount>,

    /// Sum of member counts.
    pub total: u32,

    /// Count-weighted average `(h, s, l)` of the members.
    pub average_hsl: (f32, f32, f32),
}

impl HueBin {
    fn new(index: usize) -> Self {
        Self {
            index,
            members: Vec::new(),
            total: 0,
            average_hsl: (0.0, 0.0, 0.0),
        }
    }

    fn push(&mut self, entry: ColorCount, hsl: (f32, f32, f32)) {
        self.members.push(entry);
        self.total += entry.count;

        let total = self.total as f32;
        let count = entry.count as f32;
        let prior = total - count;
        let (h, s, l) = self.average_hsl;
        self.average_hsl = (
            (h * prior + hsl.0 * count) / total,
            (s * prior + hsl.1 * count) / total,
            (l * prior + hsl.2 * count) / total,
        );
    }

    /// Returns the most frequent member. Earlier members win ties.
    pub fn most_frequent(&self) -> Option<Rgb> {
        let mut best: Option<ColorCount> = None;
        for member in &self.members {
            if best.is_none_or(|b| member.count > b.count) {
                best = Some(*member);
            }
        }
        best.map(|b| b.color)
    }
}

/// The result of sampling an image.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorAnalysis {
    /// Pixels visited (before filtering).
    pub sampled: usize,

    /// Distinct surviving colors in first-seen order.
    pub colors: Vec<ColorCount>,

    /// Non-empty hue bins ranked by total count, strongest first, at most three.
    pub ranked_bins: Vec<HueBin>,
}

impl ColorAnalysis {
    /// Resizes the image to the sampling size, then analyzes it.
    pub fn analyze(image: &RgbaImage) -> Self {
        Self::from_sample(&sampling_copy(image))
    }

    /// Samples `sample` as-is and ranks its hue bins.
    pub fn from_sample(sample: &RgbaImage) -> Self {
        let mut colors: Vec<ColorCount> = Vec::new();
        let mut positions: HashMap<Rgb, usize> = HashMap::new();
        let mut sampled = 0;

        for pixel in sample.pixels().step_by(SAMPLE_STRIDE) {
            sampled += 1;
            let [r, g, b, a] = pixel.0;
            if a == 0 {
                continue;
            }

            let color = Rgb::new(r, g, b);
            let (_, s, l) = color.to_hsl();
            if !(MIN_LIGHTNESS..=MAX_LIGHTNESS).contains(&l) || s < MIN_SATURATION {
                continue;
            }

            match positions.get(&color) {
                Some(&pos) => colors[pos].count += 1,
                None => {
                    positions.insert(color, colors.len());
                    colors.push(ColorCount { color, count: 1 });
                }
            }
        }

        let mut bins: Vec<HueBin> = (0..HUE_BINS).map(HueBin::new).collect();
        for entry in &colors {
            let hsl = entry.color.to_hsl();
            let index = ((hsl.0 * HUE_BINS as f32).floor() as usize).min(HUE_BINS - 1);
            bins[index].push(*entry, hsl);
        }

        // Stable sort: lower bin index wins ties.
        let mut ranked_bins: Vec<HueBin> = bins.into_iter().filter(|b| b.total > 0).collect();
        ranked_bins.sort_by(|a, b| b.total.cmp(&a.total));
        ranked_bins.truncate(RANKED_BINS);

        debug!(
            "sampled {} pixels from {}x{}, {} distinct colors, {} hue bins",
            sampled,
            sample.width(),
            sample.height(),
            colors.len(),
            ranked_bins.len()
        );

        Self {
            sampled,
            colors,
            ranked_bins,
        }
    }

    /// Most frequent color of the strongest hue bin.
    pub fn dominant(&self) -> Option<Rgb> {
        self.ranked_bins.first().and_then(HueBin::most_frequent)
    }

    /// Proposes gradients anchored on the dominant color.
    ///
    /// Order is stable: complementary, analogous, contrast, then the second
    /// strongest bin's color if there is one. Returns the fallback palette
    /// when no dominant color exists.
    pub fn palettes(&self) -> Vec<Palette> {
        let Some(dominant) = self.dominant() else {
            debug!("no qualifying colors, using fallback palette");
            return vec![FALLBACK_PALETTE];
        };

        let (h, s, l) = dominant.to_hsl();

        let complementary = Rgb::from_hsl((h + 0.5).rem_euclid(1.0), s, l);
        let analogous = Rgb::from_hsl(
            (h + 0.08).rem_euclid(1.0),
            (s * 1.1).min(1.0),
            (l * 0.9).min(0.9),
        );
        let contrast_lightness = if l > 0.5 { l * 0.6 } else { (l * 1.6).min(1.0) };
        let contrast = Rgb::from_hsl(h, s, contrast_lightness);

        let mut palettes = vec![
            Palette::new(dominant, complementary),
            Palette::new(dominant, analogous),
            Palette::new(dominant, contrast),
        ];

        if let Some(second) = self.ranked_bins.get(1).and_then(HueBin::most_frequent) {
            palettes.push(Palette::new(dominant, second));
        }

        debug!("dominant color {dominant}, {} gradient options", palettes.len());
        palettes
    }
}

// ============================================================================
// Entry Points
// ============================================================================

/// Extracts 1-4 gradient palettes from an image. Never returns an empty list.
pub fn extract_palettes(image: &RgbaImage) -> Vec<Palette> {
    ColorAnalysis::analyze(image).palettes()
}

/// Resizes the image so its longer side is exactly [`SAMPLE_MAX_SIDE`],
/// keeping the aspect ratio. The shorter side is truncated, never below 1.
pub fn sampling_copy(image: &RgbaImage) -> Cow<'_, RgbaImage> {
    let (width, height) = image.dimensions();
    let longest = width.max(height);
    if longest == 0 {
        return Cow::Borrowed(image);
    }

    let side = |v: u32| {
        let scaled = u64::from(v) * u64::from(SAMPLE_MAX_SIDE) / u64::from(longest);
        (scaled as u32).max(1)
    };
    let (new_width, new_height) = (side(width), side(height));
    if (new_width, new_height) == (width, height) {
        return Cow::Borrowed(image);
    }
    Cow::Owned(imageops::resize(
        image,
        new_width,
        new_height,
        imageops::FilterType::Triangle,
    ))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid(width: u32, height: u32, hex: u32) -> RgbaImage {
        let c = Rgb::from_u32(hex);
        RgbaImage::from_pixel(width, height, Rgba([c.r, c.g, c.b, 255]))
    }

    #[test]
    fn uniform_color_anchors_every_palette() {
        let color = Rgb::from_u32(0x3366cc);
        let palettes = extract_palettes(&solid(40, 40, 0x3366cc));

        assert_eq!(palettes.len(), 3, "single hue bin yields three options");
        assert!(palettes.iter().all(|p| p.from == color));
        assert!(!palettes.contains(&FALLBACK_PALETTE));
    }

    #[test]
    fn uniform_color_survives_resize() {
        let color = Rgb::from_u32(0xe07a2f);
        let palettes = extract_palettes(&solid(640, 360, 0xe07a2f));
        assert_eq!(palettes[0].from, color);
    }

    #[test]
    fn partner_colors_follow_generation_order() {
        let dominant = Rgb::from_u32(0x3366cc);
        let (h, s, l) = dominant.to_hsl();
        let palettes = extract_palettes(&solid(20, 20, 0x3366cc));

        assert_eq!(palettes[0].to, Rgb::from_hsl((h + 0.5) % 1.0, s, l));
        assert_eq!(
            palettes[1].to,
            Rgb::from_hsl((h + 0.08) % 1.0, (s * 1.1).min(1.0), (l * 0.9).min(0.9))
        );
        let contrast_l = if l > 0.5 { l * 0.6 } else { l * 1.6 };
        assert_eq!(palettes[2].to, Rgb::from_hsl(h, s, contrast_l));
    }

    #[test]
    fn light_dominant_contrast_darkens() {
        let dominant = Rgb::from_u32(0x99ccff);
        let (h, s, l) = dominant.to_hsl();
        assert!(l > 0.5);
        let palettes = extract_palettes(&solid(20, 20, 0x99ccff));
        assert_eq!(palettes[2].to, Rgb::from_hsl(h, s, l * 0.6));
    }

    #[test]
    fn near_white_falls_back() {
        assert_eq!(extract_palettes(&solid(50, 50, 0xf4f4f6)), vec![FALLBACK_PALETTE]);
    }

    #[test]
    fn near_gray_falls_back() {
        assert_eq!(extract_palettes(&solid(50, 50, 0x7a8080)), vec![FALLBACK_PALETTE]);
    }

    #[test]
    fn near_black_falls_back() {
        assert_eq!(extract_palettes(&solid(50, 50, 0x0a0510)), vec![FALLBACK_PALETTE]);
    }

    #[test]
    fn transparent_pixels_are_ignored() {
        let img = RgbaImage::from_pixel(30, 30, Rgba([255, 0, 0, 0]));
        assert_eq!(extract_palettes(&img), vec![FALLBACK_PALETTE]);
    }

    #[test]
    fn second_bin_color_is_used_verbatim() {
        let red = Rgb::from_u32(0xcc3333);
        let blue = Rgb::from_u32(0x3355cc);
        let mut img = RgbaImage::new(60, 30);
        for (x, _, pixel) in img.enumerate_pixels_mut() {
            let c = if x < 40 { red } else { blue };
            pixel.0 = [c.r, c.g, c.b, 255];
        }

        let palettes = ColorAnalysis::from_sample(&img).palettes();
        assert_eq!(palettes.len(), 4);
        assert_eq!(palettes[0].from, red);
        assert_eq!(palettes[3], Palette::new(red, blue));
    }

    #[test]
    fn bin_average_is_count_weighted() {
        // Width 4 with stride 4 samples exactly column 0 of every row.
        let a = Rgb::from_u32(0xcc3333);
        let b = Rgb::from_u32(0xcc4433);
        let mut img = RgbaImage::from_pixel(4, 4, Rgba([a.r, a.g, a.b, 255]));
        img.put_pixel(0, 3, Rgba([b.r, b.g, b.b, 255]));

        let analysis = ColorAnalysis::from_sample(&img);
        assert_eq!(analysis.sampled, 4);
        assert_eq!(analysis.ranked_bins.len(), 1);

        let bin = &analysis.ranked_bins[0];
        assert_eq!(bin.index, 0);
        assert_eq!(bin.total, 4);
        assert_eq!(bin.most_frequent(), Some(a));

        let (ha, _, _) = a.to_hsl();
        let (hb, _, _) = b.to_hsl();
        let expected = (ha * 3.0 + hb) / 4.0;
        assert!((bin.average_hsl.0 - expected).abs() < 1e-5);
    }

    #[test]
    fn ranking_keeps_top_three_bins() {
        // Four hues in column 0 with counts 4, 3, 2, 1.
        let hues = [0xcc3333, 0x33cc33, 0x3333cc, 0xcccc33];
        let counts = [4, 3, 2, 1];
        let mut img = RgbaImage::new(4, 10);
        let mut row = 0;
        for (hex, count) in hues.iter().zip(counts) {
            let c = Rgb::from_u32(*hex);
            for _ in 0..count {
                for x in 0..4 {
                    img.put_pixel(x, row, Rgba([c.r, c.g, c.b, 255]));
                }
                row += 1;
            }
        }

        let analysis = ColorAnalysis::from_sample(&img);
        let totals: Vec<u32> = analysis.ranked_bins.iter().map(|b| b.total).collect();
        assert_eq!(totals, vec![4, 3, 2]);
        assert_eq!(analysis.dominant(), Some(Rgb::from_u32(0xcc3333)));
    }

    #[test]
    fn sampling_copy_sets_longest_side() {
        let wide = solid(600, 300, 0x3366cc);
        assert_eq!(sampling_copy(&wide).dimensions(), (150, 75));

        let tall = solid(100, 900, 0x3366cc);
        assert_eq!(sampling_copy(&tall).dimensions(), (16, 150));

        let tiny = solid(20, 10, 0x3366cc);
        assert_eq!(sampling_copy(&tiny).dimensions(), (150, 75));

        let exact = solid(150, 40, 0x3366cc);
        assert!(matches!(sampling_copy(&exact), Cow::Borrowed(_)));

        let sliver = solid(1000, 2, 0x3366cc);
        assert_eq!(sampling_copy(&sliver).dimensions(), (150, 1));
    }

    #[test]
    fn small_images_are_sampled_at_full_size() {
        let analysis = ColorAnalysis::analyze(&solid(20, 20, 0x3366cc));
        assert_eq!(analysis.sampled, 150 * 150 / SAMPLE_STRIDE);
        assert_eq!(analysis.colors.len(), 1);
        assert_eq!(analysis.colors[0].count as usize, analysis.sampled);
    }
}
