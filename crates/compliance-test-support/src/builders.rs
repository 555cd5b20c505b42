//! Synthetic image builders for testing.

use std::io::Cursor;

use compliance_core::sampling::Corner;
use compliance_core::{ImageHandle, RasterImage};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

/// Background used when a test only cares about the marker.
pub const NEUTRAL_GRAY: [u8; 3] = [128, 128, 128];
/// Saturated green in the pass band.
pub const MARKER_GREEN: [u8; 3] = [20, 200, 60];
/// Saturated red in the fail band.
pub const MARKER_RED: [u8; 3] = [220, 25, 25];
/// Paper white behind the drawn markers.
pub const PAPER_WHITE: [u8; 3] = [250, 250, 250];

/// Builder for creating synthetic test images.
///
/// Provides convenience methods for generating photos with specific
/// characteristics (uniform color, a marker in one corner, drawn check and X
/// markers) and for encoding them the way they arrive from disk or upload.
pub struct SyntheticImageBuilder;

impl SyntheticImageBuilder {
    // === Uniform images ===

    /// Creates a uniformly colored image.
    #[must_use]
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb(rgb))
    }

    /// Creates a uniform gray image.
    #[must_use]
    pub fn gray(width: u32, height: u32, value: u8) -> RgbImage {
        Self::solid(width, height, [value, value, value])
    }

    // === Marker photos ===

    /// Paints a solid `side`×`side` square of `marker` into one corner of a
    /// `background` photo.
    #[must_use]
    pub fn with_corner_patch(
        width: u32,
        height: u32,
        background: [u8; 3],
        corner: Corner,
        side: u32,
        marker: [u8; 3],
    ) -> RgbImage {
        let patch = Self::solid(side.min(width), side.min(height), marker);
        Self::with_corner_image(width, height, background, corner, &patch)
    }

    /// Copies `marker` into one corner of a `background` photo.
    #[must_use]
    pub fn with_corner_image(
        width: u32,
        height: u32,
        background: [u8; 3],
        corner: Corner,
        marker: &RgbImage,
    ) -> RgbImage {
        let mut photo = Self::solid(width, height, background);
        let (mw, mh) = (marker.width().min(width), marker.height().min(height));
        let (ox, oy) = match corner {
            Corner::TopLeft => (0, 0),
            Corner::TopRight => (width - mw, 0),
            Corner::BottomLeft => (0, height - mh),
            Corner::BottomRight => (width - mw, height - mh),
        };
        for y in 0..mh {
            for x in 0..mw {
                photo.put_pixel(ox + x, oy + y, *marker.get_pixel(x, y));
            }
        }
        photo
    }

    /// Draws a green check mark on white paper.
    #[must_use]
    pub fn check_marker(size: u32) -> RgbImage {
        let s = i64::from(size);
        let stroke = (s / 10).max(1);
        // Short leg from (0.2, 0.55) to (0.4, 0.75), long leg up to (0.8, 0.25)
        let segments = [
            ((s * 2 / 10, s * 55 / 100), (s * 4 / 10, s * 75 / 100)),
            ((s * 4 / 10, s * 75 / 100), (s * 8 / 10, s * 25 / 100)),
        ];
        Self::draw_strokes(size, &segments, stroke, MARKER_GREEN)
    }

    /// Draws a red X on white paper.
    #[must_use]
    pub fn x_marker(size: u32) -> RgbImage {
        let s = i64::from(size);
        let stroke = (s / 10).max(1);
        let (lo, hi) = (s * 2 / 10, s * 8 / 10);
        let segments = [((lo, lo), (hi, hi)), ((lo, hi), (hi, lo))];
        Self::draw_strokes(size, &segments, stroke, MARKER_RED)
    }

    #[allow(clippy::cast_precision_loss)]
    fn draw_strokes(
        size: u32,
        segments: &[((i64, i64), (i64, i64))],
        stroke: i64,
        ink: [u8; 3],
    ) -> RgbImage {
        RgbImage::from_fn(size, size, |x, y| {
            let p = (f64::from(x), f64::from(y));
            let hit = segments.iter().any(|&((x0, y0), (x1, y1))| {
                distance_to_segment(p, (x0 as f64, y0 as f64), (x1 as f64, y1 as f64))
                    <= stroke as f64 / 2.0
            });
            Rgb(if hit { ink } else { PAPER_WHITE })
        })
    }

    // === Conversions and encodings ===

    /// Wraps pixels as a decoded raster.
    #[must_use]
    pub fn raster(pixels: RgbImage) -> RasterImage {
        RasterImage::from_dynamic(DynamicImage::ImageRgb8(pixels))
    }

    /// Encodes pixels as PNG.
    ///
    /// # Panics
    ///
    /// Panics if in-memory encoding fails.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn png_bytes(pixels: &RgbImage) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        pixels
            .write_to(&mut out, ImageFormat::Png)
            .expect("in-memory PNG encoding");
        out.into_inner()
    }

    /// Encodes pixels as JPEG at the given quality.
    ///
    /// # Panics
    ///
    /// Panics if in-memory encoding fails.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn jpeg_bytes(pixels: &RgbImage, quality: u8) -> Vec<u8> {
        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, quality)
            .encode_image(pixels)
            .expect("in-memory JPEG encoding");
        out
    }

    /// In-memory PNG handle named `name`.
    #[must_use]
    pub fn png_handle(name: &str, pixels: &RgbImage) -> ImageHandle {
        ImageHandle::bytes(name, Self::png_bytes(pixels))
    }
}

fn distance_to_segment(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len_sq = dx.mul_add(dx, dy * dy);
    let t = if len_sq <= f64::EPSILON {
        0.0
    } else {
        ((p.0 - a.0).mul_add(dx, (p.1 - a.1) * dy) / len_sq).clamp(0.0, 1.0)
    };
    let (cx, cy) = (t.mul_add(dx, a.0), t.mul_add(dy, a.1));
    (p.0 - cx).hypot(p.1 - cy)
}
