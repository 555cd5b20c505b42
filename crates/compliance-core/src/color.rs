//! Color-space math used by the local analyzers.
//!
//! Pure functions: HSV decomposition, Euclidean RGB distance with its
//! similarity mapping, and BT.709 relative luminance.

/// Largest possible Euclidean distance between two 8-bit RGB colors, `sqrt(3 * 255^2)`.
pub const MAX_RGB_DISTANCE: f64 = 441.672_955_930_063_7;

/// A pixel color with each channel normalized to `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorSample {
    /// Red channel.
    pub r: f64,
    /// Green channel.
    pub g: f64,
    /// Blue channel.
    pub b: f64,
}

impl ColorSample {
    /// Creates a sample from normalized channels.
    #[must_use]
    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Creates a sample from 8-bit channels.
    #[must_use]
    pub fn from_rgb8([r, g, b]: [u8; 3]) -> Self {
        Self {
            r: f64::from(r) / 255.0,
            g: f64::from(g) / 255.0,
            b: f64::from(b) / 255.0,
        }
    }

    /// HSV decomposition of this sample.
    #[must_use]
    pub fn to_hsv(self) -> HsvSample {
        to_hsv(self)
    }

    /// BT.709 relative luminance of this sample.
    #[must_use]
    pub fn luminance(self) -> f64 {
        luminance(self)
    }
}

/// Hue/saturation/value triple.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HsvSample {
    /// Hue in degrees, `0.0..360.0`. Zero for achromatic colors.
    pub hue: f64,
    /// Saturation, `0.0..=1.0`.
    pub saturation: f64,
    /// Value (brightness), `0.0..=1.0`.
    pub value: f64,
}

/// Converts a color to HSV using the max/min channel decomposition.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn to_hsv(color: ColorSample) -> HsvSample {
    let ColorSample { r, g, b } = color;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let saturation = if max == 0.0 { 0.0 } else { delta / max };

    let hue = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    // rem_euclid can round up to exactly 6.0 for tiny negative inputs
    let hue = if hue >= 360.0 { hue - 360.0 } else { hue };

    HsvSample {
        hue,
        saturation,
        value: max,
    }
}

/// Euclidean distance between two colors measured on the 0-255 scale.
#[must_use]
pub fn euclidean_distance(a: ColorSample, b: ColorSample) -> f64 {
    let dr = (a.r - b.r) * 255.0;
    let dg = (a.g - b.g) * 255.0;
    let db = (a.b - b.b) * 255.0;
    (dr * dr + dg * dg + db * db).sqrt()
}

/// Euclidean distance between two 8-bit RGB pixels.
#[must_use]
pub fn rgb8_distance(a: [u8; 3], b: [u8; 3]) -> f64 {
    let dr = f64::from(i32::from(a[0]) - i32::from(b[0]));
    let dg = f64::from(i32::from(a[1]) - i32::from(b[1]));
    let db = f64::from(i32::from(a[2]) - i32::from(b[2]));
    (dr * dr + dg * dg + db * db).sqrt()
}

/// Maps a distance to a similarity in `0.0..=1.0` (identical colors give 1.0).
#[must_use]
pub fn similarity(distance: f64) -> f64 {
    (1.0 - distance / MAX_RGB_DISTANCE).clamp(0.0, 1.0)
}

/// ITU-R BT.709 weighted luminance on normalized channels.
#[must_use]
pub fn luminance(color: ColorSample) -> f64 {
    0.0722_f64.mul_add(color.b, 0.2126_f64.mul_add(color.r, 0.7152 * color.g))
}
