//! Image handles and decoded raster images.

use std::path::PathBuf;

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};

use super::AnalysisError;
use crate::color::ColorSample;
use crate::sampling::Region;

/// Resampling filter used whenever a region is normalized to a fixed size.
const RESAMPLE_FILTER: FilterType = FilterType::Triangle;

/// An addressable image handed to the engine.
#[derive(Debug, Clone)]
pub enum ImageHandle {
    /// A file on the local filesystem.
    Path(PathBuf),
    /// Encoded image bytes already in memory.
    Bytes {
        /// Display name (used as the upload file name by remote analyzers).
        name: String,
        /// Encoded image data (JPEG, PNG, ...).
        data: Vec<u8>,
    },
    /// A logical storage reference resolved through an [`ImageStore`](crate::ports::ImageStore).
    Stored(String),
}

impl ImageHandle {
    /// Creates a handle for in-memory bytes.
    pub fn bytes(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self::Bytes {
            name: name.into(),
            data,
        }
    }

    /// Human-readable location of the image, for logs and output records.
    #[must_use]
    pub fn location(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Bytes { name, .. } => name.clone(),
            Self::Stored(reference) => reference.clone(),
        }
    }
}

impl From<PathBuf> for ImageHandle {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

/// A decoded photo, immutable after load.
///
/// Pixels are held as 8-bit RGB; any alpha channel is dropped at decode time.
/// A `RasterImage` is owned by the analysis call that decoded it and is never
/// retained between calls.
#[derive(Debug, Clone)]
pub struct RasterImage {
    pixels: RgbImage,
}

impl RasterImage {
    /// Decodes encoded image bytes.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::ImageDecode`] if the format is unknown,
    /// unsupported, or the data is corrupt.
    pub fn decode(bytes: &[u8]) -> Result<Self, AnalysisError> {
        let image = image::load_from_memory(bytes)?;
        Ok(Self::from_dynamic(image))
    }

    /// Wraps an already-decoded image.
    #[must_use]
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self {
            pixels: image.into_rgb8(),
        }
    }

    /// Image width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Image height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Returns `(width, height)`.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// Normalized color of the pixel at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are out of bounds.
    #[must_use]
    pub fn sample(&self, x: u32, y: u32) -> ColorSample {
        ColorSample::from_rgb8(self.pixels.get_pixel(x, y).0)
    }

    /// Borrows the underlying pixel buffer.
    #[must_use]
    pub const fn as_rgb(&self) -> &RgbImage {
        &self.pixels
    }

    /// Crops `region` (clipped to the image) and resamples it to `size`×`size`.
    #[must_use]
    pub fn crop_resized(&self, region: Region, size: u32) -> RgbImage {
        let region = region.clipped(self.width(), self.height());
        let cropped =
            imageops::crop_imm(&self.pixels, region.x, region.y, region.width, region.height)
                .to_image();
        if cropped.dimensions() == (size, size) {
            return cropped;
        }
        imageops::resize(&cropped, size, size, RESAMPLE_FILTER)
    }
}

/// Resamples a whole image to `size`×`size` with the same filter used for regions.
#[must_use]
pub fn resample_square(image: &RgbImage, size: u32) -> RgbImage {
    if image.dimensions() == (size, size) {
        return image.clone();
    }
    imageops::resize(image, size, size, RESAMPLE_FILTER)
}
