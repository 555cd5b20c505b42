//! Region sampling.
//!
//! Derives the fixed analysis regions for an image from its dimensions: the
//! four corner crops used by the marker analyzers and the sparse lattice used
//! by the luminance analyzer. Regions never extend outside the image, and
//! small images shrink the regions instead of being rejected.

/// An axis-aligned rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Region {
    /// Creates a region.
    #[must_use]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Returns this region clipped to `[0, width) x [0, height)`.
    #[must_use]
    pub fn clipped(self, width: u32, height: u32) -> Self {
        let x = self.x.min(width);
        let y = self.y.min(height);
        Self {
            x,
            y,
            width: self.width.min(width - x),
            height: self.height.min(height - y),
        }
    }

    /// Whether the region covers no pixels.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of pixels covered.
    #[must_use]
    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Whether the region lies entirely within an image of the given size.
    #[must_use]
    pub const fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x as u64 + self.width as u64 <= width as u64
            && self.y as u64 + self.height as u64 <= height as u64
    }
}

/// One of the four image corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Corner {
    /// Top-left.
    TopLeft,
    /// Top-right.
    TopRight,
    /// Bottom-left.
    BottomLeft,
    /// Bottom-right.
    BottomRight,
}

impl Corner {
    /// All corners, in reading order.
    pub const ALL: [Self; 4] = [
        Self::TopLeft,
        Self::TopRight,
        Self::BottomLeft,
        Self::BottomRight,
    ];
}

/// Sizing rule for square corner regions.
///
/// The side is `shorter_edge / divisor`, raised to `min_side` and capped at
/// `max_side`, then clamped to the shorter edge so the square always fits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CornerPolicy {
    /// Divides the shorter image edge.
    pub divisor: u32,
    /// Lower bound on the side before clamping to the image.
    pub min_side: u32,
    /// Upper bound on the side.
    pub max_side: u32,
}

impl CornerPolicy {
    /// `max(60, shorter / 4)`, the sizing used for color coverage.
    pub const COVERAGE: Self = Self {
        divisor: 4,
        min_side: 60,
        max_side: u32::MAX,
    };

    /// `min(120, shorter)`, the sizing used for template matching.
    pub const TEMPLATE: Self = Self {
        divisor: 1,
        min_side: 0,
        max_side: 120,
    };

    /// Side length of the corner squares for an image of the given size.
    ///
    /// Returns 0 only for an empty image.
    #[must_use]
    pub fn side(&self, width: u32, height: u32) -> u32 {
        let shorter = width.min(height);
        if shorter == 0 {
            return 0;
        }
        (shorter / self.divisor.max(1))
            .max(self.min_side)
            .min(self.max_side)
            .min(shorter)
            .max(1)
    }
}

/// Sizing rule for the sparse sampling lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridPolicy {
    /// Approximate number of samples wanted along the shorter edge.
    pub target_samples: u32,
}

impl GridPolicy {
    /// At most ~512 samples per axis.
    pub const DEFAULT: Self = Self {
        target_samples: 512,
    };

    /// Stride between lattice points, `max(1, shorter / target_samples)`.
    #[must_use]
    pub fn stride(&self, width: u32, height: u32) -> u32 {
        (width.min(height) / self.target_samples.max(1)).max(1)
    }
}

impl Default for GridPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// A sparse lattice of sample points covering a whole image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lattice {
    width: u32,
    height: u32,
    stride: u32,
}

impl Lattice {
    /// Distance between adjacent lattice points.
    #[must_use]
    pub const fn stride(&self) -> u32 {
        self.stride
    }

    /// Number of lattice points.
    #[must_use]
    pub fn len(&self) -> u64 {
        let per_axis = |extent: u32| u64::from(extent.div_ceil(self.stride));
        per_axis(self.width) * per_axis(self.height)
    }

    /// Whether the lattice has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates lattice points row by row.
    pub fn points(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let step = self.stride as usize;
        (0..self.height)
            .step_by(step)
            .flat_map(move |y| (0..self.width).step_by(step).map(move |x| (x, y)))
    }
}

/// Derives analysis regions from image dimensions.
pub struct RegionSampler;

impl RegionSampler {
    /// The four corner squares, tagged with their corner.
    ///
    /// Empty for an empty image; otherwise every region lies fully inside
    /// the image.
    #[must_use]
    pub fn corners(policy: &CornerPolicy, width: u32, height: u32) -> Vec<(Corner, Region)> {
        let side = policy.side(width, height);
        if side == 0 {
            return Vec::new();
        }
        let right = width - side;
        let bottom = height - side;

        Corner::ALL
            .into_iter()
            .map(|corner| {
                let (x, y) = match corner {
                    Corner::TopLeft => (0, 0),
                    Corner::TopRight => (right, 0),
                    Corner::BottomLeft => (0, bottom),
                    Corner::BottomRight => (right, bottom),
                };
                (corner, Region::new(x, y, side, side))
            })
            .collect()
    }

    /// The sparse lattice for the whole image.
    #[must_use]
    pub fn grid(policy: &GridPolicy, width: u32, height: u32) -> Lattice {
        Lattice {
            width,
            height,
            stride: policy.stride(width, height),
        }
    }
}
