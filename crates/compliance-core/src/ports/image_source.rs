//! Image source port for enumerating images to check.

use crate::domain::ImageHandle;

/// Port for enumerating images from a source.
pub trait ImageSource: Send + Sync {
    /// Returns an iterator over image handles from this source.
    ///
    /// # Errors
    ///
    /// Individual items may be errors if an entry is rejected (unsupported
    /// extension, oversized file, unreadable directory).
    fn handles(&self) -> Box<dyn Iterator<Item = anyhow::Result<ImageHandle>> + Send + '_>;

    /// Returns the total number of images, if known.
    fn count_hint(&self) -> Option<usize>;
}
