//! Storage port for resolving logical image references.

use async_trait::async_trait;

/// Port for reading images addressed by a storage reference rather than a
/// filesystem path, such as `/uploads/P-0003.jpg`.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Reads the encoded bytes behind `reference`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the reference cannot be resolved or read.
    async fn read(&self, reference: &str) -> std::io::Result<Vec<u8>>;
}
