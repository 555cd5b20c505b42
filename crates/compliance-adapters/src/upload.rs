//! Upload acceptance rules applied before an image reaches the engine.

use std::path::Path;

use thiserror::Error;

/// Extensions accepted by default.
pub const DEFAULT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Default size ceiling, 10 MiB.
pub const DEFAULT_MAX_BYTES: u64 = 10 * 1024 * 1024;

/// Why an upload was refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadRejected {
    /// The file has no extension or one outside the allow-list.
    #[error("unsupported file type '{extension}' (allowed: {allowed})")]
    UnsupportedExtension {
        /// Extension as given, lowercased; empty if missing.
        extension: String,
        /// Comma-separated allow-list.
        allowed: String,
    },

    /// The file is larger than the ceiling.
    #[error("file is {size} bytes, limit is {limit} bytes")]
    TooLarge {
        /// Actual size.
        size: u64,
        /// Configured ceiling.
        limit: u64,
    },

    /// The file is empty.
    #[error("file is empty")]
    Empty,
}

/// Extension allow-list plus size ceiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    extensions: Vec<String>,
    max_bytes: u64,
}

impl UploadPolicy {
    /// Creates a policy from an extension list (case-insensitive, with or
    /// without a leading dot) and a size ceiling.
    #[must_use]
    pub fn new<I, S>(extensions: I, max_bytes: u64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            max_bytes,
        }
    }

    /// The size ceiling in bytes.
    #[must_use]
    pub const fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Whether `path` has an allowed extension.
    #[must_use]
    pub fn accepts_extension(&self, path: &Path) -> bool {
        self.check_extension(path).is_ok()
    }

    /// Checks the extension of `path`.
    ///
    /// # Errors
    ///
    /// Returns [`UploadRejected::UnsupportedExtension`] if the extension is
    /// missing or not allowed.
    pub fn check_extension(&self, path: &Path) -> Result<(), UploadRejected> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if self.extensions.iter().any(|allowed| *allowed == extension) {
            Ok(())
        } else {
            Err(UploadRejected::UnsupportedExtension {
                extension,
                allowed: self.extensions.join(", "),
            })
        }
    }

    /// Checks a file size.
    ///
    /// # Errors
    ///
    /// Returns [`UploadRejected::Empty`] or [`UploadRejected::TooLarge`].
    pub const fn check_size(&self, size: u64) -> Result<(), UploadRejected> {
        if size == 0 {
            Err(UploadRejected::Empty)
        } else if size > self.max_bytes {
            Err(UploadRejected::TooLarge {
                size,
                limit: self.max_bytes,
            })
        } else {
            Ok(())
        }
    }

    /// Checks both the name and the size of an upload.
    ///
    /// # Errors
    ///
    /// Returns the first rule the upload breaks.
    pub fn validate(&self, name: &Path, size: u64) -> Result<(), UploadRejected> {
        self.check_extension(name)?;
        self.check_size(size)
    }
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSIONS, DEFAULT_MAX_BYTES)
    }
}
