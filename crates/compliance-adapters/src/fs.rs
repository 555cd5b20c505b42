//! Filesystem adapter for enumerating shift photos.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use compliance_core::{ImageHandle, ImageSource};
use tracing::{debug, warn};

use crate::upload::UploadPolicy;

/// Filesystem image source adapter.
///
/// Explicitly named files are always reported, either as a handle or as an
/// error item explaining the rejection. Files found while walking a
/// directory are silently skipped when their extension is not allowed.
pub struct FsImageSource {
    paths: Vec<PathBuf>,
    recursive: bool,
    policy: UploadPolicy,
}

impl FsImageSource {
    /// Creates a new filesystem image source.
    ///
    /// # Arguments
    ///
    /// * `paths` - Files or directories to scan
    /// * `recursive` - Whether to recurse into subdirectories
    #[must_use]
    pub fn new(paths: Vec<PathBuf>, recursive: bool) -> Self {
        Self::with_policy(paths, recursive, UploadPolicy::default())
    }

    /// Creates a source that applies a custom upload policy.
    #[must_use]
    pub const fn with_policy(paths: Vec<PathBuf>, recursive: bool, policy: UploadPolicy) -> Self {
        Self {
            paths,
            recursive,
            policy,
        }
    }

    /// Collects candidate files from the configured paths, in a stable order.
    fn collect_files(&self) -> Vec<Candidate> {
        let mut files = Vec::new();

        for path in &self.paths {
            if path.is_file() {
                files.push(Candidate::Explicit(path.clone()));
            } else if path.is_dir() {
                self.collect_from_dir(path, &mut files);
            } else {
                warn!("Path does not exist: {}", path.display());
                files.push(Candidate::Missing(path.clone()));
            }
        }

        files
    }

    fn collect_from_dir(&self, dir: &Path, files: &mut Vec<Candidate>) {
        let entries = match std::fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) => {
                warn!("Failed to read directory {}: {e}", dir.display());
                return;
            }
        };

        let mut paths: Vec<PathBuf> = entries.flatten().map(|entry| entry.path()).collect();
        paths.sort();

        for path in paths {
            if path.is_file() {
                if self.policy.accepts_extension(&path) {
                    files.push(Candidate::Found(path));
                } else {
                    debug!("Skipping unsupported file: {}", path.display());
                }
            } else if path.is_dir() && self.recursive {
                self.collect_from_dir(&path, files);
            }
        }
    }

    fn admit(&self, candidate: Candidate) -> Result<ImageHandle> {
        let path = match candidate {
            Candidate::Missing(path) => anyhow::bail!("{}: no such file", path.display()),
            Candidate::Explicit(path) | Candidate::Found(path) => path,
        };
        let size = std::fs::metadata(&path)
            .with_context(|| format!("Failed to stat {}", path.display()))?
            .len();
        self.policy
            .validate(&path, size)
            .with_context(|| format!("Rejected {}", path.display()))?;
        Ok(ImageHandle::Path(path))
    }
}

enum Candidate {
    Explicit(PathBuf),
    Found(PathBuf),
    Missing(PathBuf),
}

impl ImageSource for FsImageSource {
    fn handles(&self) -> Box<dyn Iterator<Item = Result<ImageHandle>> + Send + '_> {
        let files = self.collect_files();
        debug!("Found {} candidate files", files.len());

        Box::new(files.into_iter().map(|candidate| self.admit(candidate)))
    }

    fn count_hint(&self) -> Option<usize> {
        Some(self.collect_files().len())
    }
}
