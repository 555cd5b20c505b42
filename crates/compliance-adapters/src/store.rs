//! Local-disk image store.

use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use compliance_core::ImageStore;
use tracing::debug;

/// Resolves web-style references such as `/uploads/P-0003.jpg` to files
/// below a web root directory.
#[derive(Debug, Clone)]
pub struct LocalImageStore {
    root: PathBuf,
}

impl LocalImageStore {
    /// Creates a store rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The web root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a web path to a physical path below the root.
    ///
    /// # Errors
    ///
    /// Returns [`io::ErrorKind::InvalidInput`] for empty references and for
    /// references that would escape the root.
    pub fn map_web_path(&self, reference: &str) -> io::Result<PathBuf> {
        let relative = Path::new(reference.trim_start_matches(['/', '\\']));
        let mut physical = self.root.clone();
        let mut depth = 0usize;

        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    physical.push(part);
                    depth += 1;
                }
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("reference '{reference}' escapes the upload root"),
                    ));
                }
            }
        }

        if depth == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "empty image reference",
            ));
        }
        Ok(physical)
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn read(&self, reference: &str) -> io::Result<Vec<u8>> {
        let path = self.map_web_path(reference)?;
        debug!(reference, path = %path.display(), "Reading stored image");
        tokio::fs::read(&path).await
    }
}
