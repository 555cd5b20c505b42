//! Reference marker asset locations.

use std::path::{Path, PathBuf};

use compliance_core::modules::{FAIL_MARKER_FILE, PASS_MARKER_FILE};

/// Role a marker plays in template matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerRole {
    /// Green check, signals compliance.
    Pass,
    /// Red X, signals non-compliance.
    Fail,
}

impl MarkerRole {
    /// Both roles, pass first.
    pub const ALL: [Self; 2] = [Self::Pass, Self::Fail];

    /// Lowercase role name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
        }
    }

    /// File name of the marker inside the marker directory.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Pass => PASS_MARKER_FILE,
            Self::Fail => FAIL_MARKER_FILE,
        }
    }
}

/// Resolved location of one marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerStatus {
    /// Which marker.
    pub role: MarkerRole,
    /// Where it is expected.
    pub path: PathBuf,
    /// Whether a file exists there.
    pub present: bool,
}

/// Returns the default marker directory.
///
/// Uses `XDG_DATA_HOME/shift-compliance/markers` or
/// `~/.local/share/shift-compliance/markers`.
#[must_use]
pub fn default_markers_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("shift-compliance")
        .join("markers")
}

/// Returns the marker directory, preferring `custom` when given.
#[must_use]
pub fn markers_dir(custom: Option<&Path>) -> PathBuf {
    custom.map_or_else(default_markers_dir, Path::to_path_buf)
}

/// Path of one marker inside `dir`.
#[must_use]
pub fn marker_path(dir: &Path, role: MarkerRole) -> PathBuf {
    dir.join(role.file_name())
}

/// Lists both markers with their presence on disk.
#[must_use]
pub fn list_markers(dir: &Path) -> Vec<MarkerStatus> {
    MarkerRole::ALL
        .into_iter()
        .map(|role| {
            let path = marker_path(dir, role);
            let present = path.is_file();
            MarkerStatus {
                role,
                path,
                present,
            }
        })
        .collect()
}

/// Checks if both markers are present.
#[must_use]
pub fn all_markers_present(dir: &Path) -> bool {
    list_markers(dir).iter().all(|m| m.present)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_markers_dir() {
        assert!(default_markers_dir().ends_with("shift-compliance/markers"));
    }

    #[test]
    fn test_custom_dir_wins() {
        let dir = markers_dir(Some(Path::new("/opt/markers")));
        assert_eq!(dir, PathBuf::from("/opt/markers"));
        assert_eq!(
            marker_path(&dir, MarkerRole::Fail),
            PathBuf::from("/opt/markers/red-x.png")
        );
    }

    #[test]
    fn test_list_reports_presence() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("green-check.png"), b"png").unwrap();

        let listed = list_markers(dir.path());
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].role, MarkerRole::Pass);
        assert!(listed[0].present);
        assert_eq!(listed[1].role, MarkerRole::Fail);
        assert!(!listed[1].present);
        assert!(!all_markers_present(dir.path()));
    }
}
