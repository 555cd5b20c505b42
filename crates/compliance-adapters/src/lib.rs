//! Shift Compliance Adapters - external adapters for the compliance engine.
//!
//! This crate provides adapters for:
//! - Filesystem image source and upload acceptance rules
//! - Local-disk image store for web-path references
//! - HTTP transport for the remote prediction service
//! - Reference marker asset locations

pub mod fs;
pub mod http;
pub mod markers;
pub mod store;
pub mod upload;

pub use fs::FsImageSource;
pub use http::HttpPredictionClient;
pub use markers::{list_markers, markers_dir, MarkerRole, MarkerStatus};
pub use store::LocalImageStore;
pub use upload::{UploadPolicy, UploadRejected};
