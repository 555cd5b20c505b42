//! Test support utilities for the compliance engine.
//!
//! Provides mocks for every core port and synthetic image builders for
//! exercising the analyzers without fixture files.
//!
//! # Example
//!
//! ```
//! use compliance_test_support::{MockPredictionTransport, SyntheticImageBuilder, MARKER_GREEN};
//!
//! // A gray photo with a green square in the top-left corner
//! let photo = SyntheticImageBuilder::with_corner_patch(
//!     400,
//!     300,
//!     [128, 128, 128],
//!     compliance_core::sampling::Corner::TopLeft,
//!     100,
//!     MARKER_GREEN,
//! );
//! let bytes = SyntheticImageBuilder::png_bytes(&photo);
//!
//! // A prediction service that always answers "compliant"
//! let transport = MockPredictionTransport::predicting("compliant", 0.93);
//! # let _ = (bytes, transport);
//! ```

mod builders;
mod mocks;

pub use builders::{
    SyntheticImageBuilder, MARKER_GREEN, MARKER_RED, NEUTRAL_GRAY, PAPER_WHITE,
};
pub use mocks::{
    MockImageSource, MockImageStore, MockPredictionTransport, MockProgressSink, MockResultOutput,
};
