//! Port definitions for hexagonal architecture.
//!
//! These traits define the boundaries between the domain core and external adapters.

mod image_source;
mod image_store;
mod prediction;
mod progress;
mod result_output;

pub use image_source::ImageSource;
pub use image_store::ImageStore;
pub use prediction::{PredictionReply, PredictionRequest, PredictionTransport, TransportError};
pub use progress::{BatchSummary, ProgressEvent, ProgressSink};
pub use result_output::ResultOutput;
