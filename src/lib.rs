//! Detection decode and multi-object tracking for quantized anchor-based
//! detection models.
//!
//! Frame tensors go through [`DetectionPipeline::process_frame`]: anchor
//! decode, per-class non-max suppression, one SORT tracker per class, and a
//! change gate that suppresses publishing unchanged track sets.

mod error;
mod gate;
mod pipeline;

pub use error::{Error, Result};
pub use gate::{TrackRecord, TrackSetGate, HEARTBEAT_INTERVAL};
pub use pipeline::{DetectionPipeline, PipelineConfig};

pub use edgetrack_decoder as decoder;
pub use edgetrack_tensor as tensor;
pub use edgetrack_tracker as tracker;
