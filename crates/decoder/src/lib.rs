//! Anchor-based detection decoding for quantized model output tensors.

pub mod assembler;
pub mod config;
pub mod error;
pub mod layer;
pub mod nms;

pub use assembler::DetectionAssembler;
pub use config::{DecoderConfig, OutputActivation};
pub use error::{Error, Result};
pub use layer::{AnchorLayer, OutputLayer, NUM_ANCHORS};
pub use nms::SuppressionEngine;

/// Normalized rectangle in top-left/width/height form, all fields relative to
/// the frame in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    pub xmin: f32,
    pub ymin: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(xmin: f32, ymin: f32, width: f32, height: f32) -> Self {
        debug_assert!(width >= 0.0 && height >= 0.0);
        Self {
            xmin,
            ymin,
            width,
            height,
        }
    }

    pub fn xmax(&self) -> f32 {
        self.xmin + self.width
    }

    pub fn ymax(&self) -> f32 {
        self.ymin + self.height
    }

    /// Intersection over union with another box.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let left = self.xmin.max(other.xmin);
        let top = self.ymin.max(other.ymin);
        let right = self.xmax().min(other.xmax());
        let bottom = self.ymax().min(other.ymax());

        let intersection = (right - left).max(0.0) * (bottom - top).max(0.0);
        let union = self.width * self.height + other.width * other.height - intersection;

        // need to make sure we are not dividing by zero
        intersection / union.max(1e-7)
    }
}

/// One decoded candidate detection. Confidence is validated at construction;
/// values outside [0, 1] (including NaN) never enter the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub class_id: usize,
    pub label: String,
    confidence: f32,
}

impl Detection {
    pub fn new(bbox: BoundingBox, class_id: usize, label: String, confidence: f32) -> Result<Self> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(Error::ValueDomain(format!(
                "confidence {} for class {} is outside [0, 1]",
                confidence, class_id
            )));
        }
        Ok(Self {
            bbox,
            class_id,
            label,
            confidence,
        })
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// Check if one detection is equal to another, within the given delta.
    pub fn equal_within_delta(&self, rhs: &Detection, delta: f32) -> bool {
        let eq_delta = |a: f32, b: f32| (a - b).abs() <= delta;
        self.class_id == rhs.class_id
            && eq_delta(self.confidence, rhs.confidence)
            && eq_delta(self.bbox.xmin, rhs.bbox.xmin)
            && eq_delta(self.bbox.ymin, rhs.bbox.ymin)
            && eq_delta(self.bbox.width, rhs.bbox.width)
            && eq_delta(self.bbox.height, rhs.bbox.height)
    }
}
