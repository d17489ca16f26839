use crate::{
    config::{DecoderConfig, OutputActivation},
    error::{Error, Result},
    layer::{AnchorLayer, OutputLayer, NUM_ANCHORS},
    BoundingBox, Detection,
};
use edgetrack_tensor::TensorView;
use log::debug;

/// Drives the anchor decode across every cell, anchor and scale of a frame's
/// output tensors and emits thresholded raw detections.
///
/// Tensors are matched to the configured anchor triples by ascending element
/// count: the smallest tensor takes the first triple. Image dimensions are
/// recovered from the smallest tensor, whose cells carry the fixed stride of
/// 32 image pixels.
pub struct DetectionAssembler {
    config: DecoderConfig,
}

impl DetectionAssembler {
    pub fn new(config: DecoderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn decode(&self, tensors: &[TensorView]) -> Result<Vec<Detection>> {
        let mut detections = Vec::new();
        if tensors.is_empty() {
            return Ok(detections);
        }
        if tensors.len() != self.config.anchors.len() {
            return Err(Error::Config(format!(
                "{} output tensors but {} anchor triples configured",
                tensors.len(),
                self.config.anchors.len()
            )));
        }

        let mut order: Vec<usize> = (0..tensors.len()).collect();
        order.sort_by_key(|&i| tensors[i].len());

        let (image_width, image_height) = tensors[order[0]].image_extent();
        let apply_sigmoid = self.config.output_activation == OutputActivation::Sigmoid;
        let threshold = self.config.detection_threshold;

        for (scale, &index) in order.iter().enumerate() {
            let tensor = tensors[index];
            if tensor.channels() % NUM_ANCHORS != 0 {
                return Err(Error::InvalidShape(format!(
                    "tensor channel count {} is not divisible by {} anchors",
                    tensor.channels(),
                    NUM_ANCHORS
                )));
            }
            let layer = AnchorLayer::new(
                tensor,
                self.config.anchors[scale],
                apply_sigmoid,
                self.config.label_offset,
            );
            if layer.num_classes() != self.config.class_count() {
                return Err(Error::Config(format!(
                    "config class labels do not match output tensors: {} labels, {} tensor classes",
                    self.config.class_count(),
                    layer.num_classes()
                )));
            }

            for row in 0..layer.grid_height() {
                for col in 0..layer.grid_width() {
                    for anchor in 0..NUM_ANCHORS {
                        let box_conf = layer.confidence(row, col, anchor);
                        if box_conf < threshold {
                            continue;
                        }

                        let (class_id, class_conf) = layer.class(row, col, anchor);
                        // Final confidence: box confidence * class probability
                        let confidence = box_conf * class_conf;
                        if confidence < threshold {
                            continue;
                        }

                        let (x, y) = layer.center(row, col, anchor);
                        let (w, h) = layer.shape(row, col, anchor, image_width, image_height);
                        let bbox = BoundingBox::new(x - w / 2.0, y - h / 2.0, w, h);
                        let label = self.config.labels[class_id].clone();
                        detections.push(Detection::new(bbox, class_id, label, confidence)?);
                    }
                }
            }
        }

        debug!(
            "decoded {} raw detections from {} tensors ({}x{} image)",
            detections.len(),
            tensors.len(),
            image_width,
            image_height
        );
        Ok(detections)
    }
}
