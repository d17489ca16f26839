use crate::{
    error::Result,
    gate::{TrackRecord, TrackSetGate, HEARTBEAT_INTERVAL},
};
use edgetrack_decoder::{DecoderConfig, Detection, DetectionAssembler, SuppressionEngine};
use edgetrack_tensor::TensorView;
use edgetrack_tracker::{Observation, SortConfig, SortTracker};
use log::debug;
use serde::{Deserialize, Serialize};

/// Combined configuration of the detection decode and tracking stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub decoder: DecoderConfig,
    #[serde(default)]
    pub tracker: SortConfig,
}

impl PipelineConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.decoder.validate()?;
        config.tracker.validate()?;
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.decoder.validate()?;
        config.tracker.validate()?;
        Ok(config)
    }
}

/// Per-frame detection and tracking pipeline: anchor decode, non-max
/// suppression, one tracker per class, then change-gated emission.
///
/// Every tracker advances every frame, including frames where its class has
/// no detections, so coasting tracks age out on schedule.
pub struct DetectionPipeline {
    assembler: DetectionAssembler,
    suppression: SuppressionEngine,
    trackers: Vec<SortTracker>,
    gate: TrackSetGate,
    labels: Vec<String>,
    label_offset: usize,
}

impl DetectionPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let assembler = DetectionAssembler::new(config.decoder)?;
        let decoder = assembler.config();
        let suppression = SuppressionEngine::new(decoder.iou_threshold, decoder.max_boxes);
        let trackers = (0..decoder.class_count())
            .map(|_| SortTracker::new(config.tracker))
            .collect::<Result<Vec<_>, _>>()?;
        let labels = decoder.labels.clone();
        let label_offset = decoder.label_offset;
        Ok(Self {
            assembler,
            suppression,
            trackers,
            gate: TrackSetGate::new(HEARTBEAT_INTERVAL),
            labels,
            label_offset,
        })
    }

    /// Runs one frame's output tensors through the pipeline. Returns the
    /// track records to publish, or `None` when the frame is gated out.
    pub fn process_frame(&mut self, tensors: &[TensorView]) -> Result<Option<Vec<TrackRecord>>> {
        let detections = self.assembler.decode(tensors)?;
        let detections = self.suppression.suppress(detections);

        let mut grouped: Vec<Vec<Observation>> = vec![Vec::new(); self.trackers.len()];
        for detection in &detections {
            let class_index = detection.class_id - self.label_offset;
            if let Some(bucket) = grouped.get_mut(class_index) {
                bucket.push(Observation {
                    bbox: clamp_box(detection),
                    score: detection.confidence(),
                });
            }
        }

        let mut records = Vec::new();
        for (class_index, tracker) in self.trackers.iter_mut().enumerate() {
            let reports = tracker.update(&grouped[class_index]);
            let label = &self.labels[class_index + self.label_offset];
            for report in reports {
                records.push(TrackRecord::new(report.id, label.clone(), report.bbox));
            }
        }
        debug!(
            "{} detections, {} confirmed tracks this frame",
            detections.len(),
            records.len()
        );

        Ok(self.gate.filter(records))
    }
}

/// Floors the box origin at zero and caps its extent at one frame, returning
/// `[xmin, ymin, xmax, ymax]`. Boxes crossing the right or bottom edge keep
/// their size, so xmax/ymax may exceed 1.
fn clamp_box(detection: &Detection) -> [f32; 4] {
    let xmin = detection.bbox.xmin.max(0.0);
    let ymin = detection.bbox.ymin.max(0.0);
    let width = detection.bbox.width.min(1.0);
    let height = detection.bbox.height.min(1.0);
    [xmin, ymin, xmin + width, ymin + height]
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgetrack_tensor::Quantization;

    fn config(min_hits: u32) -> PipelineConfig {
        PipelineConfig {
            decoder: DecoderConfig {
                detection_threshold: 0.3,
                iou_threshold: 0.45,
                max_boxes: 100,
                labels: vec!["background".into(), "person".into()],
                output_activation: Default::default(),
                label_offset: 1,
                anchors: vec![[[16.0, 16.0], [32.0, 32.0], [48.0, 48.0]]],
            },
            tracker: SortConfig {
                min_hits,
                ..Default::default()
            },
        }
    }

    // 1x1 grid, one class: box conf 0.9, class conf 0.95
    fn person_tensor_data() -> Vec<u8> {
        let mut data = vec![0u8; 18];
        data[0] = 50; // cx at cell center
        data[1] = 50;
        data[2] = 50; // w = (2*0.5)^2 * 16 / 32 = 0.5
        data[3] = 50;
        data[4] = 90;
        data[5] = 95;
        data
    }

    #[test]
    fn test_track_confirmed_after_min_hits_frames() {
        let mut pipeline = DetectionPipeline::new(config(5)).unwrap();
        let data = person_tensor_data();
        let quant = Quantization::new(0.01, 0);

        // first frame publishes the initial (empty) track set
        let tensor = TensorView::from_slice_u8(&data, (1, 1, 18), quant).unwrap();
        assert_eq!(pipeline.process_frame(&[tensor]).unwrap(), Some(Vec::new()));

        // the track stays tentative through frame 4
        for _ in 0..3 {
            let tensor = TensorView::from_slice_u8(&data, (1, 1, 18), quant).unwrap();
            assert!(pipeline.process_frame(&[tensor]).unwrap().is_none());
        }

        let tensor = TensorView::from_slice_u8(&data, (1, 1, 18), quant).unwrap();
        let records = pipeline.process_frame(&[tensor]).unwrap().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].track_id, 1);
        assert_eq!(records[0].label, "person");
        assert!((records[0].center_x - 0.5).abs() < 1e-2);
        assert!((records[0].width - 0.5).abs() < 1e-2);
    }

    #[test]
    fn test_stable_scene_gated_after_confirmation() {
        let mut pipeline = DetectionPipeline::new(config(1)).unwrap();
        let data = person_tensor_data();
        let quant = Quantization::new(0.01, 0);

        let tensor = TensorView::from_slice_u8(&data, (1, 1, 18), quant).unwrap();
        let records = pipeline.process_frame(&[tensor]).unwrap().unwrap();
        assert_eq!(records.len(), 1);

        // identical frames settle into suppression once the motion model
        // converges on the stationary box
        let mut suppressed = 0;
        for _ in 0..10 {
            let tensor = TensorView::from_slice_u8(&data, (1, 1, 18), quant).unwrap();
            if pipeline.process_frame(&[tensor]).unwrap().is_none() {
                suppressed += 1;
            }
        }
        assert!(suppressed > 0);
    }

    #[test]
    fn test_empty_frames_publish_once() {
        let mut pipeline = DetectionPipeline::new(config(1)).unwrap();
        let data = vec![0u8; 18];
        let quant = Quantization::new(0.01, 0);

        let tensor = TensorView::from_slice_u8(&data, (1, 1, 18), quant).unwrap();
        assert_eq!(pipeline.process_frame(&[tensor]).unwrap(), Some(Vec::new()));
        let tensor = TensorView::from_slice_u8(&data, (1, 1, 18), quant).unwrap();
        assert!(pipeline.process_frame(&[tensor]).unwrap().is_none());
    }

    #[test]
    fn test_clamp_keeps_edge_crossing_box_size() {
        use edgetrack_decoder::{BoundingBox, Detection};

        let crossing = Detection::new(
            BoundingBox::new(0.9, -0.1, 0.3, 0.3),
            1,
            "person".into(),
            0.9,
        )
        .unwrap();
        let bbox = clamp_box(&crossing);
        // origin floored at zero, size preserved
        assert!((bbox[0] - 0.9).abs() < 1e-6);
        assert!((bbox[1] - 0.0).abs() < 1e-6);
        assert!((bbox[2] - 1.2).abs() < 1e-6);
        assert!((bbox[3] - 0.3).abs() < 1e-6);

        let oversized = Detection::new(
            BoundingBox::new(0.0, 0.0, 1.5, 1.5),
            1,
            "person".into(),
            0.9,
        )
        .unwrap();
        let bbox = clamp_box(&oversized);
        assert!((bbox[2] - 1.0).abs() < 1e-6);
        assert!((bbox[3] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
decoder:
  detection_threshold: 0.3
  iou_threshold: 0.45
  max_boxes: 50
  labels: [background, person]
  anchors:
    - [[16.0, 16.0], [32.0, 32.0], [48.0, 48.0]]
tracker:
  max_age: 10
  min_hits: 3
"#;
        let config = PipelineConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.tracker.max_age, 10);
        assert_eq!(config.tracker.min_hits, 3);
        // unset tracker fields take defaults
        assert!((config.tracker.dt - 1.0).abs() < 1e-6);
        assert!(DetectionPipeline::new(config).is_ok());
    }
}
