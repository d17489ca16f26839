use crate::{
    error::{Error, Result},
    layer::NUM_ANCHORS,
};
use serde::{Deserialize, Serialize};

/// Activation applied to confidence and class channels after dequantization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputActivation {
    #[default]
    None,
    Sigmoid,
}

fn default_label_offset() -> usize {
    1
}

/// Decode configuration for one anchor-based detection model.
///
/// `labels` maps class ids to names with entry 0 reserved for background, so
/// `labels.len() - 1` must match the class channel count of the output
/// tensors. `anchors` holds one `(width, height)` triple per output scale in
/// pixel units, ordered smallest tensor first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecoderConfig {
    pub detection_threshold: f32,
    pub iou_threshold: f32,
    pub max_boxes: usize,
    pub labels: Vec<String>,
    #[serde(default)]
    pub output_activation: OutputActivation,
    #[serde(default = "default_label_offset")]
    pub label_offset: usize,
    pub anchors: Vec<[[f32; 2]; NUM_ANCHORS]>,
}

impl DecoderConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: DecoderConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: DecoderConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.detection_threshold > 0.0 && self.detection_threshold <= 1.0) {
            return Err(Error::Config(format!(
                "detection_threshold {} must be in (0, 1]",
                self.detection_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return Err(Error::Config(format!(
                "iou_threshold {} must be in [0, 1]",
                self.iou_threshold
            )));
        }
        if self.max_boxes == 0 {
            return Err(Error::Config("max_boxes must be greater than 0".into()));
        }
        if self.labels.len() < 2 {
            return Err(Error::Config(
                "labels must contain the background entry and at least one class".into(),
            ));
        }
        if self.label_offset == 0 {
            return Err(Error::Config(
                "label_offset must be at least 1; id 0 is the background entry".into(),
            ));
        }
        if self.anchors.is_empty() {
            return Err(Error::Config(
                "anchors must contain at least one per-scale triple".into(),
            ));
        }
        Ok(())
    }

    /// Number of real (non-background) classes.
    pub fn class_count(&self) -> usize {
        self.labels.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> DecoderConfig {
        DecoderConfig {
            detection_threshold: 0.3,
            iou_threshold: 0.45,
            max_boxes: 100,
            labels: vec!["background".into(), "person".into(), "car".into()],
            output_activation: OutputActivation::Sigmoid,
            label_offset: 1,
            anchors: vec![[[10.0, 13.0], [16.0, 30.0], [33.0, 23.0]]],
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(config().validate().is_ok());
        assert_eq!(config().class_count(), 2);
    }

    #[test]
    fn test_invalid_thresholds() {
        let mut c = config();
        c.detection_threshold = 0.0;
        assert!(matches!(c.validate(), Err(Error::Config(_))));
        c.detection_threshold = 1.5;
        assert!(matches!(c.validate(), Err(Error::Config(_))));
        c.detection_threshold = f32::NAN;
        assert!(matches!(c.validate(), Err(Error::Config(_))));

        let mut c = config();
        c.iou_threshold = -0.1;
        assert!(matches!(c.validate(), Err(Error::Config(_))));
        c.iou_threshold = 1.1;
        assert!(matches!(c.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_invalid_limits() {
        let mut c = config();
        c.max_boxes = 0;
        assert!(matches!(c.validate(), Err(Error::Config(_))));

        let mut c = config();
        c.labels = vec!["background".into()];
        assert!(matches!(c.validate(), Err(Error::Config(_))));

        let mut c = config();
        c.anchors.clear();
        assert!(matches!(c.validate(), Err(Error::Config(_))));

        let mut c = config();
        c.label_offset = 0;
        assert!(matches!(c.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
detection_threshold: 0.3
iou_threshold: 0.45
max_boxes: 50
labels: [background, person]
output_activation: sigmoid
anchors:
  - [[10.0, 13.0], [16.0, 30.0], [33.0, 23.0]]
"#;
        let config = DecoderConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.max_boxes, 50);
        assert_eq!(config.output_activation, OutputActivation::Sigmoid);
        assert_eq!(config.label_offset, 1);
        assert_eq!(config.anchors.len(), 1);
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "detection_threshold": 0.25,
            "iou_threshold": 0.5,
            "max_boxes": 10,
            "labels": ["background", "person"],
            "anchors": [[[10.0, 13.0], [16.0, 30.0], [33.0, 23.0]]]
        }"#;
        let config = DecoderConfig::from_json_str(json).unwrap();
        assert_eq!(config.output_activation, OutputActivation::None);
        assert_eq!(config.max_boxes, 10);
    }
}
