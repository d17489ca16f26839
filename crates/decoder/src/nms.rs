use crate::Detection;

/// Greedy per-class non-max suppression with a hard cap on the merged
/// result set.
#[derive(Debug, Clone, Copy)]
pub struct SuppressionEngine {
    iou_threshold: f32,
    max_boxes: usize,
}

impl SuppressionEngine {
    pub fn new(iou_threshold: f32, max_boxes: usize) -> Self {
        Self {
            iou_threshold,
            max_boxes,
        }
    }

    /// Suppresses same-class duplicates and truncates the survivors to the
    /// highest-confidence `max_boxes` entries.
    pub fn suppress(&self, mut detections: Vec<Detection>) -> Vec<Detection> {
        // Boxes get sorted by confidence in descending order so suppression
        // decisions only ever flow from stronger to weaker boxes.
        detections.sort_by(|a, b| b.confidence().total_cmp(&a.confidence()));

        let mut suppressed = vec![false; detections.len()];
        for i in 0..detections.len() {
            if suppressed[i] {
                continue;
            }
            for j in (i + 1)..detections.len() {
                if suppressed[j] || detections[j].class_id != detections[i].class_id {
                    continue;
                }
                if detections[j].bbox.iou(&detections[i].bbox) >= self.iou_threshold {
                    suppressed[j] = true;
                }
            }
        }

        let mut kept: Vec<Detection> = detections
            .into_iter()
            .zip(suppressed)
            .filter_map(|(d, s)| (!s).then_some(d))
            .collect();

        // kept is still sorted by confidence, so truncation keeps the top
        // max_boxes entries.
        kept.truncate(self.max_boxes);
        kept
    }
}
