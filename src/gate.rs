use serde::Serialize;

/// Frames between forced emissions when the track set is unchanged.
pub const HEARTBEAT_INTERVAL: u32 = 30;

fn round3(value: f32) -> f32 {
    (value * 1000.0).round() / 1000.0
}

/// One published track in center form, coordinates rounded to three decimal
/// places.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackRecord {
    pub track_id: u64,
    pub label: String,
    pub center_x: f32,
    pub center_y: f32,
    pub width: f32,
    pub height: f32,
}

impl TrackRecord {
    /// Builds a record from a normalized `[xmin, ymin, xmax, ymax]` box.
    pub fn new(track_id: u64, label: String, bbox: [f32; 4]) -> Self {
        let [xmin, ymin, xmax, ymax] = bbox;
        Self {
            track_id,
            label,
            center_x: round3((xmin + xmax) / 2.0),
            center_y: round3((ymin + ymax) / 2.0),
            width: round3(xmax - xmin),
            height: round3(ymax - ymin),
        }
    }
}

/// Suppresses redundant track set emissions. A frame's records pass through
/// when they differ from the last emitted set, or when `heartbeat_interval`
/// frames have elapsed since the last emission.
///
/// Comparison happens on the rounded published form, so sub-millinormal
/// motion-model jitter does not count as a change.
pub struct TrackSetGate {
    heartbeat_interval: u32,
    frames_since_emit: u32,
    last_emitted: Option<Vec<TrackRecord>>,
}

impl TrackSetGate {
    pub fn new(heartbeat_interval: u32) -> Self {
        Self {
            heartbeat_interval,
            frames_since_emit: 0,
            last_emitted: None,
        }
    }

    /// Returns the records to publish for this frame, or `None` when the
    /// frame is suppressed. The very first frame always emits.
    pub fn filter(&mut self, records: Vec<TrackRecord>) -> Option<Vec<TrackRecord>> {
        self.frames_since_emit += 1;
        let changed = self.last_emitted.as_ref() != Some(&records);
        if changed || self.frames_since_emit >= self.heartbeat_interval {
            self.frames_since_emit = 0;
            self.last_emitted = Some(records.clone());
            Some(records)
        } else {
            None
        }
    }
}
