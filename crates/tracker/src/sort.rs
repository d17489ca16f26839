use crate::{
    kalman::ConstantVelocityBoxFilter, Error, Observation, Result, TrackReport, TrackState,
};
use lapjv::{lapjv, Matrix};
use log::debug;
use serde::{Deserialize, Serialize};

/// Cost assigned to pairings whose overlap falls below the gating threshold,
/// large enough that the solver never prefers them over a real match.
const INVALID_MATCH: f32 = 1_000_000.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SortConfig {
    /// Consecutive missed frames a track survives before removal.
    pub max_age: u32,
    /// Consecutive hits required before a track is confirmed and reported.
    pub min_hits: u32,
    /// Minimum IOU for a detection-to-track pairing to count as a match.
    pub iou_threshold: f32,
    /// Frame interval of the constant-velocity motion model.
    pub dt: f32,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            max_age: 30,
            min_hits: 5,
            iou_threshold: 0.3,
            dt: 1.0,
        }
    }
}

impl SortConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_hits == 0 {
            return Err(Error::Config("min_hits must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return Err(Error::Config(format!(
                "iou_threshold {} must be in [0, 1]",
                self.iou_threshold
            )));
        }
        if !(self.dt > 0.0 && self.dt.is_finite()) {
            return Err(Error::Config(format!("dt {} must be positive", self.dt)));
        }
        Ok(())
    }
}

struct Track {
    id: u64,
    filter: ConstantVelocityBoxFilter,
    state: TrackState,
    hits: u32,
    age: u32,
    time_since_update: u32,
    score: f32,
}

impl Track {
    fn bbox(&self) -> [f32; 4] {
        cxcywh_to_xyxy(self.filter.state())
    }
}

/// SORT tracker for a single object class. Call [`SortTracker::update`] once
/// per frame, with an empty slice on frames without detections, so coasting
/// tracks age and expire.
pub struct SortTracker {
    config: SortConfig,
    tracks: Vec<Track>,
    next_id: u64,
}

impl SortTracker {
    pub fn new(config: SortConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            tracks: Vec::new(),
            next_id: 1,
        })
    }

    /// Number of live tracks, confirmed or not.
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Advances every track one frame and folds in this frame's observations.
    /// Returns the confirmed tracks that matched a detection this frame,
    /// ordered by ascending id.
    pub fn update(&mut self, observations: &[Observation]) -> Vec<TrackReport> {
        for track in &mut self.tracks {
            track.filter.predict();
        }

        let mut matched_obs = vec![false; observations.len()];
        let mut matched_track = vec![false; self.tracks.len()];

        if !self.tracks.is_empty() && !observations.is_empty() {
            let costs = self.assignment_costs(observations);
            let assignments = lapjv(&costs).unwrap().0;
            for (row, &col) in assignments.iter().enumerate() {
                if row >= observations.len() || col >= self.tracks.len() {
                    continue;
                }
                if costs[(row, col)] >= INVALID_MATCH {
                    continue;
                }
                matched_obs[row] = true;
                matched_track[col] = true;

                let track = &mut self.tracks[col];
                track.filter.update(xyxy_to_cxcywh(observations[row].bbox));
                track.score = observations[row].score;
                track.time_since_update = 0;
                track.hits += 1;
                if track.state == TrackState::Tentative && track.hits >= self.config.min_hits {
                    track.state = TrackState::Confirmed;
                    debug!("track {} confirmed after {} hits", track.id, track.hits);
                }
            }
        }

        for (index, track) in self.tracks.iter_mut().enumerate() {
            if matched_track[index] {
                continue;
            }
            track.age += 1;
            track.time_since_update += 1;
            if track.time_since_update > self.config.max_age {
                track.state = TrackState::Deleted;
                debug!(
                    "track {} removed after {} missed frames",
                    track.id, track.time_since_update
                );
            }
        }
        self.tracks.retain(|track| track.state != TrackState::Deleted);

        for (index, observation) in observations.iter().enumerate() {
            if matched_obs[index] {
                continue;
            }
            let id = self.next_id;
            self.next_id += 1;
            let state = if self.config.min_hits <= 1 {
                TrackState::Confirmed
            } else {
                TrackState::Tentative
            };
            debug!("track {} created at {:?}", id, observation.bbox);
            self.tracks.push(Track {
                id,
                filter: ConstantVelocityBoxFilter::new(
                    xyxy_to_cxcywh(observation.bbox),
                    self.config.dt,
                ),
                state,
                hits: 1,
                age: 0,
                time_since_update: 0,
                score: observation.score,
            });
        }

        // Ids are monotonic and track order is insertion order, so the
        // reports come out sorted by id.
        self.tracks
            .iter()
            .filter(|track| track.state == TrackState::Confirmed && track.time_since_update == 0)
            .map(|track| TrackReport {
                id: track.id,
                bbox: track.bbox(),
                score: track.score,
                hits: track.hits,
                age: track.age,
            })
            .collect()
    }

    /// Square cost matrix over (observation, track) pairs: `1 - IOU` for
    /// gated pairs, [`INVALID_MATCH`] below the gate, zero in the padding
    /// rows/columns that square the matrix off.
    fn assignment_costs(&self, observations: &[Observation]) -> Matrix<f32> {
        let size = observations.len().max(self.tracks.len());
        Matrix::from_shape_fn((size, size), |(row, col)| {
            if row >= observations.len() || col >= self.tracks.len() {
                return 0.0;
            }
            let overlap = iou(&observations[row].bbox, &self.tracks[col].bbox());
            if overlap < self.config.iou_threshold {
                INVALID_MATCH
            } else {
                1.0 - overlap
            }
        })
    }
}

fn xyxy_to_cxcywh(bbox: [f32; 4]) -> [f32; 4] {
    let w = bbox[2] - bbox[0];
    let h = bbox[3] - bbox[1];
    [bbox[0] + w / 2.0, bbox[1] + h / 2.0, w, h]
}

fn cxcywh_to_xyxy(state: [f32; 4]) -> [f32; 4] {
    let [cx, cy, w, h] = state;
    [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0]
}

fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let left = a[0].max(b[0]);
    let top = a[1].max(b[1]);
    let right = a[2].min(b[2]);
    let bottom = a[3].min(b[3]);
    let intersection = (right - left).max(0.0) * (bottom - top).max(0.0);
    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    intersection / (area_a + area_b - intersection).max(1e-7)
}
