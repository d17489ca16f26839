//! Per-class multi-object tracking with a constant-velocity motion model and
//! optimal detection-to-track assignment.

mod kalman;
mod sort;

pub use kalman::ConstantVelocityBoxFilter;
pub use sort::{SortConfig, SortTracker};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug)]
pub enum Error {
    Config(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "configuration error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

/// One detection handed to a tracker, already filtered and grouped by class.
/// The bbox is normalized `[xmin, ymin, xmax, ymax]`.
#[derive(Debug, Clone, Copy)]
pub struct Observation {
    pub bbox: [f32; 4],
    pub score: f32,
}

/// Track lifecycle. Deleted is terminal; deleted tracks are removed and their
/// ids are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    Tentative,
    Confirmed,
    Deleted,
}

/// Snapshot of a confirmed track that was updated this frame. The bbox is the
/// corrected motion-model estimate in `[xmin, ymin, xmax, ymax]`.
#[derive(Debug, Clone, Copy)]
pub struct TrackReport {
    pub id: u64,
    pub bbox: [f32; 4],
    pub score: f32,
    /// Matched frames over the track's lifetime.
    pub hits: u32,
    /// Missed frames over the track's lifetime.
    pub age: u32,
}
