//! Tracked entity with a bounded center-point history.

use std::collections::VecDeque;

use crate::entity::BoundingBox;

/// Maximum number of past centers a track keeps.
pub const HISTORY_CAPACITY: usize = 300;

/// Lifecycle tag reported by the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackState {
    #[default]
    Active,
    Lost,
}

/// A single tracked person.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    /// Identifier, unique among the tracker's live tracks
    pub track_id: u64,
    /// Box for the current frame
    pub bbox: BoundingBox,
    /// (dx, dy) in pixels per frame, supplied by the tracker
    pub velocity: (f64, f64),
    /// Past centers, oldest first
    pub history: VecDeque<(i32, i32)>,
    pub state: TrackState,
    /// Frames this track has been observed
    pub age: u32,
}

impl Track {
    pub fn new(track_id: u64, bbox: BoundingBox) -> Self {
        Self {
            track_id,
            bbox,
            velocity: (0.0, 0.0),
            history: VecDeque::with_capacity(HISTORY_CAPACITY),
            state: TrackState::Active,
            age: 0,
        }
    }

    /// Append the current center, evicting the oldest point once over capacity.
    pub fn update_history(&mut self) {
        self.history.push_back(self.bbox.center());
        while self.history.len() > HISTORY_CAPACITY {
            self.history.pop_front();
        }
    }

    pub fn center(&self) -> (i32, i32) {
        self.bbox.center()
    }

    /// Magnitude of the velocity vector.
    pub fn speed(&self) -> f64 {
        self.velocity.0.hypot(self.velocity.1)
    }

    pub fn is_active(&self) -> bool {
        self.state == TrackState::Active
    }
}
