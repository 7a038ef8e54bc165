//! Internal ByteTrack tracklet with Kalman motion state.

use crate::entity::BoundingBox;
use crate::tracker::kalman_filter::{KalmanFilter, StateCovariance, StateVector};

/// ByteTrack lifecycle, finer grained than the reported [`crate::TrackState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackletState {
    /// Created from a detection, not yet started
    #[default]
    New,
    Tracked,
    Lost,
}

#[derive(Debug, Clone)]
pub struct Tracklet {
    /// 0 until activated
    pub track_id: u64,
    pub state: TrackletState,
    /// Confirmed by a second association or born on the first frame
    pub is_activated: bool,
    pub score: f32,
    pub class_id: u32,
    /// Last frame this tracklet was associated
    pub frame_id: u32,
    pub start_frame: u32,
    pub tracklet_len: u32,
    motion: Option<(StateVector, StateCovariance)>,
    /// Latest associated detection
    detection: BoundingBox,
}

impl Tracklet {
    pub fn new(detection: BoundingBox) -> Self {
        Self {
            track_id: 0,
            state: TrackletState::New,
            is_activated: false,
            score: detection.confidence,
            class_id: detection.class_id,
            frame_id: 0,
            start_frame: 0,
            tracklet_len: 0,
            motion: None,
            detection,
        }
    }

    /// Current box: the Kalman estimate once started, otherwise the raw detection.
    pub fn bbox(&self) -> BoundingBox {
        match &self.motion {
            Some((mean, _)) => BoundingBox::from_xyah(
                mean[0],
                mean[1],
                mean[2],
                mean[3],
                self.score,
                self.class_id,
            ),
            None => self.detection,
        }
    }

    /// Center velocity in pixels per frame.
    pub fn velocity(&self) -> (f64, f64) {
        self.motion
            .as_ref()
            .map_or((0.0, 0.0), |(mean, _)| (mean[4], mean[5]))
    }

    pub fn end_frame(&self) -> u32 {
        self.frame_id
    }

    /// Start a new track under `track_id`.
    pub fn activate(&mut self, kalman_filter: &KalmanFilter, track_id: u64, frame_id: u32) {
        self.track_id = track_id;
        self.motion = Some(kalman_filter.initiate(self.detection.to_xyah()));
        self.tracklet_len = 0;
        self.state = TrackletState::Tracked;
        self.is_activated = frame_id == 1;
        self.frame_id = frame_id;
        self.start_frame = frame_id;
    }

    /// Resume a lost track with a fresh detection, keeping its id.
    pub fn re_activate(
        &mut self,
        detection: &Tracklet,
        kalman_filter: &KalmanFilter,
        frame_id: u32,
    ) {
        self.correct(detection, kalman_filter);
        self.tracklet_len = 0;
        self.state = TrackletState::Tracked;
        self.is_activated = true;
        self.frame_id = frame_id;
    }

    pub fn update(&mut self, detection: &Tracklet, kalman_filter: &KalmanFilter, frame_id: u32) {
        self.correct(detection, kalman_filter);
        self.tracklet_len += 1;
        self.state = TrackletState::Tracked;
        self.is_activated = true;
        self.frame_id = frame_id;
    }

    fn correct(&mut self, detection: &Tracklet, kalman_filter: &KalmanFilter) {
        if let Some((mean, cov)) = &self.motion {
            self.motion = Some(kalman_filter.update(mean, cov, detection.detection.to_xyah()));
        }
        self.detection = detection.detection;
        self.score = detection.score;
        self.class_id = detection.class_id;
    }

    pub fn predict(&mut self, kalman_filter: &KalmanFilter) {
        if let Some((mean, cov)) = &self.motion {
            let mut mean = *mean;
            if self.state != TrackletState::Tracked {
                // Freeze height velocity while the target is not observed.
                mean[7] = 0.0;
            }
            self.motion = Some(kalman_filter.predict(&mean, cov));
        }
    }

    pub fn mark_lost(&mut self) {
        self.state = TrackletState::Lost;
    }
}
