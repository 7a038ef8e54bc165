//! ByteTrack association driving the pipeline's [`ObjectTracker`] contract.

use std::collections::{HashMap, HashSet};
use std::convert::Infallible;

use tracing::trace;

use crate::config::TrackerConfig;
use crate::entity::{BoundingBox, Frame, Track, TrackState};
use crate::integration::ObjectTracker;
use crate::tracker::kalman_filter::KalmanFilter;
use crate::tracker::matching::{self, AssignmentResult};
use crate::tracker::tracklet::{Tracklet, TrackletState};

/// Detections at or below this score are discarded outright.
const MIN_DETECTION_SCORE: f32 = 0.1;
/// Match threshold for the low-score recovery pass.
const LOW_SCORE_MATCH_THRESH: f64 = 0.5;
/// Match threshold for tracklets seen on a single frame so far.
const UNCONFIRMED_MATCH_THRESH: f64 = 0.7;
/// IoU above which a tracked and a lost tracklet are treated as the same target.
const DUPLICATE_IOU: f64 = 0.85;

/// Multi-object tracker implementing ByteTrack.
///
/// Track ids are drawn from a counter owned by this instance and start at 1.
/// Alongside the tracklets it keeps one [`Track`] record per live target, so the
/// center history written by the pipeline survives between frames and across a
/// short loss.
pub struct ByteTracker {
    tracked: Vec<Tracklet>,
    lost: Vec<Tracklet>,
    frame_id: u32,
    config: TrackerConfig,
    max_time_lost: u32,
    kalman_filter: KalmanFilter,
    last_id: u64,
    reported: Vec<Track>,
    parked: HashMap<u64, Track>,
}

impl Default for ByteTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

impl ByteTracker {
    pub fn new(config: TrackerConfig) -> Self {
        let max_time_lost = (config.frame_rate / 30.0 * config.track_buffer as f32) as u32;
        Self {
            tracked: Vec::new(),
            lost: Vec::new(),
            frame_id: 0,
            config,
            max_time_lost,
            kalman_filter: KalmanFilter::default(),
            last_id: 0,
            reported: Vec::new(),
            parked: HashMap::new(),
        }
    }

    /// Frames processed so far.
    pub fn frame_count(&self) -> u32 {
        self.frame_id
    }

    /// Targets currently lost but still eligible for recovery.
    pub fn lost_count(&self) -> usize {
        self.lost.len()
    }

    fn next_track_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }

    /// Run one frame of ByteTrack association and return the confirmed tracklets.
    fn associate(&mut self, detections: Vec<BoundingBox>) -> Vec<Tracklet> {
        self.frame_id += 1;
        let frame_id = self.frame_id;
        let kf = &self.kalman_filter;

        let (high, low): (Vec<BoundingBox>, Vec<BoundingBox>) = detections
            .into_iter()
            .filter(|d| d.confidence > MIN_DETECTION_SCORE)
            .partition(|d| d.confidence >= self.config.track_thresh);
        let high: Vec<Tracklet> = high.into_iter().map(Tracklet::new).collect();
        let low: Vec<Tracklet> = low.into_iter().map(Tracklet::new).collect();

        let (confirmed, unconfirmed): (Vec<Tracklet>, Vec<Tracklet>) =
            self.tracked.drain(..).partition(|t| t.is_activated);
        let mut pool = join_tracklets(confirmed, &self.lost);
        for t in pool.iter_mut() {
            t.predict(kf);
        }

        let mut activated = Vec::new();
        let mut refound = Vec::new();
        let mut lost = Vec::new();

        // First pass: high-score detections against every confirmed or lost tracklet.
        let mut dists = matching::iou_distance(&boxes(&pool), &boxes(&high));
        matching::fuse_score(&mut dists, &scores(&high));
        let AssignmentResult {
            matches,
            unmatched_tracks,
            unmatched_detections,
        } = matching::linear_assignment(&dists, self.config.match_thresh as f64);

        for (itrack, idet) in matches {
            let track = pool[itrack].clone();
            absorb(track, &high[idet], kf, frame_id, &mut activated, &mut refound);
        }

        // Second pass: low-score detections recover tracklets that were still being tracked.
        let remaining: Vec<Tracklet> = unmatched_tracks
            .iter()
            .map(|&i| &pool[i])
            .filter(|t| t.state == TrackletState::Tracked)
            .cloned()
            .collect();
        let dists = matching::iou_distance(&boxes(&remaining), &boxes(&low));
        let second = matching::linear_assignment(&dists, LOW_SCORE_MATCH_THRESH);

        for (itrack, idet) in second.matches {
            let track = remaining[itrack].clone();
            absorb(track, &low[idet], kf, frame_id, &mut activated, &mut refound);
        }
        for i in second.unmatched_tracks {
            let mut track = remaining[i].clone();
            track.mark_lost();
            lost.push(track);
        }

        // Tracklets born last frame get one chance against the leftover high-score detections.
        let leftover: Vec<Tracklet> =
            unmatched_detections.iter().map(|&i| high[i].clone()).collect();
        let mut dists = matching::iou_distance(&boxes(&unconfirmed), &boxes(&leftover));
        matching::fuse_score(&mut dists, &scores(&leftover));
        let third = matching::linear_assignment(&dists, UNCONFIRMED_MATCH_THRESH);

        let mut unconfirmed = unconfirmed;
        for (itrack, idet) in third.matches {
            unconfirmed[itrack].update(&leftover[idet], kf, frame_id);
            activated.push(unconfirmed[itrack].clone());
        }

        // Whatever is still unmatched and confident enough starts a new track.
        for idet in third.unmatched_detections {
            let mut track = leftover[idet].clone();
            if track.score < self.config.track_thresh + 0.1 {
                continue;
            }
            let id = self.next_track_id();
            track.activate(&self.kalman_filter, id, frame_id);
            activated.push(track);
        }

        for track in self.lost.drain(..) {
            if frame_id - track.end_frame() <= self.max_time_lost {
                lost.push(track);
            }
        }

        let tracked: Vec<Tracklet> = activated
            .into_iter()
            .chain(refound)
            .filter(|t| t.state == TrackletState::Tracked)
            .collect();
        let lost = sub_tracklets(lost, &tracked);
        let (tracked, lost) = remove_duplicate_tracklets(tracked, lost);
        self.tracked = tracked;
        self.lost = lost;

        trace!(
            frame = frame_id,
            tracked = self.tracked.len(),
            lost = self.lost.len(),
            "bytetrack association"
        );

        self.tracked.iter().filter(|t| t.is_activated).cloned().collect()
    }

    /// Rebuild the reported track list from the confirmed tracklets.
    fn refresh_reports(&mut self, confirmed: Vec<Tracklet>) {
        let mut previous: HashMap<u64, Track> = self
            .reported
            .drain(..)
            .map(|t| (t.track_id, t))
            .collect();

        for tracklet in confirmed {
            let bbox = tracklet.bbox();
            let mut track = previous
                .remove(&tracklet.track_id)
                .or_else(|| self.parked.remove(&tracklet.track_id))
                .unwrap_or_else(|| Track::new(tracklet.track_id, bbox));
            track.bbox = bbox;
            track.velocity = tracklet.velocity();
            track.state = TrackState::Active;
            track.age += 1;
            self.reported.push(track);
        }

        let lost_ids: HashSet<u64> = self.lost.iter().map(|t| t.track_id).collect();
        for (id, mut track) in previous {
            if lost_ids.contains(&id) {
                track.state = TrackState::Lost;
                self.parked.insert(id, track);
            }
        }
        self.parked.retain(|id, _| lost_ids.contains(id));
    }
}

impl ObjectTracker for ByteTracker {
    type Error = Infallible;

    fn update(
        &mut self,
        _frame: &Frame,
        detections: Vec<BoundingBox>,
    ) -> Result<&mut [Track], Self::Error> {
        let confirmed = self.associate(detections);
        self.refresh_reports(confirmed);
        Ok(self.reported.as_mut_slice())
    }
}

/// Continue a tracked tracklet, or bring a lost one back.
fn absorb(
    mut track: Tracklet,
    detection: &Tracklet,
    kf: &KalmanFilter,
    frame_id: u32,
    activated: &mut Vec<Tracklet>,
    refound: &mut Vec<Tracklet>,
) {
    if track.state == TrackletState::Tracked {
        track.update(detection, kf, frame_id);
        activated.push(track);
    } else {
        track.re_activate(detection, kf, frame_id);
        refound.push(track);
    }
}

fn boxes(tracklets: &[Tracklet]) -> Vec<BoundingBox> {
    tracklets.iter().map(Tracklet::bbox).collect()
}

fn scores(tracklets: &[Tracklet]) -> Vec<f32> {
    tracklets.iter().map(|t| t.score).collect()
}

/// Union by track id, keeping the first occurrence.
fn join_tracklets(a: Vec<Tracklet>, b: &[Tracklet]) -> Vec<Tracklet> {
    let mut seen: HashSet<u64> = a.iter().map(|t| t.track_id).collect();
    let mut joined = a;
    for t in b {
        if seen.insert(t.track_id) {
            joined.push(t.clone());
        }
    }
    joined
}

/// Tracklets of `a` whose id does not appear in `b`.
fn sub_tracklets(a: Vec<Tracklet>, b: &[Tracklet]) -> Vec<Tracklet> {
    let ids: HashSet<u64> = b.iter().map(|t| t.track_id).collect();
    a.into_iter().filter(|t| !ids.contains(&t.track_id)).collect()
}

/// Resolve tracked/lost pairs covering the same target, keeping the longer-lived one.
fn remove_duplicate_tracklets(
    tracked: Vec<Tracklet>,
    lost: Vec<Tracklet>,
) -> (Vec<Tracklet>, Vec<Tracklet>) {
    if tracked.is_empty() || lost.is_empty() {
        return (tracked, lost);
    }

    let ious = matching::iou_matrix(&boxes(&tracked), &boxes(&lost));
    let mut drop_tracked = vec![false; tracked.len()];
    let mut drop_lost = vec![false; lost.len()];

    for ((i, j), &iou) in ious.indexed_iter() {
        if iou > DUPLICATE_IOU {
            let age_tracked = tracked[i].frame_id - tracked[i].start_frame;
            let age_lost = lost[j].frame_id - lost[j].start_frame;
            if age_tracked > age_lost {
                drop_lost[j] = true;
            } else {
                drop_tracked[i] = true;
            }
        }
    }

    let keep = |items: Vec<Tracklet>, dropped: &[bool]| -> Vec<Tracklet> {
        items
            .into_iter()
            .zip(dropped)
            .filter_map(|(t, &d)| (!d).then_some(t))
            .collect()
    };
    (keep(tracked, &drop_tracked), keep(lost, &drop_lost))
}
