//! FramePipeline: one analytics cycle from raw frame to frame result.

use std::sync::Arc;

use tracing::debug;

use crate::analytics::{BehaviorAnalyzer, GroupClusterer};
use crate::config::AnalyticsConfig;
use crate::entity::{FrameData, Track};
use crate::error::PipelineError;

use super::{ObjectDetector, ObjectTracker, VideoSource};

/// Result of a single [`FramePipeline::step`].
#[derive(Debug, Clone)]
pub enum StepOutcome {
    Frame(FrameData),
    /// The source had no frame; nothing was consumed or mutated.
    EndOfStream,
}

/// Bundles a video source, a detector and a tracker with the analytics stages.
///
/// The pipeline owns its tracker, so independent pipelines never share tracking state.
pub struct FramePipeline<S, D, T> {
    source: S,
    detector: D,
    tracker: T,
    clusterer: GroupClusterer,
    analyzer: BehaviorAnalyzer,
    frame_id: u64,
}

impl<S, D, T> FramePipeline<S, D, T>
where
    S: VideoSource,
    D: ObjectDetector,
    T: ObjectTracker,
{
    pub fn new(source: S, detector: D, tracker: T, config: AnalyticsConfig) -> Self {
        Self {
            source,
            detector,
            tracker,
            clusterer: GroupClusterer::new(config.group_distance_threshold),
            analyzer: BehaviorAnalyzer::new(config),
            frame_id: 0,
        }
    }

    /// Create a pipeline with default analytics thresholds.
    pub fn with_default_config(source: S, detector: D, tracker: T) -> Self {
        Self::new(source, detector, tracker, AnalyticsConfig::default())
    }

    /// Run one cycle.
    ///
    /// Pulls a frame, detects, tracks, appends each reported track's current
    /// center to its history, then groups and analyzes. The frame counter only
    /// advances when a [`FrameData`] is produced; end-of-stream and faults leave it,
    /// and every track history, untouched.
    pub fn step(&mut self) -> Result<StepOutcome, PipelineError> {
        let Some(frame) = self
            .source
            .next_frame()
            .map_err(|e| PipelineError::Source(Box::new(e)))?
        else {
            return Ok(StepOutcome::EndOfStream);
        };

        let detections = self
            .detector
            .detect(&frame)
            .map_err(|e| PipelineError::Detector(Box::new(e)))?;
        let num_detections = detections.len();

        let live = self
            .tracker
            .update(&frame, detections)
            .map_err(|e| PipelineError::Tracker(Box::new(e)))?;
        for track in live.iter_mut() {
            track.update_history();
        }
        let tracks: Vec<Track> = live.to_vec();

        let groups = self.clusterer.cluster(&tracks);
        let alerts = self.analyzer.analyze(&tracks, &groups);

        self.frame_id += 1;
        debug!(
            frame_id = self.frame_id,
            detections = num_detections,
            tracks = tracks.len(),
            groups = groups.len(),
            alerts = alerts.len(),
            "frame analyzed"
        );

        Ok(StepOutcome::Frame(FrameData {
            frame_id: self.frame_id,
            image: Arc::new(frame),
            tracks,
            groups,
            alerts,
        }))
    }

    /// Id of the last produced frame, 0 before the first.
    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }

    pub fn frame_rate(&self) -> f64 {
        self.source.frame_rate()
    }

    /// Release the video source.
    pub fn release(&mut self) {
        self.source.release();
    }

    /// Get a reference to the underlying detector.
    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Get a reference to the underlying tracker.
    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    /// Get a reference to the underlying video source.
    pub fn source(&self) -> &S {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{BoundingBox, Frame};
    use std::collections::VecDeque;
    use std::convert::Infallible;
    use std::io;

    struct MockSource {
        frames: VecDeque<Frame>,
    }

    impl MockSource {
        fn with_frames(n: u64) -> Self {
            Self {
                frames: (0..n).map(|i| Frame::blank(i, 4, 4)).collect(),
            }
        }
    }

    impl VideoSource for MockSource {
        type Error = Infallible;

        fn next_frame(&mut self) -> Result<Option<Frame>, Self::Error> {
            Ok(self.frames.pop_front())
        }

        fn frame_rate(&self) -> f64 {
            30.0
        }

        fn release(&mut self) {}
    }

    /// Yields frames but fails on its second read.
    struct BrokenSource {
        reads: u64,
    }

    impl VideoSource for BrokenSource {
        type Error = io::Error;

        fn next_frame(&mut self) -> Result<Option<Frame>, Self::Error> {
            self.reads += 1;
            if self.reads == 2 {
                return Err(io::Error::other("read timeout"));
            }
            Ok(Some(Frame::blank(self.reads, 4, 4)))
        }

        fn frame_rate(&self) -> f64 {
            30.0
        }

        fn release(&mut self) {}
    }

    struct MockDetector {
        detections: Vec<BoundingBox>,
        fail_on: Option<u64>,
    }

    impl ObjectDetector for MockDetector {
        type Error = io::Error;

        fn detect(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>, Self::Error> {
            if self.fail_on == Some(frame.sequence) {
                return Err(io::Error::other("inference failed"));
            }
            Ok(self.detections.clone())
        }
    }

    /// Assigns ids by detection index and keeps tracks between calls.
    #[derive(Default)]
    struct IndexTracker {
        tracks: Vec<Track>,
        calls: usize,
    }

    impl ObjectTracker for IndexTracker {
        type Error = Infallible;

        fn update(
            &mut self,
            _frame: &Frame,
            detections: Vec<BoundingBox>,
        ) -> Result<&mut [Track], Self::Error> {
            self.calls += 1;
            self.tracks.truncate(detections.len());
            for (i, det) in detections.into_iter().enumerate() {
                match self.tracks.get_mut(i) {
                    Some(track) => {
                        track.bbox = det;
                        track.age += 1;
                    }
                    None => {
                        let mut track = Track::new(i as u64 + 1, det);
                        track.age = 1;
                        self.tracks.push(track);
                    }
                }
            }
            Ok(self.tracks.as_mut_slice())
        }
    }

    fn people() -> Vec<BoundingBox> {
        vec![
            BoundingBox::new(0, 0, 20, 40, 0.9, 0),
            BoundingBox::new(50, 0, 70, 40, 0.9, 0),
        ]
    }

    #[test]
    fn test_frame_ids_are_sequential() {
        let detector = MockDetector {
            detections: people(),
            fail_on: None,
        };
        let mut pipeline = FramePipeline::with_default_config(
            MockSource::with_frames(3),
            detector,
            IndexTracker::default(),
        );

        let mut ids = Vec::new();
        while let StepOutcome::Frame(data) = pipeline.step().unwrap() {
            ids.push(data.frame_id);
        }
        assert_eq!(ids, vec![1, 2, 3]);

        // Exhaustion consumes no id and does not touch the tracker.
        assert!(matches!(pipeline.step().unwrap(), StepOutcome::EndOfStream));
        assert_eq!(pipeline.frame_id(), 3);
        assert_eq!(pipeline.tracker().calls, 3);
    }

    #[test]
    fn test_history_grows_once_per_frame() {
        let detector = MockDetector {
            detections: people(),
            fail_on: None,
        };
        let mut pipeline = FramePipeline::with_default_config(
            MockSource::with_frames(4),
            detector,
            IndexTracker::default(),
        );

        let mut last = None;
        while let StepOutcome::Frame(data) = pipeline.step().unwrap() {
            last = Some(data);
        }
        let data = last.unwrap();
        assert_eq!(data.tracks.len(), 2);
        assert!(data.tracks.iter().all(|t| t.history.len() == 4));
        assert_eq!(data.groups.len(), 1);
        assert!(data.alerts.is_empty());
    }

    #[test]
    fn test_detector_fault_skips_cycle() {
        let detector = MockDetector {
            detections: people(),
            fail_on: Some(1),
        };
        let mut pipeline = FramePipeline::with_default_config(
            MockSource::with_frames(3),
            detector,
            IndexTracker::default(),
        );

        assert!(matches!(pipeline.step(), Ok(StepOutcome::Frame(_))));
        assert!(matches!(pipeline.step(), Err(PipelineError::Detector(_))));
        assert_eq!(pipeline.frame_id(), 1);
        assert_eq!(pipeline.tracker().calls, 1);

        match pipeline.step().unwrap() {
            StepOutcome::Frame(data) => {
                assert_eq!(data.frame_id, 2);
                assert_eq!(data.image.sequence, 2);
                assert!(data.tracks.iter().all(|t| t.history.len() == 2));
            }
            StepOutcome::EndOfStream => panic!("expected a frame"),
        }
    }

    #[test]
    fn test_source_fault_skips_cycle() {
        let detector = MockDetector {
            detections: people(),
            fail_on: None,
        };
        let mut pipeline = FramePipeline::with_default_config(
            BrokenSource { reads: 0 },
            detector,
            IndexTracker::default(),
        );

        assert!(matches!(pipeline.step(), Ok(StepOutcome::Frame(_))));
        assert!(matches!(pipeline.step(), Err(PipelineError::Source(_))));
        assert_eq!(pipeline.frame_id(), 1);
        assert_eq!(pipeline.tracker().calls, 1);

        match pipeline.step().unwrap() {
            StepOutcome::Frame(data) => {
                assert_eq!(data.frame_id, 2);
                assert!(data.tracks.iter().all(|t| t.history.len() == 2));
            }
            StepOutcome::EndOfStream => panic!("expected a frame"),
        }
    }
}
