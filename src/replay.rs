//! Offline replay of recorded detections through the live pipeline.
//!
//! A detection log is a JSON-lines file with one object per frame:
//!
//! ```text
//! {"detections": [{"x1": 10, "y1": 20, "x2": 50, "y2": 120, "confidence": 0.9, "class_id": 0}]}
//! ```
//!
//! [`ReplaySource`] emits one blank frame per log entry and [`ReplayDetector`] answers
//! each frame with the detections recorded for it.

use std::convert::Infallible;
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use crate::entity::{BoundingBox, Frame};
use crate::error::ReplayError;
use crate::integration::{ObjectDetector, VideoSource};

#[derive(Debug, Deserialize)]
struct LogEntry {
    #[serde(default)]
    detections: Vec<BoundingBox>,
}

/// Recorded detections, indexed by frame sequence number.
#[derive(Debug, Clone, Default)]
pub struct DetectionLog {
    frames: Vec<Vec<BoundingBox>>,
}

impl DetectionLog {
    pub fn from_reader(reader: impl BufRead) -> Result<Self, ReplayError> {
        let mut frames = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line.map_err(|source| ReplayError::Io {
                path: "<reader>".into(),
                source,
            })?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: LogEntry = serde_json::from_str(&line).map_err(|source| ReplayError::Parse {
                line: idx + 1,
                source,
            })?;
            frames.push(entry.detections);
        }
        Ok(Self { frames })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ReplayError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| ReplayError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let log = Self::from_reader(std::io::BufReader::new(file))?;
        info!(path = %path.display(), frames = log.len(), "detection log loaded");
        Ok(log)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Detections for one frame; empty when out of range.
    pub fn detections(&self, sequence: u64) -> &[BoundingBox] {
        usize::try_from(sequence)
            .ok()
            .and_then(|i| self.frames.get(i))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Emits a blank frame for each entry of a detection log.
pub struct ReplaySource {
    total: u64,
    next: u64,
    width: u32,
    height: u32,
    frame_rate: f64,
    released: bool,
}

impl ReplaySource {
    pub fn new(log: &DetectionLog, width: u32, height: u32, frame_rate: f64) -> Self {
        Self {
            total: log.len() as u64,
            next: 0,
            width,
            height,
            frame_rate,
            released: false,
        }
    }

    /// Frames not yet emitted.
    pub fn remaining(&self) -> u64 {
        self.total - self.next
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl VideoSource for ReplaySource {
    type Error = Infallible;

    fn next_frame(&mut self) -> Result<Option<Frame>, Self::Error> {
        if self.released || self.next >= self.total {
            return Ok(None);
        }
        let frame = Frame::blank(self.next, self.width, self.height);
        self.next += 1;
        Ok(Some(frame))
    }

    fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    fn release(&mut self) {
        self.released = true;
    }
}

/// Answers each frame with the detections logged for its sequence number.
#[derive(Debug, Clone)]
pub struct ReplayDetector {
    log: Arc<DetectionLog>,
}

impl ReplayDetector {
    pub fn new(log: Arc<DetectionLog>) -> Self {
        Self { log }
    }
}

impl ObjectDetector for ReplayDetector {
    type Error = Infallible;

    fn detect(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>, Self::Error> {
        Ok(self.log.detections(frame.sequence).to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = r#"{"detections": [{"x1": 0, "y1": 0, "x2": 10, "y2": 20, "confidence": 0.9}]}

{"detections": []}
{}
"#;

    #[test]
    fn test_parse_skips_blank_lines() {
        let log = DetectionLog::from_reader(LOG.as_bytes()).unwrap();
        assert_eq!(log.len(), 3);
        assert_eq!(log.detections(0).len(), 1);
        assert_eq!(log.detections(0)[0].confidence, 0.9);
        assert!(log.detections(1).is_empty());
        assert!(log.detections(99).is_empty());
    }

    #[test]
    fn test_parse_error_reports_line() {
        let err = DetectionLog::from_reader("{}\n\nnot json\n".as_bytes()).unwrap_err();
        assert!(matches!(err, ReplayError::Parse { line: 3, .. }));
    }

    #[test]
    fn test_source_and_detector_line_up() {
        let log = Arc::new(DetectionLog::from_reader(LOG.as_bytes()).unwrap());
        let mut source = ReplaySource::new(&log, 8, 6, 25.0);
        let mut detector = ReplayDetector::new(Arc::clone(&log));

        let first = source.next_frame().unwrap().unwrap();
        assert_eq!(first.data.len(), 8 * 6 * 3);
        assert_eq!(detector.detect(&first).unwrap().len(), 1);

        assert!(source.next_frame().unwrap().is_some());
        assert!(source.next_frame().unwrap().is_some());
        assert!(source.next_frame().unwrap().is_none());
        assert!(source.next_frame().unwrap().is_none());
        assert_eq!(source.remaining(), 0);
    }

    #[test]
    fn test_release_ends_stream() {
        let log = DetectionLog::from_reader(LOG.as_bytes()).unwrap();
        let mut source = ReplaySource::new(&log, 2, 2, 30.0);
        source.release();
        assert!(source.is_released());
        assert!(source.next_frame().unwrap().is_none());
    }
}
