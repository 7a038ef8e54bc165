use std::convert::Infallible;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam_channel::TryRecvError;
use sentinel_rs::{
    AcquisitionLoop, BoundingBox, ByteTracker, Frame, FrameData, FramePipeline, LoopConfig,
    ObjectDetector, Renderer, VideoSource,
};

/// Endless source that yields `None` for `gap` calls after every `burst` frames.
struct PulsedSource {
    sequence: u64,
    burst: u64,
    gap: u64,
    idle: u64,
    released: Arc<AtomicBool>,
}

impl PulsedSource {
    fn new(burst: u64, gap: u64) -> Self {
        Self {
            sequence: 0,
            burst,
            gap,
            idle: 0,
            released: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl VideoSource for PulsedSource {
    type Error = Infallible;

    fn next_frame(&mut self) -> Result<Option<Frame>, Self::Error> {
        let at_gap = self.sequence > 0 && self.sequence % self.burst == 0;
        if self.gap > 0 && at_gap && self.idle < self.gap {
            self.idle += 1;
            return Ok(None);
        }
        self.idle = 0;
        let frame = Frame::blank(self.sequence, 8, 8);
        self.sequence += 1;
        Ok(Some(frame))
    }

    fn frame_rate(&self) -> f64 {
        30.0
    }

    fn release(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

/// One person per frame; fails when `sequence % fail_every == fail_every - 1`.
struct FlakyDetector {
    fail_every: Option<u64>,
}

impl ObjectDetector for FlakyDetector {
    type Error = io::Error;

    fn detect(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>, Self::Error> {
        if let Some(n) = self.fail_every
            && frame.sequence % n == n - 1
        {
            return Err(io::Error::other("model timeout"));
        }
        Ok(vec![BoundingBox::new(10, 10, 40, 90, 0.9, 0)])
    }
}

/// Renders a frame to its id.
struct IdRenderer;

/// Fails to render odd frame ids.
struct OddFailRenderer;

impl Renderer for OddFailRenderer {
    type Image = u64;
    type Error = io::Error;

    fn annotate(&mut self, data: &FrameData) -> Result<u64, io::Error> {
        if data.frame_id % 2 == 1 {
            return Err(io::Error::other("encoder busy"));
        }
        Ok(data.frame_id)
    }
}

/// Endless source whose `fail_at`-th read returns an error instead of a frame.
struct GlitchSource {
    reads: u64,
    sequence: u64,
    fail_at: u64,
}

impl VideoSource for GlitchSource {
    type Error = io::Error;

    fn next_frame(&mut self) -> Result<Option<Frame>, Self::Error> {
        self.reads += 1;
        if self.reads == self.fail_at {
            return Err(io::Error::other("device disconnected"));
        }
        let frame = Frame::blank(self.sequence, 8, 8);
        self.sequence += 1;
        Ok(Some(frame))
    }

    fn frame_rate(&self) -> f64 {
        25.0
    }

    fn release(&mut self) {}
}

impl Renderer for IdRenderer {
    type Image = u64;
    type Error = Infallible;

    fn annotate(&mut self, data: &FrameData) -> Result<u64, Infallible> {
        Ok(data.frame_id)
    }
}

fn fast_config(capacity: usize) -> LoopConfig {
    LoopConfig {
        idle_backoff_ms: 5,
        fault_backoff_ms: 1,
        subscriber_capacity: capacity,
    }
}

#[test]
fn test_stop_ends_publishing() {
    let source = PulsedSource::new(u64::MAX, 0);
    let released = Arc::clone(&source.released);
    let pipeline = FramePipeline::with_default_config(
        source,
        FlakyDetector { fail_every: None },
        ByteTracker::default(),
    );
    let mut acquisition = AcquisitionLoop::new(pipeline, IdRenderer, fast_config(4));
    let frames = acquisition.subscribe();
    let handle = acquisition.start().unwrap();

    let first = frames.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(first.stats.frame_id >= 1);
    assert!(handle.is_running());

    let report = handle.stop().unwrap();
    assert!(report.frames_published >= 1);
    assert!(released.load(Ordering::SeqCst));

    while frames.try_recv().is_ok() {}
    thread::sleep(Duration::from_millis(50));
    assert!(matches!(frames.try_recv(), Err(TryRecvError::Empty | TryRecvError::Disconnected)));
}

#[test]
fn test_end_of_stream_does_not_end_loop() {
    let pipeline = FramePipeline::with_default_config(
        PulsedSource::new(3, 2),
        FlakyDetector { fail_every: None },
        ByteTracker::default(),
    );
    let mut acquisition = AcquisitionLoop::new(pipeline, IdRenderer, fast_config(16));
    let frames = acquisition.subscribe();
    let handle = acquisition.start().unwrap();

    let mut last = 0;
    while last < 7 {
        let published = frames.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(published.stats.frame_id > last);
        assert_eq!(*published.image, published.stats.frame_id);
        last = published.stats.frame_id;
    }

    let report = handle.stop().unwrap();
    assert!(report.end_of_stream_cycles >= 2);
    assert_eq!(report.faulted_cycles, 0);
}

#[test]
fn test_faulted_cycles_are_skipped() {
    let pipeline = FramePipeline::with_default_config(
        PulsedSource::new(u64::MAX, 0),
        FlakyDetector { fail_every: Some(2) },
        ByteTracker::default(),
    );
    let mut acquisition = AcquisitionLoop::new(pipeline, IdRenderer, fast_config(64));
    let frames = acquisition.subscribe();
    let handle = acquisition.start().unwrap();

    let mut ids = Vec::new();
    while ids.len() < 5 {
        ids.push(frames.recv_timeout(Duration::from_secs(5)).unwrap().stats.frame_id);
    }
    let report = handle.stop().unwrap();

    // Faulted frames consume no id.
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    assert!(report.faulted_cycles >= 4);
}

#[test]
fn test_render_failure_skips_publish() {
    let pipeline = FramePipeline::with_default_config(
        PulsedSource::new(u64::MAX, 0),
        FlakyDetector { fail_every: None },
        ByteTracker::default(),
    );
    let mut acquisition = AcquisitionLoop::new(pipeline, OddFailRenderer, fast_config(64));
    let frames = acquisition.subscribe();
    let handle = acquisition.start().unwrap();

    let mut ids = Vec::new();
    while ids.len() < 3 {
        ids.push(frames.recv_timeout(Duration::from_secs(5)).unwrap().stats.frame_id);
    }
    let report = handle.stop().unwrap();

    assert_eq!(ids, vec![2, 4, 6]);
    assert!(report.faulted_cycles >= 3);
    assert!(report.frames_published >= 3);
    while let Ok(published) = frames.try_recv() {
        assert_eq!(published.stats.frame_id % 2, 0);
    }
}

#[test]
fn test_source_error_consumes_no_frame_id() {
    let source = GlitchSource {
        reads: 0,
        sequence: 0,
        fail_at: 3,
    };
    let pipeline = FramePipeline::with_default_config(
        source,
        FlakyDetector { fail_every: None },
        ByteTracker::default(),
    );
    let mut acquisition = AcquisitionLoop::new(pipeline, IdRenderer, fast_config(64));
    let frames = acquisition.subscribe();
    let handle = acquisition.start().unwrap();

    let mut ids = Vec::new();
    while ids.len() < 4 {
        ids.push(frames.recv_timeout(Duration::from_secs(5)).unwrap().stats.frame_id);
    }
    let report = handle.stop().unwrap();

    assert_eq!(ids, vec![1, 2, 3, 4]);
    assert_eq!(report.faulted_cycles, 1);
}

#[test]
fn test_slow_subscriber_sees_latest_frames() {
    let pipeline = FramePipeline::with_default_config(
        PulsedSource::new(u64::MAX, 0),
        FlakyDetector { fail_every: None },
        ByteTracker::default(),
    );
    let mut acquisition = AcquisitionLoop::new(pipeline, IdRenderer, fast_config(1));
    let frames = acquisition.subscribe();
    let handle = acquisition.start().unwrap();

    while frames.is_empty() {
        thread::sleep(Duration::from_millis(1));
    }
    thread::sleep(Duration::from_millis(50));
    let report = handle.stop().unwrap();

    assert!(frames.len() <= 1);
    let newest = frames.try_recv().unwrap();
    assert_eq!(newest.stats.frame_id, report.frames_published);
}
