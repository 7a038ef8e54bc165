//! The producer thread driving the frame pipeline.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tracing::{debug, info, trace, warn};

use crate::acquisition::{CycleStats, Published, Publisher, Subscription};
use crate::config::LoopConfig;
use crate::error::AcquisitionError;
use crate::integration::{
    FramePipeline, ObjectDetector, ObjectTracker, Renderer, StepOutcome, VideoSource,
};

const THREAD_NAME: &str = "sentinel-acquisition";

/// Counters returned when the loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopReport {
    pub frames_published: u64,
    pub end_of_stream_cycles: u64,
    /// Cycles aborted by a source, detector, tracker or render failure
    pub faulted_cycles: u64,
}

enum Cycle {
    Published,
    EndOfStream,
    Faulted,
}

/// Owns a pipeline and a renderer and runs them on a dedicated thread.
///
/// Subscribe before calling [`AcquisitionLoop::start`]; the running thread owns the
/// publisher from then on.
pub struct AcquisitionLoop<S, D, T, R: Renderer> {
    pipeline: FramePipeline<S, D, T>,
    renderer: R,
    publisher: Publisher<R::Image>,
    config: LoopConfig,
}

impl<S, D, T, R> AcquisitionLoop<S, D, T, R>
where
    S: VideoSource + Send + 'static,
    D: ObjectDetector + Send + 'static,
    T: ObjectTracker + Send + 'static,
    R: Renderer + Send + 'static,
{
    pub fn new(pipeline: FramePipeline<S, D, T>, renderer: R, config: LoopConfig) -> Self {
        Self {
            pipeline,
            renderer,
            publisher: Publisher::new(config.subscriber_capacity),
            config,
        }
    }

    pub fn subscribe(&mut self) -> Subscription<R::Image> {
        self.publisher.subscribe()
    }

    /// Spawn the acquisition thread.
    pub fn start(self) -> Result<AcquisitionHandle, AcquisitionError> {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let subscribers = self.publisher.subscriber_count();

        let worker = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || self.run(&flag))?;

        info!(subscribers, "acquisition loop started");
        Ok(AcquisitionHandle {
            stop,
            worker: Some(worker),
        })
    }

    fn run(mut self, stop: &AtomicBool) -> LoopReport {
        let mut report = LoopReport::default();

        while !stop.load(Ordering::Acquire) {
            match self.cycle(Instant::now()) {
                Cycle::Published => report.frames_published += 1,
                Cycle::EndOfStream => {
                    report.end_of_stream_cycles += 1;
                    thread::park_timeout(self.config.idle_backoff());
                }
                Cycle::Faulted => {
                    report.faulted_cycles += 1;
                    thread::park_timeout(self.config.fault_backoff());
                }
            }
        }

        self.pipeline.release();
        info!(
            frames = report.frames_published,
            faulted = report.faulted_cycles,
            "acquisition loop stopped"
        );
        report
    }

    fn cycle(&mut self, started: Instant) -> Cycle {
        let data = match self.pipeline.step() {
            Ok(StepOutcome::Frame(data)) => data,
            Ok(StepOutcome::EndOfStream) => return Cycle::EndOfStream,
            Err(e) => {
                warn!(error = %e, "pipeline cycle aborted");
                return Cycle::Faulted;
            }
        };

        let image = match self.renderer.annotate(&data) {
            Ok(image) => image,
            Err(e) => {
                warn!(frame_id = data.frame_id, error = %e, "render failed, skipping publish");
                return Cycle::Faulted;
            }
        };

        for alert in &data.alerts {
            trace!(frame_id = data.frame_id, %alert, "alert raised");
        }

        let stats = CycleStats::measure(&data, started.elapsed());
        let delivered = self.publisher.publish(Published {
            image: Arc::new(image),
            stats,
        });
        debug!(
            frame_id = stats.frame_id,
            fps = stats.frames_per_second,
            delivered,
            "frame published"
        );
        Cycle::Published
    }
}

/// Control handle for a running acquisition thread.
///
/// Dropping the handle stops and joins the thread.
pub struct AcquisitionHandle {
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<LoopReport>>,
}

impl AcquisitionHandle {
    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// Signal the loop to stop and wait for the thread to exit.
    ///
    /// The flag is checked at each cycle boundary; an in-flight cycle completes
    /// first. Once this returns nothing more is published.
    pub fn stop(mut self) -> Result<LoopReport, AcquisitionError> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<LoopReport, AcquisitionError> {
        self.stop.store(true, Ordering::Release);
        let Some(worker) = self.worker.take() else {
            return Ok(LoopReport::default());
        };
        // Cut a backoff sleep short.
        worker.thread().unpark();
        worker.join().map_err(|_| AcquisitionError::Panicked)
    }
}

impl Drop for AcquisitionHandle {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!(error = %e, "acquisition thread did not exit cleanly");
        }
    }
}
