//! Collaborator contracts and the per-frame pipeline built on them.
//!
//! The video source, detector, tracker and renderer are external to the analytics
//! core. This module defines the traits they implement and [`FramePipeline`], which
//! drives source, detector and tracker once per cycle and runs the analytics stages
//! over the result.

mod detector;
mod pipeline;
mod renderer;
mod source;
mod tracker;

pub use detector::ObjectDetector;
pub use pipeline::{FramePipeline, StepOutcome};
pub use renderer::Renderer;
pub use source::VideoSource;
pub use tracker::ObjectTracker;
