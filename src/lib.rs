//! People-tracking analytics over a live video stream.
//!
//! Each cycle pulls a frame, runs an external detector and tracker, then derives
//! spatial groups of co-located people and behaviour alerts (running, loitering,
//! crowding). An [`AcquisitionLoop`] runs the cycle on its own thread and publishes
//! rendered frames with their statistics to subscribers without ever blocking on them.

pub mod acquisition;
pub mod analytics;
pub mod config;
pub mod entity;
pub mod error;
pub mod integration;
pub mod render;
pub mod replay;
pub mod tracker;

pub use acquisition::{
    AcquisitionHandle, AcquisitionLoop, CycleStats, LoopReport, Published, Subscription,
};
pub use analytics::{Alert, BehaviorAnalyzer, GroupClusterer};
pub use config::{AnalyticsConfig, LoopConfig, RenderConfig, SentinelConfig, TrackerConfig};
pub use entity::{BoundingBox, BoundingBoxBuilder, Frame, FrameData, Group, Track, TrackState};
pub use error::{AcquisitionError, PipelineError, RenderError};
pub use integration::{
    FramePipeline, ObjectDetector, ObjectTracker, Renderer, StepOutcome, VideoSource,
};
pub use render::{Label, OverlayRenderer, load_font};
pub use tracker::ByteTracker;
