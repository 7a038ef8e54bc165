//! ByteTrack-based implementation of the pipeline's tracker contract.

mod byte_tracker;
mod kalman_filter;
mod matching;
mod tracklet;

pub use byte_tracker::ByteTracker;
pub use kalman_filter::KalmanFilter;
pub use matching::{AssignmentResult, iou_distance, linear_assignment};
