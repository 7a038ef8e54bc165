//! Trait for object detection inference backends.

use crate::entity::{BoundingBox, Frame};

/// Produces person bounding boxes from a raw frame.
///
/// Implement this trait to connect any detection model to the pipeline.
///
/// # Example
///
/// ```ignore
/// use sentinel_rs::{BoundingBox, Frame, ObjectDetector};
///
/// struct MyDetector {
///     // Your model here
/// }
///
/// impl ObjectDetector for MyDetector {
///     type Error = std::io::Error;
///
///     fn detect(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>, Self::Error> {
///         // Run inference on frame.as_bytes()
///         Ok(vec![])
///     }
/// }
/// ```
pub trait ObjectDetector {
    /// Error type for detection failures.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Run inference on one frame. Called exactly once per pipeline cycle.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>, Self::Error>;
}
