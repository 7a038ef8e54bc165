use crate::entity::{BoundingBox, Frame, Track};

/// Stateful multi-object tracker owning track identity across frames.
///
/// The tracker keeps its tracks between calls and lends them out mutably so the
/// pipeline can extend each track's history in place. Implementations must not
/// share state between instances; each pipeline owns its own tracker.
pub trait ObjectTracker {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Associate this frame's detections with existing tracks and return the
    /// tracks reported for the frame.
    fn update(
        &mut self,
        frame: &Frame,
        detections: Vec<BoundingBox>,
    ) -> Result<&mut [Track], Self::Error>;
}
