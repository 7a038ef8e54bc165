use crate::entity::FrameData;

/// Turns a frame result into a displayable image.
///
/// Implementations read the tracks, groups and alerts of `data` and never alter them.
pub trait Renderer {
    type Image: Send + Sync + 'static;
    type Error: std::error::Error + Send + Sync + 'static;

    fn annotate(&mut self, data: &FrameData) -> Result<Self::Image, Self::Error>;
}
