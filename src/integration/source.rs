use crate::entity::Frame;

/// A stream of decoded frames.
pub trait VideoSource {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Next frame, or `Ok(None)` once the stream is exhausted.
    ///
    /// May be called again after exhaustion; live sources can resume.
    fn next_frame(&mut self) -> Result<Option<Frame>, Self::Error>;

    /// Nominal frames per second of the stream.
    fn frame_rate(&self) -> f64;

    /// Free the underlying device or file handle.
    fn release(&mut self);
}
