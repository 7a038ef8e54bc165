//! Raw frames and per-cycle analytics results.

use std::sync::Arc;

use crate::entity::{Group, Track};

/// A decoded video frame as packed RGB8 bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Position of this frame in its source stream
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Frame {
    pub fn new(sequence: u64, width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            sequence,
            width,
            height,
            data,
        }
    }

    /// All-black frame of the given size.
    pub fn blank(sequence: u64, width: u32, height: u32) -> Self {
        let len = width as usize * height as usize * 3;
        Self::new(sequence, width, height, vec![0u8; len])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

/// Output of one analytics cycle. Never mutated after the pipeline builds it.
#[derive(Debug, Clone)]
pub struct FrameData {
    /// Sequential id, starting at 1, advanced only by produced frames
    pub frame_id: u64,
    pub image: Arc<Frame>,
    pub tracks: Vec<Track>,
    pub groups: Vec<Group>,
    /// Pairwise distinct alert strings, in no particular order
    pub alerts: Vec<String>,
}
