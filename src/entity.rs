//! Per-frame records shared by the analytics stages.

mod bbox;
mod frame;
mod group;
mod track;

pub use bbox::{BoundingBox, BoundingBoxBuilder};
pub use frame::{Frame, FrameData};
pub use group::Group;
pub use track::{HISTORY_CAPACITY, Track, TrackState};
