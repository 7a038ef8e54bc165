//! Producer loop that runs the pipeline continuously and publishes results.

mod publisher;
mod runner;

pub use publisher::{CycleStats, Published, Publisher, Subscription};
pub use runner::{AcquisitionHandle, AcquisitionLoop, LoopReport};
