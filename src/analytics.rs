//! Pure per-frame analytics: grouping and behaviour alerts.

mod behavior;
mod clusterer;

pub use behavior::{Alert, BehaviorAnalyzer};
pub use clusterer::{GroupClusterer, distance_matrix};
