//! Per-track and per-group behaviour rules.

use std::collections::BTreeSet;
use std::fmt;

use crate::config::AnalyticsConfig;
use crate::entity::{Group, Track};

/// A behavioural signal raised for one cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    Running { track_id: u64, speed: f64 },
    Loitering { track_id: u64 },
    Crowd { group_id: usize, size: usize },
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running { track_id, speed } => {
                write!(f, "RUNNING: ID {} (Speed: {:.1})", track_id, speed)
            }
            Self::Loitering { track_id } => write!(f, "LOITERING: ID {}", track_id),
            Self::Crowd { group_id, size } => {
                write!(f, "CROWD: Group {} has {} members", group_id, size)
            }
        }
    }
}

/// Applies the running, loitering and crowd rules.
#[derive(Debug, Clone, Default)]
pub struct BehaviorAnalyzer {
    config: AnalyticsConfig,
}

impl BehaviorAnalyzer {
    pub fn new(config: AnalyticsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Evaluate every rule and return the distinct alert strings.
    ///
    /// The order of the returned strings is unspecified.
    pub fn analyze(&self, tracks: &[Track], groups: &[Group]) -> Vec<String> {
        let alerts: BTreeSet<String> = self
            .alerts(tracks, groups)
            .map(|alert| alert.to_string())
            .collect();
        alerts.into_iter().collect()
    }

    /// Raw alerts before string deduplication.
    pub fn alerts<'a>(
        &'a self,
        tracks: &'a [Track],
        groups: &'a [Group],
    ) -> impl Iterator<Item = Alert> + 'a {
        let per_track = tracks
            .iter()
            .flat_map(move |t| self.running(t).into_iter().chain(self.loitering(t)));
        let per_group = groups.iter().filter_map(move |g| self.crowd(g));
        per_track.chain(per_group)
    }

    fn running(&self, track: &Track) -> Option<Alert> {
        let speed = track.speed();
        (speed > self.config.running_speed_threshold).then_some(Alert::Running {
            track_id: track.track_id,
            speed,
        })
    }

    fn loitering(&self, track: &Track) -> Option<Alert> {
        if (track.age as f64) <= self.config.loitering_age_frames() {
            return None;
        }
        if track.history.len() < self.config.loitering_min_history {
            return None;
        }
        let start = track.history.front()?;
        let current = track.center();
        let displacement =
            (start.0 as f64 - current.0 as f64).hypot(start.1 as f64 - current.1 as f64);
        (displacement < self.config.loitering_max_displacement).then_some(Alert::Loitering {
            track_id: track.track_id,
        })
    }

    fn crowd(&self, group: &Group) -> Option<Alert> {
        (group.len() >= self.config.crowd_min_members).then_some(Alert::Crowd {
            group_id: group.group_id,
            size: group.len(),
        })
    }
}
