//! Tunable thresholds for analytics, tracking and the acquisition loop.
//!
//! Every section deserializes from JSON with per-field defaults, so a partial
//! document only overrides what it names.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Thresholds for grouping and behaviour rules.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Two tracks are adjacent when their centers are strictly closer than this (pixels)
    pub group_distance_threshold: f64,
    /// Speeds strictly above this raise a running alert (pixels per frame)
    pub running_speed_threshold: f64,
    pub loitering_time_threshold_secs: f64,
    /// Frame rate used to turn the loitering time into an age in frames
    pub assumed_frame_rate: f64,
    pub loitering_min_history: usize,
    /// Loitering requires displacement strictly below this (pixels)
    pub loitering_max_displacement: f64,
    /// Groups with at least this many members raise a crowd alert
    pub crowd_min_members: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            group_distance_threshold: 150.0,
            running_speed_threshold: 15.0,
            loitering_time_threshold_secs: 10.0,
            assumed_frame_rate: 30.0,
            loitering_min_history: 100,
            loitering_max_displacement: 50.0,
            crowd_min_members: 5,
        }
    }
}

impl AnalyticsConfig {
    /// Minimum age in frames, exclusive, before loitering is considered.
    pub fn loitering_age_frames(&self) -> f64 {
        self.loitering_time_threshold_secs * self.assumed_frame_rate
    }
}

/// Configuration for the ByteTrack tracker.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub track_thresh: f32,
    pub match_thresh: f32,
    pub track_buffer: u32,
    pub frame_rate: f32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            track_thresh: 0.5,
            match_thresh: 0.8,
            track_buffer: 30,
            frame_rate: 30.0,
        }
    }
}

/// Pacing and queueing of the acquisition loop.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Sleep after the source reports end-of-stream
    pub idle_backoff_ms: u64,
    /// Sleep after a cycle aborted on a collaborator fault
    pub fault_backoff_ms: u64,
    /// Queue depth per subscriber before the oldest item is dropped
    pub subscriber_capacity: usize,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            idle_backoff_ms: 100,
            fault_backoff_ms: 100,
            subscriber_capacity: 2,
        }
    }
}

impl LoopConfig {
    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }

    pub fn fault_backoff(&self) -> Duration {
        Duration::from_millis(self.fault_backoff_ms)
    }
}

/// Overlay drawing options.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// TrueType/OpenType font for labels; without one only shapes are drawn
    pub font_path: Option<PathBuf>,
    /// Label height in pixels
    pub label_scale: f32,
    pub draw_trails: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            font_path: None,
            label_scale: 16.0,
            draw_trails: true,
        }
    }
}

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SentinelConfig {
    pub analytics: AnalyticsConfig,
    pub tracker: TrackerConfig,
    #[serde(rename = "loop")]
    pub acquisition: LoopConfig,
    pub render: RenderConfig,
}

impl SentinelConfig {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = SentinelConfig::default();
        assert_eq!(c.analytics.group_distance_threshold, 150.0);
        assert_eq!(c.analytics.loitering_age_frames(), 300.0);
        assert_eq!(c.acquisition.idle_backoff(), Duration::from_millis(100));
        assert_eq!(c.tracker.track_buffer, 30);
        assert!(c.render.font_path.is_none());
    }

    #[test]
    fn test_partial_document() {
        let c = SentinelConfig::from_json_str(
            r#"{
                "analytics": {"running_speed_threshold": 20.0},
                "loop": {"subscriber_capacity": 8},
                "render": {"font_path": "/usr/share/fonts/label.ttf"}
            }"#,
        )
        .unwrap();
        assert_eq!(c.analytics.running_speed_threshold, 20.0);
        assert_eq!(c.analytics.crowd_min_members, 5);
        assert_eq!(c.acquisition.subscriber_capacity, 8);
        assert_eq!(c.acquisition.idle_backoff_ms, 100);
        assert_eq!(
            c.render.font_path.as_deref(),
            Some(Path::new("/usr/share/fonts/label.ttf"))
        );
        assert_eq!(c.render.label_scale, 16.0);
        assert!(c.render.draw_trails);
    }

    #[test]
    fn test_malformed_document() {
        let err = SentinelConfig::from_json_str("{\"analytics\": 3}").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = SentinelConfig::load("/nonexistent/sentinel.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
