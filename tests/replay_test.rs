use std::sync::Arc;

use sentinel_rs::replay::{DetectionLog, ReplayDetector, ReplaySource};
use sentinel_rs::{
    ByteTracker, FramePipeline, OverlayRenderer, Renderer, SentinelConfig, StepOutcome,
};

const FRAMES: i32 = 20;

/// Five people standing together and one person crossing the scene quickly.
fn scene_log() -> String {
    let mut lines = Vec::new();
    for f in 0..FRAMES {
        let mut dets = Vec::new();
        for p in 0..5 {
            let x = 100 + p * 70;
            dets.push(format!(
                r#"{{"x1": {}, "y1": 100, "x2": {}, "y2": 200, "confidence": 0.9}}"#,
                x,
                x + 40
            ));
        }
        let x = 200 + f * 30;
        dets.push(format!(
            r#"{{"x1": {}, "y1": 450, "x2": {}, "y2": 610, "confidence": 0.95}}"#,
            x,
            x + 60
        ));
        lines.push(format!(r#"{{"detections": [{}]}}"#, dets.join(", ")));
    }
    lines.join("\n")
}

#[test]
fn test_replay_raises_crowd_and_running_alerts() {
    let config = SentinelConfig::from_json_str(r#"{"loop": {"subscriber_capacity": 4}}"#).unwrap();
    assert_eq!(config.acquisition.subscriber_capacity, 4);

    let log = Arc::new(DetectionLog::from_reader(scene_log().as_bytes()).unwrap());
    assert_eq!(log.len(), FRAMES as usize);

    let mut pipeline = FramePipeline::new(
        ReplaySource::new(&log, 320, 240, 30.0),
        ReplayDetector::new(Arc::clone(&log)),
        ByteTracker::new(config.tracker.clone()),
        config.analytics.clone(),
    );
    let mut renderer = OverlayRenderer::new(config.analytics.running_speed_threshold);

    let mut alerts = Vec::new();
    let mut last = None;
    while let StepOutcome::Frame(data) = pipeline.step().unwrap() {
        let image = renderer.annotate(&data).unwrap();
        assert_eq!(image.dimensions(), (320, 240));
        alerts.extend(data.alerts.iter().cloned());
        last = Some(data);
    }
    let last = last.unwrap();

    assert_eq!(last.frame_id, FRAMES as u64);
    assert_eq!(last.tracks.len(), 6);
    assert_eq!(last.groups.len(), 1);
    assert_eq!(last.groups[0].len(), 5);

    assert!(last.alerts.iter().any(|a| a == "CROWD: Group 0 has 5 members"));
    assert!(alerts.iter().any(|a| a.starts_with("RUNNING: ID ")));
    assert!(!alerts.iter().any(|a| a.starts_with("LOITERING")));

    // Every confirmed track carries one history point per frame it was reported.
    for track in &last.tracks {
        assert_eq!(track.history.len(), track.age as usize);
    }
}
