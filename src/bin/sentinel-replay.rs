//! Replays a recorded detection log through the full acquisition loop.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use crossbeam_channel::RecvTimeoutError;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use sentinel_rs::replay::{DetectionLog, ReplayDetector, ReplaySource};
use sentinel_rs::{
    AcquisitionLoop, ByteTracker, FramePipeline, OverlayRenderer, SentinelConfig,
};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Replay recorded detections through the tracking analytics pipeline"
)]
struct Args {
    /// JSON-lines detection log, one object per frame
    #[arg(short, long)]
    detections: PathBuf,

    /// JSON configuration file; defaults apply for anything omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long, default_value_t = 1280)]
    width: u32,

    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Nominal frame rate reported by the replay source
    #[arg(long, default_value_t = 30.0)]
    fps: f64,

    /// Font for overlay labels, overriding the config file
    #[arg(long)]
    font: Option<PathBuf>,

    /// Directory for annotated PNG snapshots
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    /// Write a snapshot every N published frames
    #[arg(long, default_value_t = 30)]
    snapshot_every: u64,

    /// Stop after this long without a published frame (milliseconds)
    #[arg(long, default_value_t = 1000)]
    idle_timeout_ms: u64,
}

fn main() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("sentinel_rs=info,sentinel_replay=info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(env_filter)
        .init();

    if let Err(e) = run(Args::parse()) {
        error!("{e}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => SentinelConfig::load(path)?,
        None => SentinelConfig::default(),
    };
    if let Some(font) = &args.font {
        config.render.font_path = Some(font.clone());
    }
    let log = Arc::new(DetectionLog::load(&args.detections)?);
    let expected = log.len() as u64;

    let source = ReplaySource::new(&log, args.width, args.height, args.fps);
    let detector = ReplayDetector::new(Arc::clone(&log));
    let tracker = ByteTracker::new(config.tracker.clone());
    let pipeline = FramePipeline::new(source, detector, tracker, config.analytics.clone());
    let renderer = OverlayRenderer::from_config(&config.analytics, &config.render)?;

    if let Some(dir) = &args.snapshot_dir {
        std::fs::create_dir_all(dir)?;
    }

    let mut acquisition = AcquisitionLoop::new(pipeline, renderer, config.acquisition.clone());
    let frames = acquisition.subscribe();
    let handle = acquisition.start()?;

    let idle_timeout = Duration::from_millis(args.idle_timeout_ms);
    let mut last_frame = 0;
    loop {
        match frames.recv_timeout(idle_timeout) {
            Ok(published) => {
                let stats = published.stats;
                last_frame = stats.frame_id;
                info!(
                    frame = stats.frame_id,
                    tracks = stats.track_count,
                    groups = stats.group_count,
                    alerts = stats.alert_count,
                    fps = format_args!("{:.1}", stats.frames_per_second),
                    "frame"
                );

                if let Some(dir) = &args.snapshot_dir
                    && args.snapshot_every > 0
                    && stats.frame_id % args.snapshot_every == 0
                {
                    let path = dir.join(format!("frame_{:06}.png", stats.frame_id));
                    if let Err(e) = published.image.save(&path) {
                        warn!(path = %path.display(), error = %e, "failed to write snapshot");
                    }
                }
                if stats.frame_id >= expected {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(last_frame, expected, "no frame within idle timeout");
                break;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    let report = handle.stop()?;
    info!(
        published = report.frames_published,
        faulted = report.faulted_cycles,
        idle_cycles = report.end_of_stream_cycles,
        "replay finished"
    );
    Ok(())
}
