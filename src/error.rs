//! Error types for the pipeline, the acquisition loop and file loading.

use std::path::PathBuf;

use thiserror::Error;

/// Boxed collaborator error.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A fault inside one pipeline cycle. End-of-stream is not an error.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("video source failed: {0}")]
    Source(#[source] BoxError),

    #[error("object detector failed: {0}")]
    Detector(#[source] BoxError),

    #[error("object tracker failed: {0}")]
    Tracker(#[source] BoxError),
}

#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("failed to spawn acquisition thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("acquisition thread panicked")]
    Panicked,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("frame buffer holds {got} bytes, expected {expected} for {width}x{height} RGB")]
    InvalidBuffer {
        width: u32,
        height: u32,
        expected: usize,
        got: usize,
    },

    #[error("failed to read font {path}: {source}")]
    FontIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not a usable font: {source}")]
    InvalidFont {
        path: PathBuf,
        #[source]
        source: ab_glyph::InvalidFont,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("failed to read detection log {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("detection log line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}
