//! Error types shared by every stage of the detection engine.

use thiserror::Error;

/// Errors produced by the detection engine.
///
/// None of these are fatal to the process: load failures leave the pipeline
/// idle, and per-cycle failures are downgraded to "no hand" by the loop.
#[derive(Debug, Error)]
pub enum DetectionError {
    /// The landmark estimator could not be acquired.
    #[error("failed to load landmark estimator: {0}")]
    EstimatorLoad(String),

    /// A single estimate call failed.
    #[error("landmark estimation failed: {0}")]
    Estimate(String),

    /// A landmark set was built from the wrong number of points.
    #[error("a hand has exactly 21 landmarks, got {0}")]
    InvalidLandmarkCount(usize),

    /// A landmark had a NaN or infinite coordinate.
    #[error("landmark {0} has a non-finite coordinate")]
    NonFiniteLandmark(usize),

    /// `start` was called while the loop is already running.
    #[error("detection is already running")]
    AlreadyRunning,

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A recorded landmark stream could not be read.
    #[error("replay error: {0}")]
    Replay(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, DetectionError>;
