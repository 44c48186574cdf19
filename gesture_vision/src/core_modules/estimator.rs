// THEORY:
// The engine treats the camera and the hand-landmark model as external
// collaborators. This module fixes their contracts and nothing more:
//
// - `VideoSource`: frames on demand, the native resolution, and a readiness
//   flag that is checked before every cycle.
// - `EstimatorLoader` / `LandmarkEstimator`: acquiring the model may take time
//   and may fail; once loaded, each `estimate` call returns zero or more hands
//   for one frame. The engine only ever consumes the first hand.
//
// Both estimator calls are the suspension points of the detection loop, so they
// return boxed futures; everything downstream of them is synchronous.

use crate::core_modules::landmark::{BoundingBox, LandmarkSet};
use crate::error::Result;
use futures::future::BoxFuture;
use image::RgbaImage;
use std::sync::Arc;

pub type VideoFrame = RgbaImage;

pub trait VideoSource: Send + Sync {
    /// Whether the source is producing frames yet.
    fn is_ready(&self) -> bool;
    /// Native width and height of the video.
    fn resolution(&self) -> (u32, u32);
    /// The current frame, if one is available.
    fn frame(&self) -> Option<VideoFrame>;
}

/// One hand found by the estimator.
#[derive(Debug, Clone, PartialEq)]
pub struct HandDetection {
    pub landmarks: LandmarkSet,
    pub bounding_box: BoundingBox,
    /// The estimator's own confidence that this is a hand.
    pub score: f32,
}

impl HandDetection {
    pub fn new(landmarks: LandmarkSet, score: f32) -> Self {
        let bounding_box = landmarks.bounding_box();
        Self { landmarks, bounding_box, score }
    }
}

pub trait LandmarkEstimator: Send + Sync {
    fn estimate<'a>(&'a self, frame: &'a VideoFrame) -> BoxFuture<'a, Result<Vec<HandDetection>>>;
}

pub trait EstimatorLoader: Send + Sync {
    fn load(&self) -> BoxFuture<'_, Result<Arc<dyn LandmarkEstimator>>>;
}

/// Landmarks of the first detected hand, if any.
pub fn first_hand(detections: Vec<HandDetection>) -> Option<LandmarkSet> {
    detections.into_iter().next().map(|d| d.landmarks)
}
