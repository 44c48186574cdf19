// THEORY:
// The `GestureClassifier` scores one hand against every descriptor in the
// catalogue. It is a pure function of its input plus the static catalogue:
//
// 1.  **Descriptors**: the landmark set is reduced to a `HandPose` (curl and
//     direction per finger). This is the only geometric work, and it is skipped
//     entirely when no hand is present.
// 2.  **Per-finger credit**: 1.0 for an exact curl with a permitted direction,
//     0.5 when the curl is one bucket off but the direction is permitted, and
//     0.0 otherwise.
// 3.  **Aggregation**: a weighted mean over the constrained fingers, giving one
//     score in [0, 1] per catalogue entry, in catalogue order.
//
// Choosing a winner is deliberately not the classifier's job. `best_match` and
// `reported_match` implement the selection policy for callers.

use crate::config::ClassifierConfig;
use crate::core_modules::finger_pose::{FingerPose, HandPose};
use crate::core_modules::gesture_descriptor::{FingerConstraint, GestureCatalogue, GestureDescriptor};
use crate::core_modules::landmark::{Finger, LandmarkSet};

const EXACT_CREDIT: f32 = 1.0;
const NEAR_CREDIT: f32 = 0.5;

/// The score of one catalogue entry for one hand.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureMatch {
    pub name: String,
    pub score: f32,
}

impl GestureMatch {
    pub fn new(name: impl Into<String>, score: f32) -> Self {
        Self { name: name.into(), score }
    }
}

pub struct GestureClassifier {
    catalogue: GestureCatalogue,
    config: ClassifierConfig,
}

impl GestureClassifier {
    pub fn new(catalogue: GestureCatalogue, config: ClassifierConfig) -> Self {
        Self { catalogue, config }
    }

    pub fn catalogue(&self) -> &GestureCatalogue {
        &self.catalogue
    }

    /// One match per catalogue entry, in catalogue order. An absent hand gives
    /// an empty list.
    pub fn classify(&self, landmarks: Option<&LandmarkSet>) -> Vec<GestureMatch> {
        let Some(landmarks) = landmarks else {
            return Vec::new();
        };
        let pose = HandPose::estimate(landmarks, &self.config);
        self.catalogue
            .descriptors()
            .iter()
            .map(|descriptor| GestureMatch::new(descriptor.name.clone(), score_descriptor(&pose, descriptor)))
            .collect()
    }
}

impl Default for GestureClassifier {
    fn default() -> Self {
        Self::new(GestureCatalogue::default(), ClassifierConfig::default())
    }
}

fn finger_credit(pose: FingerPose, constraint: &FingerConstraint) -> f32 {
    if !constraint.permits(pose.direction) {
        return 0.0;
    }
    match pose.curl.distance(constraint.curl) {
        0 => EXACT_CREDIT,
        1 => NEAR_CREDIT,
        _ => 0.0,
    }
}

pub fn score_descriptor(pose: &HandPose, descriptor: &GestureDescriptor) -> f32 {
    let (weighted, total) = Finger::ALL
        .iter()
        .filter_map(|&finger| descriptor.constraint(finger).map(|c| (finger, c)))
        .fold((0.0f32, 0.0f32), |(weighted, total), (finger, c)| {
            let weight = c.weight.max(0.0);
            (weighted + weight * finger_credit(pose.finger(finger), c), total + weight)
        });
    if total <= 0.0 {
        return 0.0;
    }
    (weighted / total).clamp(0.0, 1.0)
}

/// The strictly highest score; on an exact tie the earliest entry wins.
pub fn best_match(matches: &[GestureMatch]) -> Option<&GestureMatch> {
    matches.iter().fold(None, |best: Option<&GestureMatch>, candidate| match best {
        Some(b) if candidate.score <= b.score => Some(b),
        _ => Some(candidate),
    })
}

/// The best match, but only when its score is strictly above `threshold`.
/// Below that the cycle has no recognized gesture at all.
pub fn reported_match(matches: &[GestureMatch], threshold: f32) -> Option<&GestureMatch> {
    best_match(matches).filter(|m| m.score > threshold)
}
