// THEORY:
// The `finger_pose` module turns raw geometry into discrete descriptors. For
// every finger it answers two questions, each with a small, closed vocabulary:
//
// 1.  **How bent is it?** (`FingerCurl`) The finger's chain is extended back to
//     the wrist, giving four segments. The angles between consecutive segments
//     are summed into a total flexion and bucketed into no/half/full curl.
// 2.  **Where does it point?** (`FingerDirection`) The distal segment (last
//     joint to tip) is projected onto the image plane and bucketed into one of
//     eight 45° sectors. Image y grows downward, so "up" means towards the top
//     of the frame.
//
// Everything here is a pure function of one `LandmarkSet`; the classifier
// compares these descriptors against the catalogue.

use crate::config::ClassifierConfig;
use crate::core_modules::landmark::{Finger, Landmark, LandmarkSet};
use serde::{Deserialize, Serialize};

/// Discretized bend state of a finger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FingerCurl {
    NoCurl,
    HalfCurl,
    FullCurl,
}

impl FingerCurl {
    fn ordinal(self) -> u8 {
        match self {
            FingerCurl::NoCurl => 0,
            FingerCurl::HalfCurl => 1,
            FingerCurl::FullCurl => 2,
        }
    }

    /// Number of buckets between two curl states (0, 1 or 2).
    pub fn distance(self, other: FingerCurl) -> u8 {
        self.ordinal().abs_diff(other.ordinal())
    }
}

/// Image-plane pointing direction of a finger's distal segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FingerDirection {
    HorizontalRight,
    DiagonalUpRight,
    VerticalUp,
    DiagonalUpLeft,
    HorizontalLeft,
    DiagonalDownLeft,
    VerticalDown,
    DiagonalDownRight,
}

impl FingerDirection {
    /// Counter-clockwise from screen-right, one entry per 45° sector.
    pub const ALL: [FingerDirection; 8] = [
        FingerDirection::HorizontalRight,
        FingerDirection::DiagonalUpRight,
        FingerDirection::VerticalUp,
        FingerDirection::DiagonalUpLeft,
        FingerDirection::HorizontalLeft,
        FingerDirection::DiagonalDownLeft,
        FingerDirection::VerticalDown,
        FingerDirection::DiagonalDownRight,
    ];

    /// Buckets an image-plane vector (x right, y down). A zero vector has no
    /// direction.
    pub fn from_vector(dx: f32, dy: f32) -> Option<Self> {
        if dx == 0.0 && dy == 0.0 {
            return None;
        }
        let degrees = (-dy).atan2(dx).to_degrees().rem_euclid(360.0);
        let sector = ((degrees + 22.5) / 45.0).floor() as usize % 8;
        Some(Self::ALL[sector])
    }
}

/// Curl and direction of one finger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FingerPose {
    pub curl: FingerCurl,
    pub direction: FingerDirection,
}

/// Poses of all five fingers, indexed by `Finger`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandPose {
    fingers: [FingerPose; 5],
}

impl HandPose {
    pub fn estimate(landmarks: &LandmarkSet, config: &ClassifierConfig) -> Self {
        Self {
            fingers: Finger::ALL.map(|finger| FingerPose {
                curl: estimate_curl(landmarks, finger, config),
                direction: estimate_direction(landmarks, finger),
            }),
        }
    }

    pub fn finger(&self, finger: Finger) -> FingerPose {
        self.fingers[finger.index()]
    }
}

fn angle_between_deg(a: [f32; 3], b: [f32; 3]) -> f32 {
    let norm_a = (a[0] * a[0] + a[1] * a[1] + a[2] * a[2]).sqrt();
    let norm_b = (b[0] * b[0] + b[1] * b[1] + b[2] * b[2]).sqrt();
    if norm_a <= f32::EPSILON || norm_b <= f32::EPSILON {
        return 0.0;
    }
    let cos = (a[0] * b[0] + a[1] * b[1] + a[2] * b[2]) / (norm_a * norm_b);
    cos.clamp(-1.0, 1.0).acos().to_degrees()
}

/// Sum of the joint angles along wrist → base → ... → tip, in degrees.
/// 0° is a perfectly straight finger.
pub fn finger_flexion_deg(landmarks: &LandmarkSet, finger: Finger) -> f32 {
    let [c0, c1, c2, c3] = landmarks.finger(finger);
    let joints: [&Landmark; 5] = [landmarks.wrist(), c0, c1, c2, c3];
    let segments: Vec<[f32; 3]> = joints.windows(2).map(|w| w[0].to(w[1])).collect();
    segments.windows(2).map(|s| angle_between_deg(s[0], s[1])).sum()
}

pub fn estimate_curl(landmarks: &LandmarkSet, finger: Finger, config: &ClassifierConfig) -> FingerCurl {
    let flexion = finger_flexion_deg(landmarks, finger);
    if flexion < config.no_curl_max_deg {
        FingerCurl::NoCurl
    } else if flexion < config.half_curl_max_deg {
        FingerCurl::HalfCurl
    } else {
        FingerCurl::FullCurl
    }
}

pub fn estimate_direction(landmarks: &LandmarkSet, finger: Finger) -> FingerDirection {
    let [c0, _, c2, c3] = landmarks.finger(finger);
    let distal = c2.to(c3);
    FingerDirection::from_vector(distal[0], distal[1])
        .or_else(|| {
            let whole = c0.to(c3);
            FingerDirection::from_vector(whole[0], whole[1])
        })
        // A finger collapsed to a single point; any answer is as good as another.
        .unwrap_or(FingerDirection::VerticalUp)
}
