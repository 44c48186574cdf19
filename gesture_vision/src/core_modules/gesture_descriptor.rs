// THEORY:
// A gesture is data, not code. Each `GestureDescriptor` is a canonical pose
// written as per-finger constraints (required curl, permitted directions, and a
// weight), and every descriptor is scored by the same classifier. Adding a
// gesture means adding an entry to the `GestureCatalogue`; nothing else changes.
//
// The catalogue is ordered. Order matters: when two gestures score exactly the
// same, the one listed first wins.

use crate::core_modules::finger_pose::{FingerCurl, FingerDirection};
use crate::core_modules::landmark::Finger;
use crate::error::{DetectionError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const VICTORY: &str = "VictoryGesture";
pub const THUMBS_UP: &str = "ThumbsUpGesture";

/// What one finger must look like for a gesture to match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FingerConstraint {
    pub curl: FingerCurl,
    pub directions: Vec<FingerDirection>,
    #[serde(default = "default_weight")]
    pub weight: f32,
}

fn default_weight() -> f32 {
    1.0
}

impl FingerConstraint {
    pub fn new(curl: FingerCurl, directions: &[FingerDirection]) -> Self {
        Self { curl, directions: directions.to_vec(), weight: default_weight() }
    }

    pub fn weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    pub fn permits(&self, direction: FingerDirection) -> bool {
        self.directions.contains(&direction)
    }
}

/// A named canonical gesture. Fingers without a constraint are ignored when
/// scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureDescriptor {
    pub name: String,
    pub fingers: BTreeMap<Finger, FingerConstraint>,
}

impl GestureDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), fingers: BTreeMap::new() }
    }

    pub fn finger(mut self, finger: Finger, constraint: FingerConstraint) -> Self {
        self.fingers.insert(finger, constraint);
        self
    }

    pub fn constraint(&self, finger: Finger) -> Option<&FingerConstraint> {
        self.fingers.get(&finger)
    }

    /// Two fingers up in a V, ring and pinky folded, thumb tucked.
    pub fn victory() -> Self {
        use FingerDirection::*;
        let up = [VerticalUp, DiagonalUpLeft, DiagonalUpRight];
        Self::new(VICTORY)
            .finger(
                Finger::Thumb,
                FingerConstraint::new(
                    FingerCurl::HalfCurl,
                    &[VerticalUp, DiagonalUpLeft, DiagonalUpRight, HorizontalLeft, HorizontalRight],
                ),
            )
            .finger(Finger::Index, FingerConstraint::new(FingerCurl::NoCurl, &up).weight(2.0))
            .finger(Finger::Middle, FingerConstraint::new(FingerCurl::NoCurl, &up).weight(2.0))
            .finger(Finger::Ring, FingerConstraint::new(FingerCurl::FullCurl, &FingerDirection::ALL))
            .finger(Finger::Pinky, FingerConstraint::new(FingerCurl::FullCurl, &FingerDirection::ALL))
    }

    /// Fist with the thumb pointing up.
    pub fn thumbs_up() -> Self {
        use FingerDirection::*;
        let sideways = [HorizontalLeft, HorizontalRight];
        let curled = FingerConstraint::new(FingerCurl::FullCurl, &sideways);
        Self::new(THUMBS_UP)
            .finger(
                Finger::Thumb,
                FingerConstraint::new(FingerCurl::NoCurl, &[VerticalUp, DiagonalUpLeft, DiagonalUpRight]),
            )
            .finger(Finger::Index, curled.clone())
            .finger(Finger::Middle, curled.clone())
            .finger(Finger::Ring, curled.clone())
            .finger(Finger::Pinky, curled)
    }
}

/// Ordered, read-only collection of descriptors available for matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GestureCatalogue {
    descriptors: Vec<GestureDescriptor>,
}

impl GestureCatalogue {
    pub fn new(descriptors: Vec<GestureDescriptor>) -> Self {
        Self { descriptors }
    }

    /// Reads a JSON array of descriptors.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let catalogue: Self = serde_json::from_str(&text)?;
        if catalogue.is_empty() {
            return Err(DetectionError::InvalidConfig("gesture catalogue is empty".into()));
        }
        Ok(catalogue)
    }

    pub fn descriptors(&self) -> &[GestureDescriptor] {
        &self.descriptors
    }

    pub fn get(&self, name: &str) -> Option<&GestureDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl Default for GestureCatalogue {
    fn default() -> Self {
        Self::new(vec![GestureDescriptor::victory(), GestureDescriptor::thumbs_up()])
    }
}
