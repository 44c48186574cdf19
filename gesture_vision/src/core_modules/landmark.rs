// THEORY:
// The `landmark` module is the most fundamental unit of the engine. A `Landmark`
// is a "dumb" data container for one 3D hand keypoint, and a `LandmarkSet` is
// one hand: exactly 21 keypoints in a fixed anatomical order (wrist, then four
// points per finger from base to tip, thumb to pinky).
//
// The 21-point invariant is enforced at construction, so every stage above this
// one (finger pose, classifier, overlay) can index the set without checks.
// Construction also rejects NaN and infinite coordinates. An absent hand is
// `Option::None`, never an empty set.

use crate::error::DetectionError;
use serde::{Deserialize, Serialize};

pub const LANDMARK_COUNT: usize = 21;

pub const WRIST: usize = 0;
pub const THUMB_CMC: usize = 1;
pub const THUMB_MCP: usize = 2;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_MCP: usize = 5;
pub const INDEX_PIP: usize = 6;
pub const INDEX_DIP: usize = 7;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_DIP: usize = 11;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP: usize = 13;
pub const RING_PIP: usize = 14;
pub const RING_DIP: usize = 15;
pub const RING_TIP: usize = 16;
pub const PINKY_MCP: usize = 17;
pub const PINKY_PIP: usize = 18;
pub const PINKY_DIP: usize = 19;
pub const PINKY_TIP: usize = 20;

/// Segments drawn by the overlay: every finger chain from the wrist, plus the
/// palm base joining the knuckles.
pub const HAND_CONNECTIONS: [(usize, usize); 23] = [
    (WRIST, THUMB_CMC), (THUMB_CMC, THUMB_MCP), (THUMB_MCP, THUMB_IP), (THUMB_IP, THUMB_TIP),
    (WRIST, INDEX_MCP), (INDEX_MCP, INDEX_PIP), (INDEX_PIP, INDEX_DIP), (INDEX_DIP, INDEX_TIP),
    (WRIST, MIDDLE_MCP), (MIDDLE_MCP, MIDDLE_PIP), (MIDDLE_PIP, MIDDLE_DIP), (MIDDLE_DIP, MIDDLE_TIP),
    (WRIST, RING_MCP), (RING_MCP, RING_PIP), (RING_PIP, RING_DIP), (RING_DIP, RING_TIP),
    (WRIST, PINKY_MCP), (PINKY_MCP, PINKY_PIP), (PINKY_PIP, PINKY_DIP), (PINKY_DIP, PINKY_TIP),
    (INDEX_MCP, MIDDLE_MCP), (MIDDLE_MCP, RING_MCP), (RING_MCP, PINKY_MCP),
];

/// A single 3D keypoint. `x` and `y` are in source-video pixels, `z` is the
/// estimator's relative depth.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f32; 3]", into = "[f32; 3]")]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Vector from `self` to `other`.
    pub fn to(&self, other: &Landmark) -> [f32; 3] {
        [other.x - self.x, other.y - self.y, other.z - self.z]
    }
}

impl From<[f32; 3]> for Landmark {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self { x, y, z }
    }
}

impl From<Landmark> for [f32; 3] {
    fn from(l: Landmark) -> Self {
        [l.x, l.y, l.z]
    }
}

/// The five fingers, in landmark order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; 5] = [Finger::Thumb, Finger::Index, Finger::Middle, Finger::Ring, Finger::Pinky];

    /// Landmark indices of this finger, base to tip.
    pub const fn chain(self) -> [usize; 4] {
        match self {
            Finger::Thumb => [THUMB_CMC, THUMB_MCP, THUMB_IP, THUMB_TIP],
            Finger::Index => [INDEX_MCP, INDEX_PIP, INDEX_DIP, INDEX_TIP],
            Finger::Middle => [MIDDLE_MCP, MIDDLE_PIP, MIDDLE_DIP, MIDDLE_TIP],
            Finger::Ring => [RING_MCP, RING_PIP, RING_DIP, RING_TIP],
            Finger::Pinky => [PINKY_MCP, PINKY_PIP, PINKY_DIP, PINKY_TIP],
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Finger::Thumb => "thumb",
            Finger::Index => "index",
            Finger::Middle => "middle",
            Finger::Ring => "ring",
            Finger::Pinky => "pinky",
        }
    }
}

/// Axis-aligned image-plane bounds of a hand.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl BoundingBox {
    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }
}

/// One hand: exactly 21 landmarks in anatomical order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Landmark>", into = "Vec<Landmark>")]
pub struct LandmarkSet {
    points: [Landmark; LANDMARK_COUNT],
}

impl LandmarkSet {
    pub fn points(&self) -> &[Landmark; LANDMARK_COUNT] {
        &self.points
    }

    pub fn get(&self, index: usize) -> Option<&Landmark> {
        self.points.get(index)
    }

    pub fn wrist(&self) -> &Landmark {
        &self.points[WRIST]
    }

    /// The four landmarks of `finger`, base to tip.
    pub fn finger(&self, finger: Finger) -> [&Landmark; 4] {
        finger.chain().map(|i| &self.points[i])
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let first = self.points[0];
        let init = BoundingBox { min_x: first.x, min_y: first.y, max_x: first.x, max_y: first.y };
        self.points.iter().fold(init, |b, p| BoundingBox {
            min_x: b.min_x.min(p.x),
            min_y: b.min_y.min(p.y),
            max_x: b.max_x.max(p.x),
            max_y: b.max_y.max(p.y),
        })
    }
}

impl TryFrom<[Landmark; LANDMARK_COUNT]> for LandmarkSet {
    type Error = DetectionError;

    fn try_from(points: [Landmark; LANDMARK_COUNT]) -> Result<Self, Self::Error> {
        if let Some(index) = points.iter().position(|p| !p.is_finite()) {
            return Err(DetectionError::NonFiniteLandmark(index));
        }
        Ok(Self { points })
    }
}

impl TryFrom<Vec<Landmark>> for LandmarkSet {
    type Error = DetectionError;

    fn try_from(points: Vec<Landmark>) -> Result<Self, Self::Error> {
        let count = points.len();
        let points: [Landmark; LANDMARK_COUNT] =
            points.try_into().map_err(|_| DetectionError::InvalidLandmarkCount(count))?;
        Self::try_from(points)
    }
}

impl TryFrom<&[[f32; 3]]> for LandmarkSet {
    type Error = DetectionError;

    fn try_from(raw: &[[f32; 3]]) -> Result<Self, Self::Error> {
        raw.iter().copied().map(Landmark::from).collect::<Vec<_>>().try_into()
    }
}

impl From<LandmarkSet> for Vec<Landmark> {
    fn from(set: LandmarkSet) -> Self {
        set.points.to_vec()
    }
}
