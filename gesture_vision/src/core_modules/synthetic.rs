//! Synthetic hands built from per-segment headings.
//!
//! Used to exercise the classifier and overlay without an estimator, and by the
//! replay tester to generate a demo recording.

use crate::core_modules::landmark::{Finger, Landmark, LandmarkSet, LANDMARK_COUNT, WRIST};
use crate::error::Result;

const DEFAULT_SEGMENT_LENGTH: f32 = 30.0;

/// Builds a `LandmarkSet` by walking each finger out from the wrist.
///
/// Every finger has four segments (wrist → base → ... → tip); each segment is
/// given as an image-plane heading in degrees, counter-clockwise from screen
/// right, so 90° points to the top of the frame.
#[derive(Debug, Clone)]
pub struct HandBuilder {
    wrist: (f32, f32),
    segment_length: f32,
    headings: [[f32; 4]; 5],
}

impl HandBuilder {
    /// An open palm with straight, slightly spread fingers.
    pub fn new(wrist_x: f32, wrist_y: f32) -> Self {
        Self {
            wrist: (wrist_x, wrist_y),
            segment_length: DEFAULT_SEGMENT_LENGTH,
            headings: [[150.0; 4], [105.0; 4], [90.0; 4], [75.0; 4], [60.0; 4]],
        }
    }

    /// Hand seen from the side: thumb straight up, the other fingers curled
    /// into a fist with their tips pointing back towards the thumb.
    pub fn thumbs_up(wrist_x: f32, wrist_y: f32) -> Self {
        let mut builder = Self::new(wrist_x, wrist_y);
        builder
            .finger_headings(Finger::Thumb, [90.0; 4])
            .finger_headings(Finger::Index, [10.0, -90.0, 180.0, 180.0])
            .finger_headings(Finger::Middle, [0.0, -90.0, 180.0, 180.0])
            .finger_headings(Finger::Ring, [-10.0, -90.0, 180.0, 180.0])
            .finger_headings(Finger::Pinky, [-20.0, -90.0, 180.0, 180.0]);
        builder
    }

    /// Palm towards the camera: index and middle up, ring and pinky folded
    /// down, thumb bent across the palm.
    pub fn victory(wrist_x: f32, wrist_y: f32) -> Self {
        let mut builder = Self::new(wrist_x, wrist_y);
        builder
            .finger_headings(Finger::Thumb, [120.0, 90.0, 45.0, 0.0])
            .finger_headings(Finger::Index, [100.0; 4])
            .finger_headings(Finger::Middle, [80.0; 4])
            .finger_headings(Finger::Ring, [90.0, 0.0, -90.0, -90.0])
            .finger_headings(Finger::Pinky, [75.0, -15.0, -105.0, -105.0]);
        builder
    }

    pub fn segment_length(&mut self, length: f32) -> &mut Self {
        self.segment_length = length;
        self
    }

    pub fn finger_headings(&mut self, finger: Finger, headings: [f32; 4]) -> &mut Self {
        self.headings[finger.index()] = headings;
        self
    }

    /// Fails only when the wrist, a heading or the segment length is not finite.
    pub fn build(&self) -> Result<LandmarkSet> {
        let mut points = [Landmark::default(); LANDMARK_COUNT];
        let wrist = Landmark::new(self.wrist.0, self.wrist.1, 0.0);
        points[WRIST] = wrist;
        for finger in Finger::ALL {
            let mut at = wrist;
            for (index, heading) in finger.chain().into_iter().zip(self.headings[finger.index()]) {
                let radians = heading.to_radians();
                at = Landmark::new(
                    at.x + self.segment_length * radians.cos(),
                    at.y - self.segment_length * radians.sin(),
                    0.0,
                );
                points[index] = at;
            }
        }
        LandmarkSet::try_from(points)
    }
}
